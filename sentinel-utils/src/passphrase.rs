use rpassword::prompt_password;
use std::io;
use zeroize::Zeroizing;

/// Environment variable consulted before prompting for the seed passphrase.
pub const PASSPHRASE_ENV: &str = "SENTINEL_SEED_PASSWORD";

/// Passphrase from [`PASSPHRASE_ENV`], or from the terminal when unset.
pub fn read_passphrase(prompt: &str) -> io::Result<Zeroizing<String>> {
    if let Ok(value) = std::env::var(PASSPHRASE_ENV) {
        if !value.is_empty() {
            log::debug!("using passphrase from {}", PASSPHRASE_ENV);
            return Ok(Zeroizing::new(value));
        }
    }
    read_secret(prompt)
}

/// Asks twice and fails unless both entries match.
pub fn read_new_passphrase() -> io::Result<Zeroizing<String>> {
    let passphrase = read_secret("Enter passphrase to seal the seeds: ")?;
    let confirm = read_secret("Confirm passphrase: ")?;
    if *passphrase != *confirm {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "passphrases do not match",
        ));
    }
    Ok(passphrase)
}

/// Reads one non-empty hidden line from the terminal.
pub fn read_secret(prompt: &str) -> io::Result<Zeroizing<String>> {
    let value = Zeroizing::new(prompt_password(prompt)?);
    if value.trim().is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "input cannot be empty",
        ));
    }
    Ok(value)
}

/// Prompts for seed phrases until a blank line.
pub fn read_seeds() -> io::Result<Vec<Zeroizing<String>>> {
    let mut seeds = Vec::new();
    loop {
        let prompt = format!(
            "Seed phrase {} (hidden, leave blank to finish): ",
            seeds.len() + 1
        );
        let seed = Zeroizing::new(prompt_password(prompt)?);
        let trimmed = seed.trim();
        if trimmed.is_empty() {
            break;
        }
        seeds.push(Zeroizing::new(trimmed.to_string()));
    }
    Ok(seeds)
}
