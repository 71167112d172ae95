use anyhow::{Context, Result};
use clap::Parser;

use sentinel_utils::{passphrase, sealed_seed};

#[derive(Debug, Parser)]
#[command(about = "Seal seed phrases for the encrypted_seeds config entry")]
pub struct Opts {}

pub async fn run(_opts: &Opts) -> Result<()> {
    let seeds = passphrase::read_seeds().context("Failed to read seed phrases")?;
    if seeds.is_empty() {
        anyhow::bail!("enter at least 1 seed phrase");
    }
    let passphrase = passphrase::read_new_passphrase().context("Failed to get passphrase")?;

    println!("Encrypted seeds:");
    for seed in &seeds {
        println!("{}", sealed_seed::seal(seed, &passphrase)?);
    }
    Ok(())
}
