use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};
use ring::{aead, hkdf, pbkdf2};
use std::num::NonZeroU32;
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

const FORMAT_VERSION: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const HEADER_LEN: usize = 1 + SALT_LEN + NONCE_LEN;
const PBKDF2_ROUNDS: u32 = 100_000;
const KEY_INFO: &[u8] = b"minter-sentinel seed key";
const SEED_AAD: &[u8] = b"minter-sentinel seed";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SealError {
    #[error("passphrase cannot be empty")]
    EmptyPassphrase,
    #[error("sealed seed is not valid base64")]
    Encoding,
    #[error("sealed seed is truncated")]
    Truncated,
    #[error("unsupported sealed seed version {0}")]
    UnsupportedVersion(u8),
    #[error("wrong passphrase or corrupted sealed seed")]
    Unseal,
    #[error("unsealed seed is not valid UTF-8")]
    NotUtf8,
    #[error("crypto backend failure: {0}")]
    Crypto(&'static str),
}

/// Encrypts a mnemonic seed phrase with a passphrase so it can live in the
/// config file.
///
/// Layout before base64: `version | salt(16) | nonce(12) | ciphertext+tag`.
/// The key is PBKDF2-HMAC-SHA256 stretched and then HKDF-expanded into an
/// AES-256-GCM key.
pub fn seal(seed: &str, passphrase: &str) -> Result<String, SealError> {
    if passphrase.is_empty() {
        return Err(SealError::EmptyPassphrase);
    }
    let rng = SystemRandom::new();
    let mut header = [0u8; HEADER_LEN];
    header[0] = FORMAT_VERSION;
    rng.fill(&mut header[1..])
        .map_err(|_| SealError::Crypto("random source unavailable"))?;

    let (salt, nonce) = header[1..].split_at(SALT_LEN);
    let key = opening_key(passphrase, salt)?;
    let nonce = aead::Nonce::try_assume_unique_for_key(nonce)
        .map_err(|_| SealError::Crypto("bad nonce length"))?;

    let mut buffer = seed.as_bytes().to_vec();
    key.seal_in_place_append_tag(nonce, aead::Aad::from(SEED_AAD), &mut buffer)
        .map_err(|_| SealError::Crypto("seal failed"))?;

    let mut sealed = Vec::with_capacity(HEADER_LEN + buffer.len());
    sealed.extend_from_slice(&header);
    sealed.extend_from_slice(&buffer);
    Ok(BASE64.encode(sealed))
}

/// Reverses [`seal`]. The returned seed is wiped from memory on drop.
pub fn unseal(sealed: &str, passphrase: &str) -> Result<Zeroizing<String>, SealError> {
    let raw = BASE64
        .decode(sealed.trim())
        .map_err(|_| SealError::Encoding)?;
    if raw.len() < HEADER_LEN + aead::AES_256_GCM.tag_len() {
        return Err(SealError::Truncated);
    }
    if raw[0] != FORMAT_VERSION {
        return Err(SealError::UnsupportedVersion(raw[0]));
    }

    let salt = &raw[1..1 + SALT_LEN];
    let nonce = aead::Nonce::try_assume_unique_for_key(&raw[1 + SALT_LEN..HEADER_LEN])
        .map_err(|_| SealError::Crypto("bad nonce length"))?;
    let key = opening_key(passphrase, salt)?;

    let mut buffer = Zeroizing::new(raw[HEADER_LEN..].to_vec());
    let plain = key
        .open_in_place(nonce, aead::Aad::from(SEED_AAD), &mut buffer)
        .map_err(|_| SealError::Unseal)?;

    let seed = std::str::from_utf8(plain).map_err(|_| SealError::NotUtf8)?;
    Ok(Zeroizing::new(seed.to_string()))
}

fn opening_key(passphrase: &str, salt: &[u8]) -> Result<aead::LessSafeKey, SealError> {
    let rounds = NonZeroU32::new(PBKDF2_ROUNDS).ok_or(SealError::Crypto("zero rounds"))?;
    let mut stretched = [0u8; 32];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        rounds,
        salt,
        passphrase.as_bytes(),
        &mut stretched,
    );

    let prk = hkdf::Salt::new(hkdf::HKDF_SHA256, salt).extract(&stretched);
    stretched.zeroize();

    let mut key_bytes = [0u8; 32];
    prk.expand(&[KEY_INFO], &aead::AES_256_GCM)
        .and_then(|okm| okm.fill(&mut key_bytes))
        .map_err(|_| SealError::Crypto("key expansion failed"))?;

    let unbound = aead::UnboundKey::new(&aead::AES_256_GCM, &key_bytes)
        .map_err(|_| SealError::Crypto("bad key length"));
    key_bytes.zeroize();
    Ok(aead::LessSafeKey::new(unbound?))
}
