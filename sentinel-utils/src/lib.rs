pub mod passphrase;
pub mod sealed_seed;
