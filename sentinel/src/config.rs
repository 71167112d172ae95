use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use zeroize::Zeroizing;

use sentinel_network_node::tx::{ChainId, CommandSigner};
use sentinel_network_watcher::{DeactivationSource, LivenessConfig, ShutdownPolicy};
use sentinel_utils::sealed_seed;

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    pub minter: MinterConfig,
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub admins: Vec<i64>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct MinterConfig {
    #[serde(default)]
    pub testnet: bool,
    pub node_api: Vec<String>,
    pub public_key: String,
    /// Pre-signed set-candidate-off transaction.
    #[serde(default)]
    pub transaction_off: Option<String>,
    #[serde(default)]
    pub seeds: Vec<String>,
    /// Seeds sealed with `sentinel seeds`.
    #[serde(default)]
    pub encrypted_seeds: Vec<String>,
    /// Program and arguments that sign a deactivation request.
    #[serde(default)]
    pub signer_command: Vec<String>,
    pub missed_blocks_threshold: usize,
    /// Seconds between polls.
    pub sleep: u64,
    pub missed_block_remove_after: u64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PrometheusConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_prometheus_address")]
    pub address: String,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: default_prometheus_address(),
        }
    }
}

fn default_prometheus_address() -> String {
    "127.0.0.1:9100".to_string()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("define at least one url in minter.node_api")]
    NoNodeApi,
    #[error("minter.public_key not set in configuration file")]
    NoPublicKey,
    #[error("minter.{0} must be at least 1")]
    NotPositive(&'static str),
    #[error("`transaction_off` or seeds not set in configuration file")]
    NoShutdownSource,
    #[error("minter.signer_command is required to sign with seeds")]
    NoSignerCommand,
    #[error("encrypted seed #{index} could not be unsealed: {reason}")]
    Unseal { index: usize, reason: String },
}

impl Config {
    pub fn from_filepath(path: &Path) -> Result<Config> {
        let file = fs::File::open(path)
            .with_context(|| format!("Failed to open config file {}", path.display()))?;
        let config: Config =
            serde_json::from_reader(file).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let minter = &self.minter;
        if minter.node_api.iter().all(|url| url.trim().is_empty()) {
            return Err(ConfigError::NoNodeApi);
        }
        if minter.public_key.trim().is_empty() {
            return Err(ConfigError::NoPublicKey);
        }
        if minter.missed_blocks_threshold == 0 {
            return Err(ConfigError::NotPositive("missed_blocks_threshold"));
        }
        if minter.sleep == 0 {
            return Err(ConfigError::NotPositive("sleep"));
        }
        if minter.missed_block_remove_after == 0 {
            return Err(ConfigError::NotPositive("missed_block_remove_after"));
        }
        Ok(())
    }

    pub fn node_urls(&self) -> Vec<&str> {
        self.minter
            .node_api
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
            .collect()
    }

    pub fn chain_id(&self) -> ChainId {
        ChainId::from_testnet_flag(self.minter.testnet)
    }

    pub fn liveness(&self) -> LivenessConfig {
        LivenessConfig {
            missed_blocks_threshold: self.minter.missed_blocks_threshold,
            missed_block_remove_after: self.minter.missed_block_remove_after,
        }
    }

    pub fn sleep(&self) -> Duration {
        Duration::from_secs(self.minter.sleep)
    }

    /// Decides how the masternode is taken offline.
    ///
    /// A pre-signed `transaction_off` wins over seeds. `passphrase` is only
    /// called when sealed seeds have to be opened.
    pub fn shutdown_policy<F>(&self, dry_run: bool, passphrase: F) -> Result<ShutdownPolicy>
    where
        F: FnOnce() -> io::Result<Zeroizing<String>>,
    {
        if dry_run {
            return Ok(ShutdownPolicy::DryRun);
        }

        if let Some(tx) = self.minter.transaction_off.as_deref() {
            if !tx.trim().is_empty() {
                return Ok(ShutdownPolicy::Deactivate(DeactivationSource::PreSigned(
                    tx.trim().to_string(),
                )));
            }
        }

        let seeds = self.seeds(passphrase)?;
        if seeds.is_empty() {
            return Err(ConfigError::NoShutdownSource.into());
        }
        if self.minter.signer_command.is_empty() {
            return Err(ConfigError::NoSignerCommand.into());
        }
        let signer = CommandSigner::new(&self.minter.signer_command)?;
        Ok(ShutdownPolicy::Deactivate(DeactivationSource::Seeds {
            seeds,
            signer: Arc::new(signer),
        }))
    }

    /// Plain seeds followed by unsealed ones.
    pub fn seeds<F>(&self, passphrase: F) -> Result<Vec<Zeroizing<String>>>
    where
        F: FnOnce() -> io::Result<Zeroizing<String>>,
    {
        let mut seeds: Vec<Zeroizing<String>> = self
            .minter
            .seeds
            .iter()
            .filter(|seed| !seed.trim().is_empty())
            .map(|seed| Zeroizing::new(seed.trim().to_string()))
            .collect();

        if self.minter.encrypted_seeds.is_empty() {
            return Ok(seeds);
        }

        let passphrase = passphrase().context("Failed to read seed passphrase")?;
        for (index, sealed) in self.minter.encrypted_seeds.iter().enumerate() {
            let seed = sealed_seed::unseal(sealed, &passphrase).map_err(|e| ConfigError::Unseal {
                index: index + 1,
                reason: e.to_string(),
            })?;
            seeds.push(seed);
        }
        Ok(seeds)
    }
}
