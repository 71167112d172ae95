use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use sentinel_network_node::tx::CommandSigner;
use sentinel_network_node::{NodeApi, NodeClient};
use sentinel_network_watcher::shutdown::sign_candidate_off;
use sentinel_utils::passphrase;

use crate::config::{Config, ConfigError};

#[derive(Debug, Parser)]
#[command(about = "Generate transaction to turn off masternode")]
pub struct Opts {
    /// Load configuration from FILE
    #[clap(long, short, default_value = "config.json")]
    config: PathBuf,

    /// Sign for this address instead of the candidate's control address,
    /// e.g. a multisig wallet
    #[clap(long)]
    address: Option<String>,
}

pub async fn run(opts: &Opts) -> Result<()> {
    let config = Config::from_filepath(&opts.config)?;
    if config.minter.signer_command.is_empty() {
        return Err(ConfigError::NoSignerCommand.into());
    }
    let signer = CommandSigner::new(&config.minter.signer_command)?;
    let public_key = config.minter.public_key.trim();

    println!("Testnet: {}", config.minter.testnet);
    println!("Public Key: {}", public_key);
    println!();

    let seeds = passphrase::read_seeds().context("Failed to read seed phrases")?;
    if seeds.is_empty() {
        anyhow::bail!("enter at least 1 seed phrase");
    }

    let node = NodeClient::from_urls(&config.node_urls())?;
    let address = match &opts.address {
        Some(address) => address.trim().to_string(),
        None => {
            let candidate = node.candidate(public_key).await?;
            candidate.control_address
        }
    };
    log::info!("Signing with {} seed(s) for {}", seeds.len(), address);

    let tx = sign_candidate_off(
        &node,
        &signer,
        config.chain_id(),
        public_key,
        &address,
        seeds,
    )
    .await
    .context("failed to generate transaction")?;

    println!("Transaction:\n{}", tx);
    Ok(())
}
