mod cmds;
mod config;
mod services;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sentinel")]
#[command(version = "0.1.0")]
#[command(about = "Watch a Minter masternode for missed blocks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start watching for missed blocks
    Start(cmds::start::Opts),

    /// Generate transaction to turn off masternode
    #[command(alias = "tx_generate")]
    Txgenerate(cmds::txgenerate::Opts),

    /// Seal seed phrases for the `encrypted_seeds` config entry
    Seeds(cmds::seeds::Opts),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Start(opts) => cmds::start::run(opts).await?,
        Commands::Txgenerate(opts) => cmds::txgenerate::run(opts).await?,
        Commands::Seeds(opts) => cmds::seeds::run(opts).await?,
    }

    Ok(())
}
