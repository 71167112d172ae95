use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use sentinel_network_node::{EndpointHealth, NodeClient};
use sentinel_network_watcher::startup;
use sentinel_network_watcher::{
    LivenessState, Metrics, NoopMetrics, Notifications, ShutdownCoordinator, Watcher,
    WatcherProps,
};
use sentinel_utils::passphrase;

use crate::config::{Config, PrometheusConfig, TelegramConfig};
use crate::services::prometheus::{self, PrometheusMetrics};
use crate::services::telegram::TelegramNotifier;

#[derive(Debug, Parser)]
#[command(about = "Start watching for missed blocks")]
pub struct Opts {
    /// Load configuration from FILE
    #[clap(long, short, default_value = "config.json")]
    config: PathBuf,

    /// Don't send transaction to set masternode off
    #[clap(long)]
    dry_run: bool,
}

pub async fn run(opts: &Opts) -> Result<()> {
    let config = Config::from_filepath(&opts.config)?;

    let policy = config.shutdown_policy(opts.dry_run, || {
        passphrase::read_passphrase("Passphrase for encrypted seeds: ")
    })?;
    if policy.is_dry_run() {
        log::warn!("Dry run: the masternode will not be switched off");
    }

    let node = Arc::new(NodeClient::from_urls(&config.node_urls())?);
    let health = node.ping().await;
    for endpoint in &health {
        match endpoint {
            EndpointHealth::Healthy { url, height } => {
                log::info!("Node {} is up at height {}", url, height)
            }
            EndpointHealth::CatchingUp { url, height } => {
                log::warn!("Node {} is catching up at height {}", url, height)
            }
            EndpointHealth::Unreachable { url, reason } => {
                log::warn!("Node {} is unreachable: {}", url, reason)
            }
        }
    }
    startup::ensure_reachable(&health)?;

    let notifications = notifications(&config.telegram).await?;
    let metrics = metrics(&config.prometheus).await?;

    let public_key = config.minter.public_key.trim().to_string();
    let baseline = startup::prepare(node.as_ref(), &public_key).await?;

    let coordinator = ShutdownCoordinator::new(
        node.clone(),
        policy,
        config.chain_id(),
        &public_key,
        &baseline.control_address,
        notifications.clone(),
    );
    let watcher = Watcher::create(WatcherProps {
        node: node.clone(),
        public_key,
        state: LivenessState::new(
            baseline.last_block,
            config.liveness(),
            &baseline.control_address,
        ),
        sleep: config.sleep(),
        notifications: notifications.clone(),
        metrics,
    });

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Received Ctrl-C, stopping watcher");
            on_ctrl_c.cancel();
        }
    });

    let result = watcher.run(coordinator, cancel).await;
    notifications.drain().await;
    result.map_err(Into::into)
}

async fn notifications(config: &TelegramConfig) -> Result<Notifications> {
    if config.token.trim().is_empty() {
        log::warn!("Telegram token not set. Notifications will not be sent");
        return Ok(Notifications::disabled());
    }

    let bot = TelegramNotifier::new(config.token.trim())?;
    let me = bot
        .get_me()
        .await
        .context("Failed to authorize Telegram bot")?;
    log::info!(
        "Authorized on Telegram bot {}",
        me.username.as_deref().unwrap_or("<unnamed>")
    );
    if config.admins.is_empty() {
        log::warn!("telegram.admins is empty. Notifications will not be sent");
    }

    Ok(Notifications::new(Arc::new(bot), config.admins.clone()))
}

async fn metrics(config: &PrometheusConfig) -> Result<Arc<dyn Metrics>> {
    if !config.enabled {
        return Ok(Arc::new(NoopMetrics));
    }

    let metrics = PrometheusMetrics::new()?;
    let listener = prometheus::bind(&config.address)
        .await
        .with_context(|| format!("Failed to bind metrics server to {}", config.address))?;
    let exported = metrics.clone();
    tokio::spawn(async move {
        if let Err(err) = prometheus::serve(listener, exported).await {
            log::error!("Metrics server stopped: {}", err);
        }
    });

    Ok(metrics as Arc<dyn Metrics>)
}
