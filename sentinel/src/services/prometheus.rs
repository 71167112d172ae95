use axum::{extract::State, http::header, http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;
use tokio::net::TcpListener;

use sentinel_network_watcher::Metrics;

/// Watcher series exported under the `minter_watcher_` prefix.
pub struct PrometheusMetrics {
    registry: Registry,
    missed_blocks_threshold: IntGauge,
    sleep: IntGauge,
    blocks_signed: IntCounter,
    blocks_missed: IntCounter,
    blocks_missed_current: IntGauge,
}

impl PrometheusMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let missed_blocks_threshold = IntGauge::with_opts(Opts::new(
            "minter_watcher_missed_blocks_threshold",
            "Missed blocks threshold before masternode will go off",
        ))?;
        registry.register(Box::new(missed_blocks_threshold.clone()))?;

        let sleep = IntGauge::with_opts(Opts::new(
            "minter_watcher_sleep",
            "Number of seconds to sleep between checking for missed blocks",
        ))?;
        registry.register(Box::new(sleep.clone()))?;

        let blocks_signed = IntCounter::with_opts(Opts::new(
            "minter_watcher_blocks_signed",
            "The total number of signed blocks",
        ))?;
        registry.register(Box::new(blocks_signed.clone()))?;

        let blocks_missed = IntCounter::with_opts(Opts::new(
            "minter_watcher_blocks_missed",
            "The total number of missed blocks",
        ))?;
        registry.register(Box::new(blocks_missed.clone()))?;

        let blocks_missed_current = IntGauge::with_opts(Opts::new(
            "minter_watcher_blocks_missed_current",
            "The current number of missed blocks",
        ))?;
        registry.register(Box::new(blocks_missed_current.clone()))?;

        Ok(Arc::new(Self {
            registry,
            missed_blocks_threshold,
            sleep,
            blocks_signed,
            blocks_missed,
            blocks_missed_current,
        }))
    }

    /// Text exposition of every registered series.
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Metrics for PrometheusMetrics {
    fn set_missed_blocks_threshold(&self, value: usize) {
        self.missed_blocks_threshold.set(value as i64);
    }

    fn set_sleep(&self, seconds: u64) {
        self.sleep.set(seconds as i64);
    }

    fn blocks_signed_inc(&self) {
        self.blocks_signed.inc();
    }

    fn blocks_missed_inc(&self) {
        self.blocks_missed.inc();
    }

    fn set_blocks_missed_current(&self, value: usize) {
        self.blocks_missed_current.set(value as i64);
    }
}

pub fn router(metrics: Arc<PrometheusMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(handle_metrics))
        .with_state(metrics)
}

async fn handle_metrics(State(metrics): State<Arc<PrometheusMetrics>>) -> impl IntoResponse {
    match metrics.export() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(err) => {
            log::error!("failed to encode metrics: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Binds before returning so a bad address fails startup instead of the
/// background task.
pub async fn bind(address: &str) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind(address).await?;
    log::info!("Serving metrics on http://{}/metrics", listener.local_addr()?);
    Ok(listener)
}

pub async fn serve(listener: TcpListener, metrics: Arc<PrometheusMetrics>) -> std::io::Result<()> {
    axum::serve(listener, router(metrics)).await
}
