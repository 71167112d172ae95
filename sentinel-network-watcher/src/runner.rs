use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use sentinel_network_node::NodeApi;

use crate::liveness::{evaluate, Evaluation, LivenessState, Position};
use crate::metrics::Metrics;
use crate::notify::Notifications;
use crate::shutdown::{ShutdownCoordinator, ShutdownOutcome};
use crate::{Error, Result, StopReason};

/// Result of one polling step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    Continue,
    Stop(StopReason),
}

pub struct WatcherProps {
    pub node: Arc<dyn NodeApi>,
    pub public_key: String,
    pub state: LivenessState,
    pub sleep: Duration,
    pub notifications: Notifications,
    pub metrics: Arc<dyn Metrics>,
}

/// Polls the chain block by block and decides when the validator has missed
/// too many blocks. The only owner and mutator of [`LivenessState`].
pub struct Watcher {
    node: Arc<dyn NodeApi>,
    public_key: String,
    state: LivenessState,
    sleep: Duration,
    notifications: Notifications,
    metrics: Arc<dyn Metrics>,
}

impl Watcher {
    pub fn create(props: WatcherProps) -> Self {
        Self {
            node: props.node,
            public_key: props.public_key,
            state: props.state,
            sleep: props.sleep,
            notifications: props.notifications,
            metrics: props.metrics,
        }
    }

    pub fn state(&self) -> &LivenessState {
        &self.state
    }

    fn fields(&self, height: u64) -> Position {
        Position {
            height,
            missed: self.state.missed_count(),
        }
    }

    /// Prunes the window, then evaluates the block after `last_block`.
    pub async fn tick(&mut self) -> Tick {
        self.state.prune();
        self.metrics
            .set_blocks_missed_current(self.state.missed_count());

        let height = self.state.next_height();
        let evaluation = match evaluate(self.node.as_ref(), &self.public_key, height).await {
            Ok(evaluation) => evaluation,
            Err(err) => {
                log::error!("[{}] Failed to detect if block is signed: {}", self.fields(height), err);
                self.notifications
                    .notify(format!("⚠️ Failed to detect if block is signed: {err}"));
                return Tick::Stop(StopReason::FatalError {
                    height,
                    message: err.to_string(),
                });
            }
        };

        match evaluation {
            Evaluation::Deferred(reason) => {
                log::debug!("[{}] Block not created yet ({:?})", self.fields(height), reason);
                Tick::Continue
            }
            Evaluation::Signed => {
                self.state.record_signed(height);
                self.metrics.blocks_signed_inc();
                log::info!("[{}] Block signed", self.fields(height));
                Tick::Continue
            }
            Evaluation::Missed => {
                self.state.record_missed(height);
                self.metrics.blocks_missed_inc();
                self.metrics
                    .set_blocks_missed_current(self.state.missed_count());

                let missed = self.state.missed_count();
                let threshold = self.state.threshold();
                if self.state.is_over_threshold() {
                    log::error!("[{}] Missed blocks threshold exceeded", self.fields(height));
                    self.notifications
                        .notify(format!("🚨 Block {height} missed [{missed}/{threshold}]"));
                    return Tick::Stop(StopReason::ThresholdExceeded {
                        height,
                        missed,
                        threshold,
                    });
                }

                log::warn!("[{}] Block missed", self.fields(height));
                self.notifications
                    .notify(format!("⚠️ Block {height} missed [{missed}/{threshold}]"));
                Tick::Continue
            }
        }
    }

    /// Ticks every `sleep` until the threshold is crossed, a fatal error
    /// occurs, or `cancel` fires.
    ///
    /// A stop hands over to `coordinator` exactly once and always returns an
    /// error describing why the watcher stopped. Cancellation returns `Ok`
    /// without touching the coordinator.
    pub async fn run(
        mut self,
        coordinator: ShutdownCoordinator,
        cancel: CancellationToken,
    ) -> Result<()> {
        let config = self.state.config();
        log::info!(
            "[{}] Watcher started missed_blocks_threshold={} sleep={:?} missed_block_remove_after={}",
            self.fields(self.state.last_block()),
            config.missed_blocks_threshold,
            self.sleep,
            config.missed_block_remove_after
        );
        self.metrics
            .set_missed_blocks_threshold(config.missed_blocks_threshold);
        self.metrics.set_sleep(self.sleep.as_secs());

        let mut ticker = interval_at(Instant::now() + self.sleep, self.sleep);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let reason = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log::info!("[{}] Watcher stopped", self.fields(self.state.last_block()));
                    return Ok(());
                }
                _ = ticker.tick() => {
                    if let Tick::Stop(reason) = self.tick().await {
                        break reason;
                    }
                }
            }
        };
        drop(ticker);

        self.turn_off(coordinator, reason).await
    }

    async fn turn_off(&self, coordinator: ShutdownCoordinator, reason: StopReason) -> Result<()> {
        let last_block = self.state.last_block();
        let position = self.fields(last_block);
        if !coordinator.is_dry_run() {
            log::warn!("[{}] Sending transaction to turn off masternode", position);
            self.notifications
                .notify("🚨 Sending transaction to turn off masternode");
        }

        match coordinator.deactivate(position).await {
            Ok(ShutdownOutcome::Submitted { hash }) => {
                log::warn!("[{}] Masternode is off, tx {}", position, hash);
                self.notifications.notify("🚨 Masternode is off");
                Err(Error::Stopped(reason))
            }
            Ok(ShutdownOutcome::DryRun) => {
                log::warn!("[{}] Dry run. Masternode is still on!", position);
                self.notifications
                    .notify("⚠️ Dry run. Masternode is still on!");
                Err(Error::Stopped(reason))
            }
            Err(err) => {
                log::error!("[{}] Failed to turn off masternode: {}", position, err);
                self.notifications
                    .notify(format!("🚨 Failed to turn off masternode: {err}"));
                Err(Error::Shutdown {
                    reason,
                    source: Box::new(err),
                })
            }
        }
    }
}
