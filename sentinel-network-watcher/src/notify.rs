use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::task::TaskTracker;

/// Delivers a text message to one recipient.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: i64, text: &str) -> anyhow::Result<()>;
}

/// Fire-and-forget fan-out of messages to every configured recipient.
///
/// Each message runs on its own task. All tasks are tracked so the process
/// can wait for them with [`Notifications::drain`] before exiting.
#[derive(Clone)]
pub struct Notifications {
    notifier: Option<Arc<dyn Notifier>>,
    recipients: Arc<[i64]>,
    tracker: TaskTracker,
}

impl Notifications {
    pub fn new(notifier: Arc<dyn Notifier>, recipients: Vec<i64>) -> Self {
        Self {
            notifier: Some(notifier),
            recipients: recipients.into(),
            tracker: TaskTracker::new(),
        }
    }

    pub fn disabled() -> Self {
        Self {
            notifier: None,
            recipients: Arc::from(Vec::new()),
            tracker: TaskTracker::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.notifier.is_some() && !self.recipients.is_empty()
    }

    pub fn notify(&self, text: impl Into<String>) {
        let Some(notifier) = self.notifier.clone() else {
            return;
        };
        let recipients = self.recipients.clone();
        let text = text.into();
        self.tracker.spawn(async move {
            for recipient in recipients.iter() {
                if let Err(err) = notifier.send(*recipient, &text).await {
                    log::warn!("failed to notify {}: {}", recipient, err);
                }
            }
        });
    }

    /// Messages still being delivered.
    pub fn outstanding(&self) -> usize {
        self.tracker.len()
    }

    /// Waits until every message spawned so far has been delivered.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
