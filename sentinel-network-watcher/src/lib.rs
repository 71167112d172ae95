mod error;

pub mod liveness;
pub mod metrics;
pub mod notify;
pub mod runner;
pub mod shutdown;
pub mod startup;

pub use error::{Error, StartupError, StopReason};
pub use liveness::{Evaluation, LivenessConfig, LivenessState, Position};
pub use metrics::{Metrics, NoopMetrics};
pub use notify::{Notifications, Notifier};
pub use runner::{Tick, Watcher, WatcherProps};
pub use shutdown::{DeactivationSource, ShutdownCoordinator, ShutdownOutcome, ShutdownPolicy};

pub type Result<T> = std::result::Result<T, Error>;
