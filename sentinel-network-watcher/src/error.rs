use std::fmt;
use thiserror::Error;

use sentinel_network_node::Error as NodeError;

/// Why the watcher left its running state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    ThresholdExceeded {
        height: u64,
        missed: usize,
        threshold: usize,
    },
    FatalError {
        height: u64,
        message: String,
    },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::ThresholdExceeded {
                height,
                missed,
                threshold,
            } => write!(
                f,
                "missed blocks threshold exceeded at block {height} [{missed}/{threshold}]"
            ),
            StopReason::FatalError { height, message } => {
                write!(f, "failed to evaluate block {height}: {message}")
            }
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StartupError {
    #[error("no reachable node among {0} configured endpoint(s)")]
    NoHealthyNode(usize),

    #[error("node is catching up at height {height}")]
    NodeCatchingUp { height: u64 },

    #[error("candidate {public_key} is not a validator yet")]
    NotValidator { public_key: String },

    #[error("candidate is jailed until block {until} (current height {height})")]
    Jailed { until: u64, height: u64 },

    #[error("candidate {public_key} has no control address")]
    NoControlAddress { public_key: String },

    #[error("last block {height} is not signed by validator, start watcher when validator starts signing blocks")]
    LastBlockNotSigned { height: u64 },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error("{0}")]
    Stopped(StopReason),

    #[error("transaction rejected: [{code}] {message}")]
    Rejected { code: u64, message: String },

    #[error("{reason}; failed to turn off masternode: {source}")]
    Shutdown {
        reason: StopReason,
        #[source]
        source: Box<Error>,
    },
}
