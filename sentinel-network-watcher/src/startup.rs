use sentinel_network_node::{EndpointHealth, NodeApi};

use crate::liveness::{evaluate, Evaluation};
use crate::{Result, StartupError};

/// How many blocks below the tip to look at when the tip has no validator
/// records yet.
const BASELINE_LOOKBACK: u64 = 3;

/// What the watcher starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    pub last_block: u64,
    pub control_address: String,
}

/// Fails unless at least one endpoint is synced and reachable.
pub fn ensure_reachable(health: &[EndpointHealth]) -> Result<usize> {
    let healthy = health.iter().filter(|h| h.is_healthy()).count();
    if healthy == 0 {
        return Err(StartupError::NoHealthyNode(health.len()).into());
    }
    Ok(healthy)
}

/// Checks that the candidate is an active, unjailed validator currently
/// signing blocks, and resolves its control address.
pub async fn prepare(node: &dyn NodeApi, public_key: &str) -> Result<Baseline> {
    let status = node.status().await?;
    if status.catching_up {
        return Err(StartupError::NodeCatchingUp {
            height: status.latest_height,
        }
        .into());
    }

    let candidate = node.candidate(public_key).await?;
    if !candidate.is_validator {
        return Err(StartupError::NotValidator {
            public_key: public_key.to_string(),
        }
        .into());
    }
    if candidate.is_jailed_at(status.latest_height) {
        return Err(StartupError::Jailed {
            until: candidate.jailed_until,
            height: status.latest_height,
        }
        .into());
    }
    if candidate.control_address.is_empty() {
        return Err(StartupError::NoControlAddress {
            public_key: public_key.to_string(),
        }
        .into());
    }

    let lowest = status.latest_height.saturating_sub(BASELINE_LOOKBACK);
    let mut height = status.latest_height;
    loop {
        match evaluate(node, public_key, height).await? {
            Evaluation::Signed => break,
            Evaluation::Deferred(reason) if height > lowest => {
                log::debug!("block {} deferred at startup ({:?})", height, reason);
                height -= 1;
            }
            Evaluation::Missed | Evaluation::Deferred(_) => {
                return Err(StartupError::LastBlockNotSigned { height }.into());
            }
        }
    }

    Ok(Baseline {
        last_block: height,
        control_address: candidate.control_address,
    })
}
