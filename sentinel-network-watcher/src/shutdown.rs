use std::sync::Arc;
use zeroize::Zeroizing;

use sentinel_network_node::models::TxOutcome;
use sentinel_network_node::tx::{CandidateOffRequest, ChainId, TransactionSigner};
use sentinel_network_node::NodeApi;

use crate::liveness::Position;
use crate::notify::Notifications;
use crate::{Error, Result};

/// Where the signed deactivation transaction comes from.
#[derive(Clone)]
pub enum DeactivationSource {
    /// Transaction signed ahead of time, e.g. with `txgenerate`.
    PreSigned(String),
    /// Seeds handed to an external signer when the transaction is needed.
    Seeds {
        seeds: Vec<Zeroizing<String>>,
        signer: Arc<dyn TransactionSigner>,
    },
}

#[derive(Clone)]
pub enum ShutdownPolicy {
    /// Evaluate and alert, never submit.
    DryRun,
    Deactivate(DeactivationSource),
}

impl ShutdownPolicy {
    pub fn is_dry_run(&self) -> bool {
        matches!(self, ShutdownPolicy::DryRun)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownOutcome {
    DryRun,
    Submitted { hash: String },
}

/// Takes the validator offline. Consumed by [`ShutdownCoordinator::deactivate`]
/// so it can act at most once.
pub struct ShutdownCoordinator {
    node: Arc<dyn NodeApi>,
    policy: ShutdownPolicy,
    chain_id: ChainId,
    public_key: String,
    control_address: String,
    notifications: Notifications,
}

impl ShutdownCoordinator {
    pub fn new(
        node: Arc<dyn NodeApi>,
        policy: ShutdownPolicy,
        chain_id: ChainId,
        public_key: &str,
        control_address: &str,
        notifications: Notifications,
    ) -> Self {
        Self {
            node,
            policy,
            chain_id,
            public_key: public_key.to_string(),
            control_address: control_address.to_string(),
            notifications,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.policy.is_dry_run()
    }

    /// Switches the masternode off once. `position` is where the watcher
    /// stopped and prefixes every log line.
    pub async fn deactivate(self, position: Position) -> Result<ShutdownOutcome> {
        let source = match &self.policy {
            ShutdownPolicy::DryRun => {
                log::warn!("[{}] Dry run. Not sending the deactivation transaction", position);
                return Ok(ShutdownOutcome::DryRun);
            }
            ShutdownPolicy::Deactivate(source) => source,
        };

        log::warn!("[{}] Setting masternode off...", position);
        self.notifications.notify("🚨 Setting masternode off...");

        let tx = match source {
            DeactivationSource::PreSigned(tx) => tx.clone(),
            DeactivationSource::Seeds { seeds, signer } => {
                sign_candidate_off(
                    self.node.as_ref(),
                    signer.as_ref(),
                    self.chain_id,
                    &self.public_key,
                    &self.control_address,
                    seeds.clone(),
                )
                .await?
            }
        };

        match self.node.send_transaction(&tx).await? {
            TxOutcome::Accepted { hash } => {
                log::info!("[{}] Deactivation transaction {} accepted", position, hash);
                Ok(ShutdownOutcome::Submitted { hash })
            }
            TxOutcome::Rejected { code, message } => {
                log::error!(
                    "[{}] Deactivation transaction rejected: [{}] {}",
                    position,
                    code,
                    message
                );
                Err(Error::Rejected { code, message })
            }
        }
    }
}

/// Looks up the nonce of `address` and asks `signer` for a set-candidate-off
/// transaction. One seed signs singly, several seeds sign as multisig.
pub async fn sign_candidate_off(
    node: &dyn NodeApi,
    signer: &dyn TransactionSigner,
    chain_id: ChainId,
    public_key: &str,
    address: &str,
    seeds: Vec<Zeroizing<String>>,
) -> Result<String> {
    let account = node.address(address).await?;
    let request = CandidateOffRequest::new(
        chain_id,
        public_key,
        address,
        account.transaction_count + 1,
        seeds,
    )?;
    log::debug!("signing {:?}", request);
    Ok(signer.sign_candidate_off(&request).await?)
}
