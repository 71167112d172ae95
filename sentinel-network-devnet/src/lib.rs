use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use sentinel_network_node::models::{
    Address, Block, BlockValidator, Candidate, Status, TxOutcome, CANDIDATE_STATUS_ONLINE,
};
use sentinel_network_node::{Error, NodeApi, Result};

pub const PUBLIC_KEY: &str = "Mp61022c1428f17e02e5b3b130564ab3d37d41ad32ba361b5704642f079888c821";
pub const CONTROL_ADDRESS: &str = "Mx4e16a6bfc1bac5f4cf94ef60ab5047510a32abbc";
pub const MULTISIG_ADDRESS: &str = "Mx8b7cd0d453da25954b230de2233605cc35813bd2";
pub const OTHER_PUBLIC_KEY: &str = "Mp2c4bdc6ce3ed9b7e9c3e9a0c0ebd29b2f0b7b17f1d3bf4bde7ea3b3bde83e9aa";

const URL: &str = "devnet://local";

/// How the watched validator behaves in a produced block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signing {
    Signed,
    Missed,
    /// Block exists but carries no validator records yet.
    Empty,
}

/// A scripted single-node chain.
///
/// Blocks are produced explicitly by the test; heights above the latest
/// produced block answer `BlockNotFound` like a real node does.
pub struct Devnet {
    state: Mutex<DevnetState>,
}

#[derive(Default)]
struct DevnetState {
    latest_height: u64,
    catching_up: bool,
    unreachable: bool,
    blocks: BTreeMap<u64, Vec<BlockValidator>>,
    candidates: HashMap<String, Candidate>,
    transaction_counts: HashMap<String, u64>,
    rejection: Option<(u64, String)>,
    submitted: Vec<String>,
    block_requests: Vec<u64>,
}

impl Default for Devnet {
    fn default() -> Self {
        Self::new()
    }
}

impl Devnet {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DevnetState::default()),
        }
    }

    /// Devnet with [`PUBLIC_KEY`] registered as an online validator.
    pub fn with_validator() -> Self {
        let devnet = Self::new();
        devnet.register_candidate(Candidate {
            public_key: PUBLIC_KEY.to_string(),
            control_address: CONTROL_ADDRESS.to_string(),
            owner_address: CONTROL_ADDRESS.to_string(),
            reward_address: CONTROL_ADDRESS.to_string(),
            status: CANDIDATE_STATUS_ONLINE,
            is_validator: true,
            jailed_until: 0,
        });
        devnet
    }

    fn lock(&self) -> MutexGuard<'_, DevnetState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register_candidate(&self, candidate: Candidate) {
        self.lock()
            .candidates
            .insert(candidate.public_key.clone(), candidate);
    }

    pub fn update_candidate(&self, public_key: &str, update: impl FnOnce(&mut Candidate)) {
        if let Some(candidate) = self.lock().candidates.get_mut(public_key) {
            update(candidate);
        }
    }

    /// Produces the next block with [`PUBLIC_KEY`] behaving as `signing`.
    pub fn produce(&self, signing: Signing) -> u64 {
        let validators = match signing {
            Signing::Empty => vec![],
            Signing::Signed | Signing::Missed => vec![
                BlockValidator {
                    public_key: PUBLIC_KEY.to_string(),
                    signed: signing == Signing::Signed,
                },
                BlockValidator {
                    public_key: OTHER_PUBLIC_KEY.to_string(),
                    signed: true,
                },
            ],
        };
        self.produce_with(validators)
    }

    pub fn produce_all(&self, script: &[Signing]) -> u64 {
        script
            .iter()
            .map(|signing| self.produce(*signing))
            .last()
            .unwrap_or_else(|| self.latest_height())
    }

    pub fn produce_with(&self, validators: Vec<BlockValidator>) -> u64 {
        let mut state = self.lock();
        state.latest_height += 1;
        let height = state.latest_height;
        state.blocks.insert(height, validators);
        height
    }

    pub fn latest_height(&self) -> u64 {
        self.lock().latest_height
    }

    pub fn set_catching_up(&self, catching_up: bool) {
        self.lock().catching_up = catching_up;
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    pub fn set_transaction_count(&self, address: &str, count: u64) {
        self.lock()
            .transaction_counts
            .insert(address.to_string(), count);
    }

    pub fn reject_transactions(&self, code: u64, message: &str) {
        self.lock().rejection = Some((code, message.to_string()));
    }

    pub fn submitted(&self) -> Vec<String> {
        self.lock().submitted.clone()
    }

    pub fn block_requests(&self) -> Vec<u64> {
        self.lock().block_requests.clone()
    }

    fn reachable(&self) -> Result<MutexGuard<'_, DevnetState>> {
        let state = self.lock();
        if state.unreachable {
            return Err(Error::Transport {
                endpoint: URL.to_string(),
                reason: "devnet is unreachable".to_string(),
            });
        }
        Ok(state)
    }
}

#[async_trait]
impl NodeApi for Devnet {
    fn url(&self) -> &str {
        URL
    }

    async fn status(&self) -> Result<Status> {
        let state = self.reachable()?;
        Ok(Status {
            latest_height: state.latest_height,
            catching_up: state.catching_up,
        })
    }

    async fn block(&self, height: u64) -> Result<Block> {
        let mut state = self.reachable()?;
        state.block_requests.push(height);
        if height > state.latest_height {
            return Err(Error::BlockNotFound { height });
        }
        Ok(Block {
            height,
            hash: format!("{height:064X}"),
            proposer: OTHER_PUBLIC_KEY.to_string(),
            validators: state.blocks.get(&height).cloned().unwrap_or_default(),
        })
    }

    async fn candidate(&self, public_key: &str) -> Result<Candidate> {
        let state = self.reachable()?;
        state
            .candidates
            .get(public_key)
            .cloned()
            .ok_or_else(|| Error::CandidateNotFound {
                public_key: public_key.to_string(),
            })
    }

    async fn address(&self, address: &str) -> Result<Address> {
        let state = self.reachable()?;
        Ok(Address {
            transaction_count: state.transaction_counts.get(address).copied().unwrap_or(0),
        })
    }

    async fn send_transaction(&self, tx: &str) -> Result<TxOutcome> {
        let mut state = self.reachable()?;
        state.submitted.push(tx.to_string());
        if let Some((code, message)) = state.rejection.clone() {
            return Ok(TxOutcome::Rejected { code, message });
        }
        Ok(TxOutcome::Accepted {
            hash: format!("Mt{:064x}", state.submitted.len()),
        })
    }
}
