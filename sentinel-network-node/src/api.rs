use async_trait::async_trait;

use crate::models::{Address, Block, Candidate, Status, TxOutcome};
use crate::Result;

/// Read/write surface of a Minter node.
///
/// Implemented by a single HTTP endpoint, by the failover client spanning
/// several endpoints, and by in-process test chains.
#[async_trait]
pub trait NodeApi: Send + Sync {
    /// Where calls are sent, for log lines.
    fn url(&self) -> &str;

    async fn status(&self) -> Result<Status>;

    /// Fails with `Error::BlockNotFound` while the height is not produced yet.
    async fn block(&self, height: u64) -> Result<Block>;

    /// Fails with `Error::CandidateNotFound` for unknown public keys.
    async fn candidate(&self, public_key: &str) -> Result<Candidate>;

    async fn address(&self, address: &str) -> Result<Address>;

    async fn send_transaction(&self, tx: &str) -> Result<TxOutcome>;
}
