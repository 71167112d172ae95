use std::fmt;

use sentinel_network_node::{Error as NodeError, NodeApi};

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessConfig {
    /// Window size crossing which stops the watcher.
    pub missed_blocks_threshold: usize,
    /// Age in blocks after which a miss is forgotten.
    pub missed_block_remove_after: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferReason {
    /// The node has not produced the height yet.
    NotFoundYet,
    /// The block exists but no validator records are attached to it yet.
    NoValidatorsSignedYet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    Signed,
    Missed,
    Deferred(DeferReason),
}

/// Classifies the block at `height` for `public_key`.
///
/// A missing block and a block with an empty validator list are both
/// deferred so that indexing lag is never counted as a miss. Any other node
/// error is returned to the caller.
pub async fn evaluate(node: &dyn NodeApi, public_key: &str, height: u64) -> Result<Evaluation> {
    let block = match node.block(height).await {
        Ok(block) => block,
        Err(NodeError::BlockNotFound { .. }) => {
            return Ok(Evaluation::Deferred(DeferReason::NotFoundYet))
        }
        Err(err) => return Err(err.into()),
    };

    if block.validators.is_empty() {
        return Ok(Evaluation::Deferred(DeferReason::NoValidatorsSignedYet));
    }

    if block.is_signed_by(public_key) {
        Ok(Evaluation::Signed)
    } else {
        Ok(Evaluation::Missed)
    }
}

/// Where the watcher stands, rendered as `height= missed=` in log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub height: u64,
    pub missed: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "height={} missed={}", self.height, self.missed)
    }
}

/// Sliding window of recently missed heights.
///
/// Owned by the watcher and mutated once per tick; nothing here is shared.
#[derive(Debug, Clone)]
pub struct LivenessState {
    last_block: u64,
    missed_heights: Vec<u64>,
    config: LivenessConfig,
    control_address: String,
}

impl LivenessState {
    pub fn new(last_block: u64, config: LivenessConfig, control_address: &str) -> Self {
        Self {
            last_block,
            missed_heights: Vec::new(),
            config,
            control_address: control_address.to_string(),
        }
    }

    pub fn last_block(&self) -> u64 {
        self.last_block
    }

    pub fn next_height(&self) -> u64 {
        self.last_block + 1
    }

    pub fn missed_heights(&self) -> &[u64] {
        &self.missed_heights
    }

    pub fn missed_count(&self) -> usize {
        self.missed_heights.len()
    }

    pub fn threshold(&self) -> usize {
        self.config.missed_blocks_threshold
    }

    pub fn config(&self) -> LivenessConfig {
        self.config
    }

    pub fn control_address(&self) -> &str {
        &self.control_address
    }

    /// Returns false for heights at or below `last_block`, which are ignored.
    pub fn record_signed(&mut self, height: u64) -> bool {
        if height <= self.last_block {
            return false;
        }
        self.last_block = height;
        true
    }

    /// Returns false for heights at or below `last_block`, which are ignored.
    pub fn record_missed(&mut self, height: u64) -> bool {
        if height <= self.last_block {
            return false;
        }
        self.last_block = height;
        self.missed_heights.push(height);
        true
    }

    /// Forgets misses at least `missed_block_remove_after` blocks old.
    /// Returns how many were dropped.
    pub fn prune(&mut self) -> usize {
        let before = self.missed_heights.len();
        let last_block = self.last_block;
        let remove_after = self.config.missed_block_remove_after;
        self.missed_heights
            .retain(|height| last_block - height < remove_after);
        before - self.missed_heights.len()
    }

    pub fn is_over_threshold(&self) -> bool {
        self.missed_heights.len() >= self.config.missed_blocks_threshold
    }
}
