//! Blockchain implementation
//!
//! The main chain structure: mines blocks onto the tip, re-evaluates the
//! proof-of-work difficulty on interval boundaries, and arbitrates between
//! competing chains by cumulative work.

use crate::core::block::{unix_millis, Block};
use crate::crypto::meets_difficulty;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Number of blocks between difficulty adjustments
pub const DIFFICULTY_ADJUSTMENT_INTERVAL: u64 = 10;

/// Target spacing between blocks, in seconds
pub const BLOCK_GENERATION_INTERVAL: u64 = 10;

// =============================================================================
// Error Types
// =============================================================================

/// Chain-related errors
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Invalid block at index {0}")]
    InvalidBlock(u64),
    #[error("Candidate chain does not start with the expected genesis block")]
    GenesisMismatch,
    #[error("Block at index {0} has an unacceptable timestamp")]
    InvalidTimestamp(u64),
    #[error("Candidate chain is not heavier: local {local}, candidate {candidate}")]
    WeakerChain { local: u128, candidate: u128 },
    #[error("Chain of {length} blocks is too short for adjustment interval {interval}")]
    DifficultyAdjustmentUnderflow { length: u64, interval: u64 },
    #[error("Mining was cancelled")]
    MiningCancelled,
}

// =============================================================================
// Cancel Token
// =============================================================================

/// Cooperative stop flag for a mining run.
///
/// Clones share one flag, so a holder on another thread can stop a miner
/// mid-search. Once cancelled, a token stays cancelled.
#[derive(Debug, Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Ask any miner holding this token to stop
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether a cancel has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Chain Snapshot
// =============================================================================

/// Serializable copy of the full chain state.
///
/// Snapshots carry blocks exactly as mined; restoring one yields the same
/// hashes and the same cumulative difficulty it was taken with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChainSnapshot {
    /// Every block from genesis to tip
    pub blocks: Vec<Block>,
    /// Blocks between difficulty reviews
    pub difficulty_adjustment_interval: u64,
    /// Target block spacing in seconds
    pub block_generation_interval: u64,
    /// Total work across all blocks
    pub cumulative_difficulty: u128,
}

// =============================================================================
// Blockchain
// =============================================================================

/// The chain of blocks plus the parameters that govern mining.
///
/// All mutation goes through one logical writer; readers work from the
/// value returned by [`Blockchain::snapshot`].
#[derive(Debug, Clone)]
pub struct Blockchain {
    blocks: Vec<Block>,
    difficulty_adjustment_interval: u64,
    block_generation_interval: u64,
    cumulative_difficulty: u128,
}

impl Blockchain {
    /// Create a chain holding only the genesis block
    pub fn new() -> Self {
        Self::with_params(DIFFICULTY_ADJUSTMENT_INTERVAL, BLOCK_GENERATION_INTERVAL)
    }

    /// Create a chain with custom adjustment parameters:
    /// `difficulty_adjustment_interval` blocks between difficulty reviews
    /// and `block_generation_interval` seconds of target block spacing
    pub fn with_params(
        difficulty_adjustment_interval: u64,
        block_generation_interval: u64,
    ) -> Self {
        let genesis = Block::genesis();
        let cumulative_difficulty = block_work(&genesis);
        Self {
            blocks: vec![genesis],
            difficulty_adjustment_interval,
            block_generation_interval,
            cumulative_difficulty,
        }
    }

    /// All blocks from genesis to tip
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Get the latest block
    pub fn latest_block(&self) -> &Block {
        self.blocks
            .last()
            .expect("Blockchain should have at least genesis block")
    }

    /// Total work across all blocks, counting each as 2^difficulty
    pub fn cumulative_difficulty(&self) -> u128 {
        self.cumulative_difficulty
    }

    /// Blocks between difficulty adjustments
    pub fn difficulty_adjustment_interval(&self) -> u64 {
        self.difficulty_adjustment_interval
    }

    /// Target seconds between blocks
    pub fn block_generation_interval(&self) -> u64 {
        self.block_generation_interval
    }

    /// Difficulty the next mined block must satisfy.
    ///
    /// Returns the tip's difficulty, re-evaluated against recent block
    /// times whenever the tip index is a positive multiple of the
    /// adjustment interval.
    pub fn current_difficulty(&self) -> Result<u32, ChainError> {
        let latest = self.latest_block();
        if self.difficulty_adjustment_interval > 0
            && latest.index > 0
            && latest.index % self.difficulty_adjustment_interval == 0
        {
            self.adjusted_difficulty()
        } else {
            Ok(latest.difficulty)
        }
    }

    /// Recompute the difficulty from the time the last adjustment window
    /// took.
    ///
    /// Compares the span between the tip and the block that opened the
    /// window against the target span. Less than half the target raises
    /// the difficulty by one, more than double lowers it by one, and
    /// anything in between leaves it unchanged.
    pub fn adjusted_difficulty(&self) -> Result<u32, ChainError> {
        let interval = self.difficulty_adjustment_interval as usize;
        if interval == 0 || self.blocks.len() < interval {
            return Err(ChainError::DifficultyAdjustmentUnderflow {
                length: self.blocks.len() as u64,
                interval: self.difficulty_adjustment_interval,
            });
        }

        let anchor = &self.blocks[self.blocks.len() - interval];
        let latest = self.latest_block();

        let time_taken = latest.timestamp - anchor.timestamp;
        let expected =
            (self.difficulty_adjustment_interval * self.block_generation_interval * 1000) as i64;

        let adjusted = if time_taken < expected / 2 {
            anchor.difficulty.saturating_add(1)
        } else if time_taken > expected * 2 {
            anchor.difficulty.saturating_sub(1)
        } else {
            anchor.difficulty
        };

        if adjusted != anchor.difficulty {
            log::info!(
                "Difficulty adjusted from {} to {} (time taken: {}ms, expected: {}ms)",
                anchor.difficulty,
                adjusted,
                time_taken,
                expected
            );
        }

        Ok(adjusted)
    }

    /// Mine a block carrying `data` onto the tip of the chain
    pub fn mine_block(&mut self, data: &str) -> Result<Block, ChainError> {
        self.mine_block_cancellable(data, &CancelToken::new())
    }

    /// Mine a block, checking `token` between attempts.
    ///
    /// Each attempt rebuilds the candidate, so its timestamp tracks the
    /// clock while the search runs. The nonce wraps around at `u64::MAX`;
    /// the refreshed timestamp keeps the search space moving. Returns
    /// [`ChainError::MiningCancelled`] if the token fires before a hash
    /// clears the difficulty target.
    pub fn mine_block_cancellable(
        &mut self,
        data: &str,
        token: &CancelToken,
    ) -> Result<Block, ChainError> {
        let difficulty = self.current_difficulty()?;
        let previous = self.latest_block().clone();
        log::info!(
            "Mining block {} with difficulty {}...",
            previous.index + 1,
            difficulty
        );

        let start = Instant::now();
        let mut attempts: u64 = 0;
        let mut nonce: u64 = 0;
        loop {
            if token.is_cancelled() {
                return Err(ChainError::MiningCancelled);
            }
            let candidate =
                Block::new(previous.index + 1, data, &previous.hash, difficulty, nonce);
            attempts += 1;
            if meets_difficulty(&candidate.hash, difficulty) {
                let elapsed = start.elapsed();
                let hash_rate = if elapsed.as_secs_f64() > 0.0 {
                    attempts as f64 / elapsed.as_secs_f64()
                } else {
                    0.0
                };
                log::info!(
                    "Block {} mined in {}ms ({} attempts, {:.2} H/s)",
                    candidate.index,
                    elapsed.as_millis(),
                    attempts,
                    hash_rate
                );
                self.append_block(candidate)?;
                return Ok(self.latest_block().clone());
            }
            nonce = nonce.wrapping_add(1);
        }
    }

    /// Append a block after checking it extends the current tip
    fn append_block(&mut self, block: Block) -> Result<(), ChainError> {
        if !block.is_valid_successor(self.latest_block()) {
            return Err(ChainError::InvalidBlock(block.index));
        }
        self.cumulative_difficulty = self.cumulative_difficulty.saturating_add(block_work(&block));
        self.blocks.push(block);
        Ok(())
    }

    /// Check that `candidate` is a complete, internally consistent chain.
    ///
    /// The first block must equal the local genesis block and every later
    /// block must be a valid successor of the one before it.
    pub fn validate_chain(&self, candidate: &[Block]) -> Result<(), ChainError> {
        match candidate.first() {
            Some(first) if *first == self.blocks[0] => {}
            _ => return Err(ChainError::GenesisMismatch),
        }
        for pair in candidate.windows(2) {
            if !pair[1].is_valid_successor(&pair[0]) {
                return Err(ChainError::InvalidBlock(pair[1].index));
            }
        }
        Ok(())
    }

    /// Adopt `candidate` if it is valid and carries strictly more work
    /// than the local chain.
    ///
    /// Ties go to the incumbent. Timestamps are re-checked pairwise
    /// against the local clock on the way in, so a chain from the future
    /// is rejected before its weight is considered.
    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> Result<(), ChainError> {
        self.validate_chain(&candidate)?;

        let now_ms = unix_millis();
        for pair in candidate.windows(2) {
            if !pair[1].is_timestamp_acceptable(&pair[0], now_ms) {
                return Err(ChainError::InvalidTimestamp(pair[1].index));
            }
        }

        let local = self.cumulative_difficulty;
        let incoming = chain_work(&candidate);
        if incoming <= local {
            log::warn!(
                "Rejecting candidate chain: local weight {}, candidate weight {}",
                local,
                incoming
            );
            return Err(ChainError::WeakerChain {
                local,
                candidate: incoming,
            });
        }

        log::info!(
            "Replacing chain of {} blocks (weight {}) with {} blocks (weight {})",
            self.blocks.len(),
            local,
            candidate.len(),
            incoming
        );
        self.blocks = candidate;
        self.cumulative_difficulty = incoming;
        Ok(())
    }

    /// Take a serializable copy of the full chain state
    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            blocks: self.blocks.clone(),
            difficulty_adjustment_interval: self.difficulty_adjustment_interval,
            block_generation_interval: self.block_generation_interval,
            cumulative_difficulty: self.cumulative_difficulty,
        }
    }

    /// Rebuild a chain from a snapshot, revalidating every link.
    ///
    /// Blocks are adopted exactly as stored and the cumulative difficulty
    /// is recomputed from them, so the restored chain reports the same
    /// hashes and weight the snapshot was taken with.
    pub fn from_snapshot(snapshot: ChainSnapshot) -> Result<Self, ChainError> {
        let mut chain = Blockchain::with_params(
            snapshot.difficulty_adjustment_interval,
            snapshot.block_generation_interval,
        );
        chain.validate_chain(&snapshot.blocks)?;
        chain.cumulative_difficulty = chain_work(&snapshot.blocks);
        chain.blocks = snapshot.blocks;
        Ok(chain)
    }
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Work
// =============================================================================

/// Work contributed by one block, counted as 2^difficulty
fn block_work(block: &Block) -> u128 {
    1u128 << block.difficulty.min(127)
}

/// Total work in a chain, saturating at the top of u128
fn chain_work(blocks: &[Block]) -> u128 {
    blocks
        .iter()
        .fold(0u128, |acc, block| acc.saturating_add(block_work(block)))
}

// =============================================================================
// Tests
// =============================================================================
