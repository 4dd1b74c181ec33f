//! Block implementation for the ledger
//!
//! A block carries an opaque payload string and is linked to its
//! predecessor by hash. The stored hash is derived from every other
//! field and is never trusted without recomputation.

use crate::crypto::sha256_hex;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Difficulty of the genesis block (leading zero bits)
pub const GENESIS_DIFFICULTY: u32 = 5;

/// Allowed clock drift in milliseconds when accepting external blocks
pub const MAX_TIMESTAMP_DRIFT_MS: i64 = 6000;

/// A block in the chain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Block index/height, increasing by one along the chain
    pub index: u64,
    /// Hash of the previous block; empty only for genesis
    pub previous_hash: String,
    /// Creation time in milliseconds since the Unix epoch; 0 for genesis
    pub timestamp: i64,
    /// Opaque payload
    pub data: String,
    /// Difficulty target (number of leading zero bits required)
    pub difficulty: u32,
    /// Nonce found by the proof-of-work search
    pub nonce: u64,
    /// Content hash over all the fields above
    pub hash: String,
}

impl Block {
    /// Create the genesis block
    pub fn genesis() -> Self {
        let mut block = Self {
            index: 0,
            previous_hash: String::new(),
            timestamp: 0,
            data: "genesis block".to_string(),
            difficulty: GENESIS_DIFFICULTY,
            nonce: 0,
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Create a new block stamped with the current time
    pub fn new(index: u64, data: &str, previous_hash: &str, difficulty: u32, nonce: u64) -> Self {
        let mut block = Self {
            index,
            previous_hash: previous_hash.to_string(),
            timestamp: unix_millis(),
            data: data.to_string(),
            difficulty,
            nonce,
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Recompute the content hash from the stored fields
    pub fn compute_hash(&self) -> String {
        let body = format!(
            "{}{}{}{}{}{}",
            self.nonce, self.index, self.previous_hash, self.timestamp, self.data, self.difficulty
        );
        sha256_hex(body.as_bytes())
    }

    /// Check whether this block is a valid successor of `predecessor`.
    ///
    /// Valid means the index increments by one, the previous-hash link
    /// matches, and the stored hash recomputes from the block's own fields.
    pub fn is_valid_successor(&self, predecessor: &Block) -> bool {
        self.index == predecessor.index + 1
            && self.previous_hash == predecessor.hash
            && self.hash == self.compute_hash()
    }

    /// Check whether this block's timestamp sits inside the drift window:
    /// no more than [`MAX_TIMESTAMP_DRIFT_MS`] behind its predecessor and
    /// no more than the same tolerance ahead of `now_ms`.
    pub fn is_timestamp_acceptable(&self, predecessor: &Block, now_ms: i64) -> bool {
        predecessor.timestamp - MAX_TIMESTAMP_DRIFT_MS < self.timestamp
            && self.timestamp - MAX_TIMESTAMP_DRIFT_MS < now_ms
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch
pub(crate) fn unix_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_block() {
        let genesis = Block::genesis();
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.previous_hash, "");
        assert_eq!(genesis.timestamp, 0);
        assert_eq!(genesis.difficulty, GENESIS_DIFFICULTY);
        assert_eq!(genesis.nonce, 0);
        assert_eq!(genesis.hash, genesis.compute_hash());
    }

    #[test]
    fn test_genesis_is_deterministic() {
        assert_eq!(Block::genesis(), Block::genesis());
    }

    #[test]
    fn test_valid_successor() {
        let genesis = Block::genesis();
        let block = Block::new(1, "payload", &genesis.hash, 0, 0);
        assert!(block.is_valid_successor(&genesis));
    }

    #[test]
    fn test_successor_rejects_bad_link() {
        let genesis = Block::genesis();

        let unlinked = Block::new(1, "payload", "not the genesis hash", 0, 0);
        assert!(!unlinked.is_valid_successor(&genesis));

        let skipped = Block::new(2, "payload", &genesis.hash, 0, 0);
        assert!(!skipped.is_valid_successor(&genesis));
    }

    #[test]
    fn test_successor_rejects_tampered_fields() {
        let genesis = Block::genesis();
        let mut block = Block::new(1, "payload", &genesis.hash, 0, 0);

        // The stored hash no longer matches the rewritten payload
        block.data = "rewritten".to_string();
        assert!(!block.is_valid_successor(&genesis));
    }

    #[test]
    fn test_timestamp_window() {
        let genesis = Block::genesis();
        let mut block = Block::new(1, "payload", &genesis.hash, 0, 0);
        let now = block.timestamp;

        assert!(block.is_timestamp_acceptable(&genesis, now));

        // Too far behind the predecessor
        block.timestamp = genesis.timestamp - MAX_TIMESTAMP_DRIFT_MS;
        assert!(!block.is_timestamp_acceptable(&genesis, now));

        // Too far ahead of the local clock
        block.timestamp = now + MAX_TIMESTAMP_DRIFT_MS;
        assert!(!block.is_timestamp_acceptable(&genesis, now));
    }
}
