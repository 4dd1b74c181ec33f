//! Cryptographic hashing utilities for the ledger
//!
//! Provides the SHA-256 digest used for block hashes and transaction ids,
//! and the leading-zero-bit difficulty check for proof of work.

use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes SHA-256 hash and returns it as a lowercase hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Checks if a hex-encoded hash meets the difficulty target.
///
/// The hash is read as a big-endian bit string of length 4 x (digit count),
/// each digit contributing its four bits. The target is met when the first
/// `difficulty` bits are all zero. A difficulty larger than the hash's bit
/// length can never be met and yields false, as does any non-hex character.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let mut remaining = difficulty as usize;
    for c in hash.chars() {
        if remaining == 0 {
            return true;
        }
        let digit = match c.to_digit(16) {
            Some(d) => d,
            None => return false,
        };
        let bits = remaining.min(4);
        if digit >> (4 - bits) != 0 {
            return false;
        }
        remaining -= bits;
    }
    remaining == 0
}
