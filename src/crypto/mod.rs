//! Cryptographic utilities for the blockchain
//!
//! This module provides:
//! - SHA-256 hashing
//! - Proof-of-work difficulty checks over hex digests

pub mod hash;

pub use hash::{meets_difficulty, sha256, sha256_hex};
