//! Minicoin: a compact proof-of-work blockchain ledger
//!
//! This crate provides the core of a coin ledger:
//! - Proof of Work mining with a leading-zero-bit difficulty target
//! - Periodic difficulty adjustment from observed block times
//! - Cumulative-work arbitration between competing chains
//! - UTXO-based transactions signed through a caller-supplied [`Signer`]
//! - Serializable chain snapshots
//!
//! All chain mutation goes through one logical writer; concurrent readers
//! work from [`ChainSnapshot`] values taken from it, and long mining runs
//! stay responsive through [`CancelToken`].
//!
//! # Example
//!
//! ```rust
//! use minicoin::core::{Blockchain, Transaction, UtxoSet};
//!
//! // Create a chain and mine a block onto it
//! let mut blockchain = Blockchain::new();
//! let block = blockchain.mine_block("hello world").unwrap();
//! assert_eq!(block.index, 1);
//!
//! // Credit the miner and check the balance
//! let coinbase = Transaction::coinbase("miner-address", block.index);
//! let utxos = UtxoSet::new().apply(&[coinbase]);
//! assert_eq!(utxos.balance_of("miner-address"), 50);
//! ```

pub mod core;
pub mod crypto;
pub mod wallet;

// Re-export commonly used types
pub use crate::core::{
    Block, Blockchain, CancelToken, ChainError, ChainSnapshot, Transaction, TransactionError,
    TxIn, TxOut, UnspentTxOut, UtxoSet,
};
pub use crate::wallet::{create_transaction, Signer};
