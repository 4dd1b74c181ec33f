//! Core blockchain components
//!
//! This module contains the fundamental building blocks:
//! - Blocks (hash-linked, with proof of work)
//! - Blockchain (mining, difficulty adjustment, chain replacement)
//! - Transactions (UTXO model with injected signing)
//! - Unspent output tracking

pub mod block;
pub mod blockchain;
pub mod transaction;
pub mod utxo;

pub use block::{Block, GENESIS_DIFFICULTY, MAX_TIMESTAMP_DRIFT_MS};
pub use blockchain::{
    Blockchain, CancelToken, ChainError, ChainSnapshot, BLOCK_GENERATION_INTERVAL,
    DIFFICULTY_ADJUSTMENT_INTERVAL,
};
pub use transaction::{
    Transaction, TransactionError, TxIn, TxOut, COINBASE_AMOUNT, build_outputs,
    select_unspent_for_amount,
};
pub use utxo::{UnspentTxOut, UtxoSet};
