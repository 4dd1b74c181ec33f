//! Transactions and coin ownership
//!
//! Implements a UTXO-based transfer model. A [`Transaction`] consumes
//! unspent outputs and creates new ones; its id is a SHA-256 digest of its
//! contents, and each input carries a signature over that id produced by
//! the owner of the output it spends.

use crate::core::utxo::{UnspentTxOut, UtxoSet};
use crate::crypto::sha256_hex;
use crate::wallet::Signer;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Reward paid to the miner by each block's coinbase transaction
pub const COINBASE_AMOUNT: u64 = 50;

// =============================================================================
// Error Types
// =============================================================================

/// Transaction-related errors
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Transaction has no input at index {0}")]
    InputIndexOutOfBounds(usize),
    #[error("Referenced output {tx_id}:{index} is not unspent")]
    UnknownUnspentOutput { tx_id: String, index: u64 },
    #[error("Output belongs to {expected} but the signer controls {found}")]
    AddressMismatch { expected: String, found: String },
    #[error("Insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: u64, need: u64 },
}

// =============================================================================
// Transaction Input
// =============================================================================

/// Reference to an unspent output, plus the signature that unlocks it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TxIn {
    /// Id of the transaction whose output is being spent
    pub source_tx_id: String,
    /// Index of that output within the source transaction
    pub source_output_index: u64,
    /// Signature over the spending transaction's id. `None` until signed;
    /// coinbase inputs are never signed.
    pub signature: Option<String>,
}

// =============================================================================
// Transaction Output
// =============================================================================

/// A new output granting `amount` coins to `address`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TxOut {
    /// Receiving public address
    pub address: String,
    /// Value in coins
    pub amount: u64,
}

// =============================================================================
// Transaction
// =============================================================================

/// A transfer of coins from unspent outputs to new outputs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Content digest, see [`Transaction::calculate_id`]
    pub id: String,
    /// Outputs being consumed
    pub inputs: Vec<TxIn>,
    /// Outputs being created
    pub outputs: Vec<TxOut>,
}

impl Transaction {
    /// Assemble a transaction and stamp its id
    pub fn new(inputs: Vec<TxIn>, outputs: Vec<TxOut>) -> Self {
        let mut tx = Transaction {
            id: String::new(),
            inputs,
            outputs,
        };
        tx.id = tx.calculate_id();
        tx
    }

    /// Create the coinbase transaction rewarding `miner_address` for the
    /// block at `block_index`.
    ///
    /// The block index rides in the input's output-index slot, which keeps
    /// every coinbase id distinct even though the reward amount and the
    /// miner address can repeat across blocks.
    pub fn coinbase(miner_address: &str, block_index: u64) -> Self {
        Transaction::new(
            vec![TxIn {
                source_tx_id: String::new(),
                source_output_index: block_index,
                signature: None,
            }],
            vec![TxOut {
                address: miner_address.to_string(),
                amount: COINBASE_AMOUNT,
            }],
        )
    }

    /// Calculate the transaction id: a digest of every output
    /// (address, amount) followed by every input (source id, source index),
    /// concatenated without separators.
    ///
    /// Signatures are not part of the id, so signing an input does not
    /// change the message being signed.
    pub fn calculate_id(&self) -> String {
        let outputs: String = self
            .outputs
            .iter()
            .map(|out| format!("{}{}", out.address, out.amount))
            .collect();
        let inputs: String = self
            .inputs
            .iter()
            .map(|input| format!("{}{}", input.source_tx_id, input.source_output_index))
            .collect();
        sha256_hex(format!("{}{}", outputs, inputs).as_bytes())
    }

    /// Produce the signature for the input at `input_index`.
    ///
    /// The signer must control the address that owns the referenced unspent
    /// output. The message signed is the transaction id, so one signature
    /// commits to every input and output at once.
    pub fn sign_input(
        &self,
        input_index: usize,
        signer: &dyn Signer,
        utxo_set: &UtxoSet,
    ) -> Result<String, TransactionError> {
        let input = self
            .inputs
            .get(input_index)
            .ok_or(TransactionError::InputIndexOutOfBounds(input_index))?;
        let referenced = utxo_set
            .find(&input.source_tx_id, input.source_output_index)
            .ok_or_else(|| TransactionError::UnknownUnspentOutput {
                tx_id: input.source_tx_id.clone(),
                index: input.source_output_index,
            })?;
        let signer_address = signer.public_address();
        if referenced.address != signer_address {
            return Err(TransactionError::AddressMismatch {
                expected: referenced.address.clone(),
                found: signer_address,
            });
        }
        Ok(signer.sign(&self.id))
    }
}

// =============================================================================
// Coin Selection
// =============================================================================

/// Pick unspent outputs until they cover `amount`.
///
/// Walks `available` in order. Each entry is taken before the running total
/// is checked, so the picks can overshoot; the second element of the result
/// is the leftover that must be returned to the sender as change.
pub fn select_unspent_for_amount(
    amount: u64,
    available: &[UnspentTxOut],
) -> Result<(Vec<UnspentTxOut>, u64), TransactionError> {
    let mut selected: Vec<UnspentTxOut> = Vec::new();
    let mut total: u64 = 0;
    for unspent in available {
        selected.push(unspent.clone());
        total += unspent.amount;
        if total >= amount {
            return Ok((selected, total - amount));
        }
    }
    Err(TransactionError::InsufficientFunds {
        have: total,
        need: amount,
    })
}

/// Build the outputs for a payment: one to the receiver, plus one back to
/// the sender when there is change to return
pub fn build_outputs(receiver: &str, sender: &str, amount: u64, leftover: u64) -> Vec<TxOut> {
    let mut outputs = vec![TxOut {
        address: receiver.to_string(),
        amount,
    }];
    if leftover > 0 {
        outputs.push(TxOut {
            address: sender.to_string(),
            amount: leftover,
        });
    }
    outputs
}

// =============================================================================
// Tests
// =============================================================================
