//! Wallet operations
//!
//! Key material stays outside this crate: callers hand in a [`Signer`]
//! and the wallet assembles and signs transactions against the current
//! unspent set.

use crate::core::transaction::{build_outputs, select_unspent_for_amount};
use crate::core::{Transaction, TransactionError, TxIn, UtxoSet};

/// Signing capability injected by the caller.
///
/// Implementations hold their key material however they like; this crate
/// only asks for the address the keys control and signatures over
/// arbitrary string messages.
pub trait Signer {
    /// Address whose unspent outputs this signer can spend
    fn public_address(&self) -> String;

    /// Sign `message` with the key behind [`Signer::public_address`]
    fn sign(&self, message: &str) -> String;
}

/// Build and sign a payment of `amount` coins to `receiver`.
///
/// Coins are drawn from the signer's own unspent outputs and any leftover
/// goes back to the signer's address as change. Every input is signed over
/// the finished transaction id. The unspent set is not modified here;
/// apply the returned transaction to it once accepted.
pub fn create_transaction(
    receiver: &str,
    amount: u64,
    signer: &dyn Signer,
    utxo_set: &UtxoSet,
) -> Result<Transaction, TransactionError> {
    let sender = signer.public_address();
    let mine = utxo_set.owned_by(&sender);
    let (included, leftover) = select_unspent_for_amount(amount, &mine)?;

    let inputs: Vec<TxIn> = included
        .iter()
        .map(|unspent| TxIn {
            source_tx_id: unspent.source_tx_id.clone(),
            source_output_index: unspent.source_output_index,
            signature: None,
        })
        .collect();

    let mut tx = Transaction::new(inputs, build_outputs(receiver, &sender, amount, leftover));

    // Signatures do not feed the id, so signing after assembly leaves the
    // id valid
    let signatures: Vec<String> = (0..tx.inputs.len())
        .map(|index| tx.sign_input(index, signer, utxo_set))
        .collect::<Result<_, _>>()?;
    for (input, signature) in tx.inputs.iter_mut().zip(signatures) {
        input.signature = Some(signature);
    }

    Ok(tx)
}
