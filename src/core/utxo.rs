//! Unspent-output tracking
//!
//! The [`UtxoSet`] is the sole source of truth for spendable balances.
//! It is never mutated in place: applying a batch of transactions builds
//! a fresh set, which the caller swaps in for the old one.

use crate::core::transaction::Transaction;
use serde::{Deserialize, Serialize};

/// One spendable transaction output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnspentTxOut {
    /// Id of the transaction that created this output
    pub source_tx_id: String,
    /// Position of this output in that transaction
    pub source_output_index: u64,
    /// Owner's public address
    pub address: String,
    /// Value in coins
    pub amount: u64,
}

/// The set of all unspent outputs, in creation order.
///
/// Entry order is part of the contract: retained entries keep their
/// position and new outputs are appended, so coin selection and
/// serialization stay deterministic. Serializes as a plain list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct UtxoSet {
    entries: Vec<UnspentTxOut>,
}

impl UtxoSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Look up one output by its (transaction id, output index) key
    pub fn find(&self, tx_id: &str, index: u64) -> Option<&UnspentTxOut> {
        self.entries
            .iter()
            .find(|u| u.source_tx_id == tx_id && u.source_output_index == index)
    }

    /// Build the set that results from applying `transactions`.
    ///
    /// The result keeps every entry whose key is not consumed by an input
    /// of the batch, followed by every output the batch creates, in batch
    /// order. Inputs are assumed authorized and present: signature
    /// verification happens before this layer is called.
    pub fn apply(&self, transactions: &[Transaction]) -> UtxoSet {
        let new_outputs: Vec<UnspentTxOut> = transactions
            .iter()
            .flat_map(|tx| {
                tx.outputs.iter().enumerate().map(|(i, out)| UnspentTxOut {
                    source_tx_id: tx.id.clone(),
                    source_output_index: i as u64,
                    address: out.address.clone(),
                    amount: out.amount,
                })
            })
            .collect();

        let consumed: Vec<(&str, u64)> = transactions
            .iter()
            .flat_map(|tx| &tx.inputs)
            .map(|input| (input.source_tx_id.as_str(), input.source_output_index))
            .collect();

        let mut entries: Vec<UnspentTxOut> = self
            .entries
            .iter()
            .filter(|u| {
                !consumed
                    .iter()
                    .any(|&(id, index)| id == u.source_tx_id && index == u.source_output_index)
            })
            .cloned()
            .collect();
        entries.extend(new_outputs);

        UtxoSet { entries }
    }

    /// Sum of amounts owned by `address`
    pub fn balance_of(&self, address: &str) -> u64 {
        self.entries
            .iter()
            .filter(|u| u.address == address)
            .map(|u| u.amount)
            .sum()
    }

    /// Entries owned by `address`, in set order
    pub fn owned_by(&self, address: &str) -> Vec<UnspentTxOut> {
        self.entries
            .iter()
            .filter(|u| u.address == address)
            .cloned()
            .collect()
    }

    /// Read-only iterator over all entries
    pub fn iter(&self) -> impl Iterator<Item = &UnspentTxOut> {
        self.entries.iter()
    }

    /// Number of entries in the set
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for UtxoSet {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<UnspentTxOut>> for UtxoSet {
    fn from(entries: Vec<UnspentTxOut>) -> Self {
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::{Transaction, TxIn, TxOut};

    fn entry(tx_id: &str, index: u64, address: &str, amount: u64) -> UnspentTxOut {
        UnspentTxOut {
            source_tx_id: tx_id.to_string(),
            source_output_index: index,
            address: address.to_string(),
            amount,
        }
    }

    #[test]
    fn test_find() {
        let set = UtxoSet::from(vec![entry("tx1", 0, "A", 50)]);
        assert!(set.find("tx1", 0).is_some());
        assert!(set.find("tx1", 1).is_none());
        assert!(set.find("tx2", 0).is_none());
    }

    #[test]
    fn test_apply_spends_and_creates() {
        let set = UtxoSet::from(vec![entry("tx1", 0, "A", 50)]);
        let tx = Transaction::new(
            vec![TxIn {
                source_tx_id: "tx1".to_string(),
                source_output_index: 0,
                signature: None,
            }],
            vec![
                TxOut {
                    address: "B".to_string(),
                    amount: 30,
                },
                TxOut {
                    address: "A".to_string(),
                    amount: 20,
                },
            ],
        );

        let next = set.apply(std::slice::from_ref(&tx));

        assert!(next.find("tx1", 0).is_none());
        assert_eq!(next.find(&tx.id, 0).unwrap().address, "B");
        assert_eq!(next.find(&tx.id, 1).unwrap().address, "A");
        assert_eq!(next.len(), 2);
        assert_eq!(next.balance_of("A"), 20);
        assert_eq!(next.balance_of("B"), 30);

        // The original set is untouched
        assert_eq!(set.balance_of("A"), 50);
    }

    #[test]
    fn test_apply_keeps_unrelated_entries_in_order() {
        let set = UtxoSet::from(vec![
            entry("tx1", 0, "A", 10),
            entry("tx2", 0, "B", 20),
            entry("tx3", 0, "A", 30),
        ]);
        let tx = Transaction::new(
            vec![TxIn {
                source_tx_id: "tx2".to_string(),
                source_output_index: 0,
                signature: None,
            }],
            vec![TxOut {
                address: "C".to_string(),
                amount: 20,
            }],
        );

        let next = set.apply(std::slice::from_ref(&tx));
        let keys: Vec<(&str, u64)> = next
            .iter()
            .map(|u| (u.source_tx_id.as_str(), u.source_output_index))
            .collect();
        assert_eq!(keys, vec![("tx1", 0), ("tx3", 0), (tx.id.as_str(), 0)]);
    }

    #[test]
    fn test_apply_order_of_independent_transactions() {
        let set = UtxoSet::from(vec![entry("tx1", 0, "A", 50), entry("tx2", 0, "B", 70)]);

        let a = Transaction::new(
            vec![TxIn {
                source_tx_id: "tx1".to_string(),
                source_output_index: 0,
                signature: None,
            }],
            vec![TxOut {
                address: "C".to_string(),
                amount: 50,
            }],
        );
        let b = Transaction::new(
            vec![TxIn {
                source_tx_id: "tx2".to_string(),
                source_output_index: 0,
                signature: None,
            }],
            vec![TxOut {
                address: "D".to_string(),
                amount: 70,
            }],
        );

        let ab = set.apply(&[a.clone(), b.clone()]);
        let ba = set.apply(&[b, a]);

        // Same spendable content either way; only append order may differ
        assert_eq!(ab.len(), ba.len());
        assert_eq!(ab.balance_of("C"), ba.balance_of("C"));
        assert_eq!(ab.balance_of("D"), ba.balance_of("D"));

        // Applying an empty batch changes nothing
        assert_eq!(ab.apply(&[]), ab);
    }

    #[test]
    fn test_balance_of_unknown_address() {
        let set = UtxoSet::from(vec![entry("tx1", 0, "A", 50)]);
        assert_eq!(set.balance_of("nobody"), 0);
    }

    #[test]
    fn test_wire_names() {
        let set = UtxoSet::from(vec![entry("tx1", 0, "A", 50)]);

        let json = serde_json::to_string(&set).unwrap();

        // Serializes as a bare list of entries
        assert!(json.starts_with('['));
        assert!(json.contains("\"sourceTxId\":\"tx1\""));
        assert!(json.contains("\"sourceOutputIndex\":0"));
        assert!(json.contains("\"address\":\"A\""));
        assert!(json.contains("\"amount\":50"));

        let restored: UtxoSet = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, set);
    }
}
