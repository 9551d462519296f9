//! Transaction records and their canonical serialization.
//!
//! A transaction is either a bare integer or a `{from, to, amount}` transfer.
//! Each form has one canonical text rendering, and that text is what gets
//! hashed into a Merkle leaf.

use crate::crypto::{Digest, Hashable};
use crate::error::{Result, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// A transaction record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Transaction {
    /// A bare numeric value, hashed as its decimal string
    SimpleValue(i64),
    /// A value transfer between two parties
    Transfer {
        from: String,
        to: String,
        amount: u64,
    },
}

impl Transaction {
    pub fn simple(value: i64) -> Self {
        Transaction::SimpleValue(value)
    }

    pub fn transfer(from: impl Into<String>, to: impl Into<String>, amount: u64) -> Self {
        Transaction::Transfer {
            from: from.into(),
            to: to.into(),
            amount,
        }
    }

    /// Parse a loosely-shaped JSON record, reporting precisely what is wrong.
    ///
    /// Unknown fields on a transfer are ignored and never reach the hash input.
    pub fn from_value(value: &Value, index: usize) -> Result<Self> {
        let invalid = |reason: &str| ValidationError::InvalidTransaction {
            index,
            reason: reason.to_string(),
        };

        let tx = match value {
            Value::Number(n) => n
                .as_i64()
                .map(Transaction::SimpleValue)
                .ok_or_else(|| invalid("simple value must be an integer"))?,
            Value::Object(fields) => {
                let party = |key: &str| -> std::result::Result<String, ValidationError> {
                    match fields.get(key) {
                        Some(Value::String(s)) => Ok(s.clone()),
                        Some(_) => Err(invalid(&format!("field `{}` must be a string", key))),
                        None => Err(invalid(&format!("missing field `{}`", key))),
                    }
                };
                let from = party("from")?;
                let to = party("to")?;
                let amount = match fields.get("amount") {
                    Some(Value::Number(n)) => match n.as_u64() {
                        Some(amount) => amount,
                        None if n.as_i64().is_some() => {
                            return Err(invalid("amount must be non-negative").into())
                        }
                        None => return Err(invalid("amount must be an integer").into()),
                    },
                    Some(_) => return Err(invalid("field `amount` must be a number").into()),
                    None => return Err(invalid("missing field `amount`").into()),
                };
                Transaction::Transfer { from, to, amount }
            }
            _ => return Err(invalid("expected a number or a transfer object").into()),
        };

        tx.validate(index)?;
        Ok(tx)
    }

    /// Validate the record structure
    pub fn validate(&self, index: usize) -> Result<()> {
        if let Transaction::Transfer { from, to, .. } = self {
            if from.trim().is_empty() {
                return Err(ValidationError::InvalidTransaction {
                    index,
                    reason: "sender identity is empty".to_string(),
                }
                .into());
            }
            if to.trim().is_empty() {
                return Err(ValidationError::InvalidTransaction {
                    index,
                    reason: "receiver identity is empty".to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    pub fn is_transfer(&self) -> bool {
        matches!(self, Transaction::Transfer { .. })
    }
}

impl Hashable for Transaction {
    fn canonical_form(&self) -> String {
        match self {
            Transaction::SimpleValue(value) => value.to_string(),
            // Keys in sorted order
            Transaction::Transfer { from, to, amount } => json!({
                "amount": amount,
                "from": from,
                "to": to,
            })
            .to_string(),
        }
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transaction::SimpleValue(value) => write!(f, "{}", value),
            Transaction::Transfer { from, to, amount } => write!(f, "{} -> {}: {}", from, to, amount),
        }
    }
}

/// Validate a whole batch; the first bad record fails it
pub fn validate_batch(transactions: &[Transaction]) -> Result<()> {
    transactions
        .iter()
        .enumerate()
        .try_for_each(|(index, tx)| tx.validate(index))
}

/// Leaf digests of a batch, in presentation order
pub fn leaf_hashes(transactions: &[Transaction]) -> Vec<Digest> {
    transactions.iter().map(Hashable::leaf_hash).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::sha256_hex;
    use crate::error::LedgerError;

    fn reason_of(result: Result<Transaction>) -> String {
        match result {
            Err(LedgerError::Validation(ValidationError::InvalidTransaction { reason, .. })) => reason,
            other => panic!("expected InvalidTransaction, got {:?}", other),
        }
    }

    #[test]
    fn test_simple_value_canonical_form() {
        assert_eq!(Transaction::simple(4).canonical_form(), "4");
        assert_eq!(Transaction::simple(-12).canonical_form(), "-12");
        assert_eq!(Transaction::simple(4).leaf_hash(), sha256_hex("4"));
    }

    #[test]
    fn test_transfer_canonical_form_is_sorted() {
        let tx = Transaction::transfer("alice", "bob", 10);
        assert_eq!(tx.canonical_form(), r#"{"amount":10,"from":"alice","to":"bob"}"#);
        assert_eq!(
            tx.leaf_hash().as_str(),
            "0db4d974e3128ca9a80b7af67ea4c241a741392b77382a9848bc2a629c67d883"
        );
    }

    #[test]
    fn test_canonical_form_escapes_strings() {
        let tx = Transaction::transfer("a\"b", "c", 1);
        assert_eq!(tx.canonical_form(), r#"{"amount":1,"from":"a\"b","to":"c"}"#);
    }

    #[test]
    fn test_from_value_ignores_key_order_and_extras() {
        let reordered = json!({"to": "bob", "memo": "lunch", "amount": 10, "from": "alice"});
        let tx = Transaction::from_value(&reordered, 0).unwrap();
        assert_eq!(tx, Transaction::transfer("alice", "bob", 10));
        assert_eq!(tx.canonical_form(), r#"{"amount":10,"from":"alice","to":"bob"}"#);
    }

    #[test]
    fn test_from_value_simple() {
        assert_eq!(Transaction::from_value(&json!(99), 0).unwrap(), Transaction::simple(99));
        assert_eq!(
            reason_of(Transaction::from_value(&json!(1.5), 0)),
            "simple value must be an integer"
        );
    }

    #[test]
    fn test_from_value_rejects_malformed_transfers() {
        assert_eq!(
            reason_of(Transaction::from_value(&json!({"to": "bob", "amount": 1}), 0)),
            "missing field `from`"
        );
        assert_eq!(
            reason_of(Transaction::from_value(&json!({"from": "alice", "amount": 1}), 0)),
            "missing field `to`"
        );
        assert_eq!(
            reason_of(Transaction::from_value(&json!({"from": "alice", "to": "bob"}), 0)),
            "missing field `amount`"
        );
        assert_eq!(
            reason_of(Transaction::from_value(
                &json!({"from": "alice", "to": "bob", "amount": -5}),
                0
            )),
            "amount must be non-negative"
        );
        assert_eq!(
            reason_of(Transaction::from_value(
                &json!({"from": "", "to": "bob", "amount": 5}),
                0
            )),
            "sender identity is empty"
        );
        assert_eq!(
            reason_of(Transaction::from_value(&json!("hola"), 0)),
            "expected a number or a transfer object"
        );
    }

    #[test]
    fn test_invalid_transaction_reports_index() {
        let err = Transaction::from_value(&json!({"from": "a"}), 7).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::InvalidTransaction { index: 7, .. })
        ));
    }

    #[test]
    fn test_serde_shapes() {
        let batch = vec![Transaction::simple(4), Transaction::transfer("alice", "bob", 3)];
        let json = serde_json::to_string(&batch).unwrap();
        assert_eq!(json, r#"[4,{"from":"alice","to":"bob","amount":3}]"#);

        let back: Vec<Transaction> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, batch);
    }

    #[test]
    fn test_validate_batch() {
        let good = vec![Transaction::simple(1), Transaction::transfer("a", "b", 0)];
        assert!(validate_batch(&good).is_ok());

        let bad = vec![Transaction::simple(1), Transaction::transfer("a", " ", 2)];
        let err = validate_batch(&bad).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::InvalidTransaction { index: 1, .. })
        ));
    }

    #[test]
    fn test_leaf_hashes_keep_order() {
        let batch: Vec<Transaction> = [4, 1, 9, 0].into_iter().map(Transaction::simple).collect();
        let leaves = leaf_hashes(&batch);
        assert_eq!(leaves[0], sha256_hex("4"));
        assert_eq!(leaves[3], sha256_hex("0"));
    }
}
