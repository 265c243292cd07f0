use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Cents;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Withdraw,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdraw => "withdraw",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "deposit" => Some(TransactionType::Deposit),
            "withdraw" => Some(TransactionType::Withdraw),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One applied balance movement. Transactions exist only as the byproduct of
/// a deposit or withdrawal, are immutable once written, and are never deleted
/// individually. Together they form the audit trail of every balance change
/// since the account was opened.
///
/// The id is assigned by the store and strictly increases in insertion order,
/// so it doubles as the ordering key for transaction history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub account_number: String,
    pub txn_type: TransactionType,
    /// Amount moved, always strictly positive; the direction is `txn_type`.
    pub amount: Cents,
    pub created_at: DateTime<Utc>,
}
