use serde::{Deserialize, Serialize};

use super::{Cents, CustomerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Interest-bearing savings account
    Savings,
    /// Everyday current (checking) account
    Current,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Savings => "savings",
            AccountType::Current => "current",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "savings" => Some(AccountType::Savings),
            "current" => Some(AccountType::Current),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A bank account. The account number is the caller-supplied natural key;
/// the balance only ever changes through a deposit or withdrawal and never
/// goes negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_number: String,
    pub customer_id: CustomerId,
    pub account_type: AccountType,
    pub balance: Cents,
}

impl Account {
    pub fn new(
        account_number: String,
        customer_id: CustomerId,
        account_type: AccountType,
        balance: Cents,
    ) -> Self {
        Self {
            account_number,
            customer_id,
            account_type,
            balance,
        }
    }
}
