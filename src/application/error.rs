use thiserror::Error;

use crate::domain::Cents;
use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Email already registered: {0}")]
    EmailTaken(String),

    #[error("Account number already in use: {0}")]
    AccountNumberTaken(String),

    #[error("Customer name must not be empty")]
    InvalidName,

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Unknown account type: {0}")]
    InvalidAccountType(String),

    #[error("Opening balance must not be negative: {0}")]
    InvalidBalance(Cents),

    #[error("Amount must be positive: {0}")]
    InvalidAmount(Cents),

    #[error("Insufficient balance in account {account_number}: balance {balance}, requested {requested}")]
    InsufficientBalance {
        account_number: String,
        balance: Cents,
        requested: Cents,
    },

    #[error("Balance overflow in account {account_number}: balance {balance}, deposit {amount}")]
    BalanceOverflow {
        account_number: String,
        balance: Cents,
        amount: Cents,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}
