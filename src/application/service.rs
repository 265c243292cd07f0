use tracing::info;

use crate::domain::{
    Account, AccountType, Cents, Customer, CustomerId, Transaction, TransactionType,
    is_valid_email,
};
use crate::storage::{BalanceWrite, Repository, StoreError};

use super::LedgerError;

/// Application service providing high-level operations for the ledger.
/// This is the primary interface for any client (API gateway, CLI, etc.).
pub struct LedgerService {
    repo: Repository,
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, LedgerError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, LedgerError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Customer operations
    // ========================

    /// Register a new customer. Email uniqueness is decided by the store
    /// while inserting, never by a racy pre-check.
    pub async fn register_customer(
        &self,
        name: String,
        email: String,
        phone: String,
    ) -> Result<Customer, LedgerError> {
        // Validate inputs
        if name.trim().is_empty() {
            return Err(LedgerError::InvalidName);
        }
        if !is_valid_email(&email) {
            return Err(LedgerError::InvalidEmail(email));
        }

        let customer = Customer::new(name, email, phone);
        match self.repo.insert_customer(&customer).await {
            Ok(()) => {
                info!(customer_id = %customer.id, "customer registered");
                Ok(customer)
            }
            Err(StoreError::DuplicateKey(_)) => Err(LedgerError::EmailTaken(customer.email)),
            Err(e) => Err(e.into()),
        }
    }

    /// Get a customer by ID.
    pub async fn get_customer(&self, id: CustomerId) -> Result<Customer, LedgerError> {
        self.repo
            .get_customer(id)
            .await?
            .ok_or_else(|| LedgerError::CustomerNotFound(id.to_string()))
    }

    /// Delete a customer. The customer's accounts and their transactions go
    /// with it in the same atomic scope.
    pub async fn delete_customer(&self, id: CustomerId) -> Result<(), LedgerError> {
        if self.repo.delete_customer(id).await? {
            info!(customer_id = %id, "customer deleted");
            Ok(())
        } else {
            Err(LedgerError::CustomerNotFound(id.to_string()))
        }
    }

    // ========================
    // Account operations
    // ========================

    /// Open a new account for a customer with an opening balance. The
    /// customer must exist; the store's foreign key decides that while
    /// inserting.
    pub async fn open_account(
        &self,
        account_number: String,
        customer_id: CustomerId,
        account_type: &str,
        initial_balance: Cents,
    ) -> Result<Account, LedgerError> {
        let account_type = AccountType::from_str(account_type)
            .ok_or_else(|| LedgerError::InvalidAccountType(account_type.to_string()))?;
        if initial_balance < 0 {
            return Err(LedgerError::InvalidBalance(initial_balance));
        }

        let account = Account::new(account_number, customer_id, account_type, initial_balance);
        match self.repo.insert_account(&account).await {
            Ok(()) => {
                info!(
                    account_number = %account.account_number,
                    customer_id = %customer_id,
                    "account opened"
                );
                Ok(account)
            }
            Err(StoreError::DuplicateKey(_)) => {
                Err(LedgerError::AccountNumberTaken(account.account_number))
            }
            Err(StoreError::MissingParent(_)) => {
                Err(LedgerError::CustomerNotFound(customer_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get an account by account number.
    pub async fn get_account(&self, account_number: &str) -> Result<Account, LedgerError> {
        self.repo
            .get_account(account_number)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_number.to_string()))
    }

    /// List all accounts owned by a customer.
    pub async fn list_accounts(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Account>, LedgerError> {
        // An unknown customer is an error, not an empty list.
        self.get_customer(customer_id).await?;
        Ok(self.repo.list_accounts(customer_id).await?)
    }

    // ========================
    // Balance operations
    // ========================

    /// Deposit money into an account. Returns the updated account.
    pub async fn deposit(
        &self,
        account_number: &str,
        amount: Cents,
    ) -> Result<Account, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        self.apply_balance_change(account_number, TransactionType::Deposit, amount)
            .await
    }

    /// Withdraw money from an account. Returns the updated account.
    pub async fn withdraw(
        &self,
        account_number: &str,
        amount: Cents,
    ) -> Result<Account, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        self.apply_balance_change(account_number, TransactionType::Withdraw, amount)
            .await
    }

    /// List an account's transactions, newest first.
    pub async fn list_transactions(
        &self,
        account_number: &str,
    ) -> Result<Vec<Transaction>, LedgerError> {
        self.get_account(account_number).await?;
        Ok(self.repo.list_transactions(account_number).await?)
    }

    /// Shared by deposit and withdraw. The store applies the delta and the
    /// balance guard inside one guarded UPDATE, so the check and the write
    /// cannot be separated by a concurrent writer.
    async fn apply_balance_change(
        &self,
        account_number: &str,
        txn_type: TransactionType,
        amount: Cents,
    ) -> Result<Account, LedgerError> {
        let outcome = self
            .repo
            .update_balance_and_append_transaction(account_number, txn_type, amount)
            .await?;

        match outcome {
            BalanceWrite::Applied(account, txn) => {
                info!(
                    account_number = %account.account_number,
                    txn_id = txn.id,
                    txn_type = %txn.txn_type,
                    amount,
                    balance = account.balance,
                    "balance updated"
                );
                Ok(account)
            }
            BalanceWrite::MissingAccount => {
                Err(LedgerError::AccountNotFound(account_number.to_string()))
            }
            BalanceWrite::Rejected { balance } => match txn_type {
                TransactionType::Withdraw => Err(LedgerError::InsufficientBalance {
                    account_number: account_number.to_string(),
                    balance,
                    requested: amount,
                }),
                TransactionType::Deposit => Err(LedgerError::BalanceOverflow {
                    account_number: account_number.to_string(),
                    balance,
                    amount,
                }),
            },
        }
    }
}
