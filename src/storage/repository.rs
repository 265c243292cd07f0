use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    Account, AccountType, Cents, Customer, CustomerId, Transaction, TransactionType,
};

use super::MIGRATION_001_INITIAL;

/// Errors surfaced by the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("Duplicate key on {0}")]
    DuplicateKey(&'static str),
    /// A foreign-key constraint rejected the write.
    #[error("No matching row in {0}")]
    MissingParent(&'static str),
    /// A stored value could not be decoded into its domain type.
    #[error("Malformed stored value: {0}")]
    Decode(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Outcome of the atomic balance-update-and-append write.
#[derive(Debug)]
pub enum BalanceWrite {
    /// Balance updated and transaction appended in one commit.
    Applied(Account, Transaction),
    /// No account row with the given number. Nothing was written.
    MissingAccount,
    /// The balance guard refused the change (withdrawal past the balance,
    /// or deposit past `Cents::MAX`). Carries the balance read in the same
    /// transaction. Nothing was written.
    Rejected { balance: Cents },
}

/// Repository for persisting and querying customers, accounts, and
/// transactions.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    /// Creates the database file if it doesn't exist.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(MIGRATION_001_INITIAL).execute(&self.pool).await?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self, StoreError> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Customer operations
    // ========================

    /// Insert a new customer. Email uniqueness lives in the schema; a
    /// constraint rejection comes back as `DuplicateKey`.
    pub async fn insert_customer(&self, customer: &Customer) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, name, email, phone)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(customer.id.to_string())
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::constraint_error(e, "customers.email", "customers"))?;
        Ok(())
    }

    /// Get a customer by ID.
    pub async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, phone
            FROM customers
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::row_to_customer(&row)?)),
            None => Ok(None),
        }
    }

    /// Delete a customer by ID. The schema cascades the delete to the
    /// customer's accounts and their transactions within the same statement.
    /// Returns whether a row was deleted.
    pub async fn delete_customer(&self, id: CustomerId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM customers WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ========================
    // Account operations
    // ========================

    /// Insert a new account with its opening balance.
    pub async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (account_number, customer_id, account_type, balance)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&account.account_number)
        .bind(account.customer_id.to_string())
        .bind(account.account_type.as_str())
        .bind(account.balance)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::constraint_error(e, "accounts.account_number", "customers"))?;
        Ok(())
    }

    /// Get an account by account number.
    pub async fn get_account(&self, account_number: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT account_number, customer_id, account_type, balance
            FROM accounts
            WHERE account_number = ?
            "#,
        )
        .bind(account_number)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    /// List all accounts owned by a customer, ordered by account number.
    pub async fn list_accounts(&self, customer_id: CustomerId) -> Result<Vec<Account>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT account_number, customer_id, account_type, balance
            FROM accounts
            WHERE customer_id = ?
            ORDER BY account_number
            "#,
        )
        .bind(customer_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_account).collect()
    }

    // ========================
    // Transaction operations
    // ========================

    /// Atomically apply a balance change and append the transaction that
    /// explains it. The balance arithmetic runs inside the UPDATE statement,
    /// guarded so a withdrawal cannot take the balance below zero and a
    /// deposit cannot push it past `Cents::MAX`; concurrent writers
    /// serialize on the database write lock. Zero affected rows means the
    /// guard refused the change or the account does not exist; a read in
    /// the same transaction tells the two apart. Both writes commit
    /// together or not at all.
    pub async fn update_balance_and_append_transaction(
        &self,
        account_number: &str,
        txn_type: TransactionType,
        amount: Cents,
    ) -> Result<BalanceWrite, StoreError> {
        let mut tx = self.pool.begin().await?;

        let update = match txn_type {
            TransactionType::Deposit => {
                // The deposit must leave the balance representable.
                let headroom = Cents::MAX.saturating_sub(amount);
                sqlx::query(
                    r#"
                    UPDATE accounts
                    SET balance = balance + ?
                    WHERE account_number = ? AND balance <= ?
                    "#,
                )
                .bind(amount)
                .bind(account_number)
                .bind(headroom)
            }
            TransactionType::Withdraw => sqlx::query(
                r#"
                UPDATE accounts
                SET balance = balance - ?
                WHERE account_number = ? AND balance >= ?
                "#,
            )
            .bind(amount)
            .bind(account_number)
            .bind(amount),
        };
        let updated = update.execute(&mut *tx).await?.rows_affected();

        if updated == 0 {
            // Guard refused, or the account is gone. Nothing was written.
            let row = sqlx::query("SELECT balance FROM accounts WHERE account_number = ?")
                .bind(account_number)
                .fetch_optional(&mut *tx)
                .await?;
            tx.rollback().await?;
            return Ok(match row {
                Some(row) => BalanceWrite::Rejected {
                    balance: row.get("balance"),
                },
                None => BalanceWrite::MissingAccount,
            });
        }

        let created_at = Utc::now();
        let txn_id: i64 = sqlx::query(
            r#"
            INSERT INTO transactions (account_number, txn_type, amount, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(account_number)
        .bind(txn_type.as_str())
        .bind(amount)
        .bind(created_at.to_rfc3339())
        .fetch_one(&mut *tx)
        .await?
        .get("id");

        let row = sqlx::query(
            r#"
            SELECT account_number, customer_id, account_type, balance
            FROM accounts
            WHERE account_number = ?
            "#,
        )
        .bind(account_number)
        .fetch_one(&mut *tx)
        .await?;
        let account = Self::row_to_account(&row)?;

        tx.commit().await?;

        Ok(BalanceWrite::Applied(
            account,
            Transaction {
                id: txn_id,
                account_number: account_number.to_string(),
                txn_type,
                amount,
                created_at,
            },
        ))
    }

    /// List all transactions recorded against an account, newest first.
    pub async fn list_transactions(
        &self,
        account_number: &str,
    ) -> Result<Vec<Transaction>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, account_number, txn_type, amount, created_at
            FROM transactions
            WHERE account_number = ?
            ORDER BY id DESC
            "#,
        )
        .bind(account_number)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    // ========================
    // Error mapping and row decoding
    // ========================

    fn constraint_error(
        err: sqlx::Error,
        unique_key: &'static str,
        parent_table: &'static str,
    ) -> StoreError {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return StoreError::DuplicateKey(unique_key);
            }
            if db.is_foreign_key_violation() {
                return StoreError::MissingParent(parent_table);
            }
        }
        StoreError::Database(err)
    }

    fn row_to_customer(row: &sqlx::sqlite::SqliteRow) -> Result<Customer, StoreError> {
        let id_str: String = row.get("id");

        Ok(Customer {
            id: Uuid::parse_str(&id_str)
                .map_err(|_| StoreError::Decode(format!("invalid customer id: {}", id_str)))?,
            name: row.get("name"),
            email: row.get("email"),
            phone: row.get("phone"),
        })
    }

    fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account, StoreError> {
        let customer_id_str: String = row.get("customer_id");
        let account_type_str: String = row.get("account_type");

        Ok(Account {
            account_number: row.get("account_number"),
            customer_id: Uuid::parse_str(&customer_id_str).map_err(|_| {
                StoreError::Decode(format!("invalid customer id: {}", customer_id_str))
            })?,
            account_type: AccountType::from_str(&account_type_str).ok_or_else(|| {
                StoreError::Decode(format!("invalid account type: {}", account_type_str))
            })?,
            balance: row.get("balance"),
        })
    }

    fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<Transaction, StoreError> {
        let txn_type_str: String = row.get("txn_type");
        let created_at_str: String = row.get("created_at");

        Ok(Transaction {
            id: row.get("id"),
            account_number: row.get("account_number"),
            txn_type: TransactionType::from_str(&txn_type_str).ok_or_else(|| {
                StoreError::Decode(format!("invalid transaction type: {}", txn_type_str))
            })?,
            amount: row.get("amount"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .map_err(|_| {
                    StoreError::Decode(format!("invalid created_at: {}", created_at_str))
                })?
                .with_timezone(&Utc),
        })
    }
}
