// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use fiscus::application::LedgerService;
use fiscus::domain::{Account, Customer};
use fiscus::storage::Repository;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to create a bare repository with a temporary database, for tests
/// that exercise the storage layer directly
pub async fn test_repository() -> Result<(Repository, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let db_url = format!("sqlite:{}?mode=rwc", db_path.to_str().unwrap());
    let repo = Repository::init(&db_url).await?;
    Ok((repo, temp_dir))
}

/// Test fixture: standard customer and account setup
pub struct SampleBank;

impl SampleBank {
    /// Register the standard test customer.
    pub async fn customer(service: &LedgerService) -> Result<Customer> {
        let customer = service
            .register_customer(
                "Ada Lovelace".into(),
                "ada@example.com".into(),
                "555-0100".into(),
            )
            .await?;
        Ok(customer)
    }

    /// Register a customer and open one savings account with the given
    /// opening balance.
    pub async fn funded_account(
        service: &LedgerService,
        account_number: &str,
        balance: i64,
    ) -> Result<(Customer, Account)> {
        let customer = Self::customer(service).await?;
        let account = service
            .open_account(account_number.to_string(), customer.id, "savings", balance)
            .await?;
        Ok((customer, account))
    }
}
