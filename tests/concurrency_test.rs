mod common;

use std::sync::Arc;

use anyhow::Result;
use common::{SampleBank, test_service};
use fiscus::application::LedgerError;
use fiscus::domain::TransactionType;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_deposits_all_land() -> Result<()> {
    let (service, _temp) = test_service().await?;
    SampleBank::funded_account(&service, "ACC001", 0).await?;
    let service = Arc::new(service);

    // Thirty-two writers pile onto one account. Every deposit must land,
    // however the commits interleave.
    let mut handles = Vec::new();
    for _ in 0..32 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(
            async move { service.deposit("ACC001", 100).await },
        ));
    }
    for handle in handles {
        handle.await??;
    }

    let account = service.get_account("ACC001").await?;
    assert_eq!(account.balance, 3_200);

    let history = service.list_transactions("ACC001").await?;
    assert_eq!(history.len(), 32);
    assert!(
        history
            .iter()
            .all(|txn| matches!(txn.txn_type, TransactionType::Deposit) && txn.amount == 100)
    );

    Ok(())
}

#[tokio::test]
async fn test_mixed_concurrent_traffic_conserves_total() -> Result<()> {
    let (service, _temp) = test_service().await?;
    SampleBank::funded_account(&service, "ACC001", 1_000).await?;
    let service = Arc::new(service);

    // Four deposits and four withdrawals of the same amount. The starting
    // balance covers every interleaving of the withdrawals, so all eight
    // must land.
    let mut handles = Vec::new();
    for i in 0..8 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                service.deposit("ACC001", 50).await
            } else {
                service.withdraw("ACC001", 50).await
            }
        }));
    }
    for handle in handles {
        handle.await??;
    }

    let account = service.get_account("ACC001").await?;
    assert_eq!(account.balance, 1_000);

    let history = service.list_transactions("ACC001").await?;
    assert_eq!(history.len(), 8);

    // Replay agrees with the stored balance
    let replayed: i64 = history.iter().fold(1_000, |acc, txn| match txn.txn_type {
        TransactionType::Deposit => acc + txn.amount,
        TransactionType::Withdraw => acc - txn.amount,
    });
    assert_eq!(account.balance, replayed);

    Ok(())
}

#[tokio::test]
async fn test_racing_withdrawals_only_one_wins() -> Result<()> {
    let (service, _temp) = test_service().await?;
    SampleBank::funded_account(&service, "ACC001", 100).await?;
    let service = Arc::new(service);

    // Five withdrawals race for a balance that funds exactly one of them.
    let mut handles = Vec::new();
    for _ in 0..5 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service.withdraw("ACC001", 100).await
        }));
    }

    let mut won = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await? {
            Ok(account) => {
                assert_eq!(account.balance, 0);
                won += 1;
            }
            Err(LedgerError::InsufficientBalance { .. }) => insufficient += 1,
            Err(other) => return Err(other.into()),
        }
    }
    assert_eq!(won, 1);
    assert_eq!(insufficient, 4);

    // The balance never went negative and only one movement was recorded
    let account = service.get_account("ACC001").await?;
    assert_eq!(account.balance, 0);

    let history = service.list_transactions("ACC001").await?;
    assert_eq!(history.len(), 1);
    assert!(matches!(history[0].txn_type, TransactionType::Withdraw));

    Ok(())
}
