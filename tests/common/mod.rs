// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use tempfile::TempDir;
use walletbook::application::LedgerService;
use walletbook::domain::{Transaction, TransactionDraft, User, UserDraft};

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let service = LedgerService::init(&db_path(&temp_dir)).await?;
    Ok((service, temp_dir))
}

/// Path of the database file created by [`test_service`].
pub fn db_path(temp_dir: &TempDir) -> String {
    temp_dir.path().join("test.db").to_str().unwrap().to_string()
}

/// Sign up a user with plausible details derived from `username`.
pub async fn create_user(service: &LedgerService, username: &str) -> Result<User> {
    let user = service
        .create_user(UserDraft {
            firstname: Some("Ada".into()),
            lastname: Some("Lovelace".into()),
            username: Some(username.into()),
            email: Some(format!("{}@example.com", username)),
        })
        .await?;
    Ok(user)
}

/// Record a transaction for `user`, amount in cents.
pub async fn record(
    service: &LedgerService,
    user: &User,
    amount_cents: i64,
    transaction_type: &str,
) -> Result<Transaction> {
    let tx = service
        .record_transaction(TransactionDraft::new(
            user.id.to_string(),
            amount_cents,
            transaction_type,
        ))
        .await?;
    Ok(tx)
}

/// The scenario used across tests: +100 deposit, -30 withdrawal, +50 deposit.
pub async fn record_standard_history(service: &LedgerService, user: &User) -> Result<()> {
    record(service, user, 10000, "deposit").await?;
    record(service, user, -3000, "withdrawal").await?;
    record(service, user, 5000, "deposit").await?;
    Ok(())
}
