use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::{
    self, build_integrity_report, parse_type_filter, parse_user_id, required, running_balances,
    validate_reversal, Cents, IntegrityReport, LedgerEntry, NewTransaction, Transaction,
    TransactionDraft, TransactionId, User, UserDraft, UserId,
};
use crate::storage::{Repository, DEFAULT_BUSY_TIMEOUT};

use super::AppError;

/// Application service providing the wallet's use cases.
/// This is the primary interface for any client (CLI, HTTP API, tests).
///
/// Every operation opens its own store transaction, passes it explicitly to
/// the repository and commits it before returning. Any early return drops
/// the transaction, which rolls it back.
pub struct LedgerService {
    repo: Repository,
}

/// Result of a balance query
#[derive(Debug, Clone)]
pub struct BalanceResult {
    pub user_id: UserId,
    pub balance: Cents,
    pub computed_at: DateTime<Utc>,
}

/// Result of reversing a transaction
#[derive(Debug, Clone)]
pub struct ReversalResult {
    pub reversal: Transaction,
    pub original: Transaction,
    /// Owner's balance once the reversal is applied
    pub balance: Cents,
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a database at the given path, creating it if needed.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        Self::init_with(database_path, DEFAULT_BUSY_TIMEOUT).await
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        Self::connect_with(database_path, DEFAULT_BUSY_TIMEOUT).await
    }

    /// Like [`LedgerService::init`], waiting at most `busy_timeout` for
    /// writers in other processes.
    pub async fn init_with(database_path: &str, busy_timeout: Duration) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::init(&db_url, busy_timeout).await?;
        Ok(Self::new(repo))
    }

    /// Like [`LedgerService::connect`], waiting at most `busy_timeout` for
    /// writers in other processes.
    pub async fn connect_with(
        database_path: &str,
        busy_timeout: Duration,
    ) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url, false, busy_timeout).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // User operations
    // ========================

    /// Sign up a new user.
    pub async fn create_user(&self, draft: UserDraft) -> Result<User, AppError> {
        let user = draft.validate()?;

        let mut tx = self
            .repo
            .begin_write()
            .await
            .map_err(AppError::StoreWriteFailure)?;
        Repository::insert_user(tx.conn(), &user)
            .await
            .map_err(AppError::StoreWriteFailure)?;
        tx.commit().await.map_err(AppError::StoreWriteFailure)?;

        tracing::info!(user_id = %user.id, username = %user.username, "created user");
        Ok(user)
    }

    /// Get a user by identifier.
    pub async fn get_user(&self, user_id: &str) -> Result<User, AppError> {
        let id = resolve_user_id(user_id)?;
        let mut tx = self.repo.begin_read().await?;
        let user = Repository::get_user(&mut tx, id).await?;
        tx.commit().await.map_err(anyhow::Error::from)?;

        user.ok_or_else(|| AppError::UserNotFound(user_id.to_string()))
    }

    /// Change a user's status and bump its modification time.
    pub async fn update_user_status(
        &self,
        user_id: &str,
        status: Option<String>,
    ) -> Result<User, AppError> {
        let status = required(status, "status")?;
        let id = resolve_user_id(user_id)?;

        let mut tx = self
            .repo
            .begin_write()
            .await
            .map_err(AppError::StoreWriteFailure)?;
        let user = Repository::update_user_status(tx.conn(), id, status.trim(), domain::now())
            .await
            .map_err(AppError::StoreWriteFailure)?
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))?;
        tx.commit().await.map_err(AppError::StoreWriteFailure)?;

        tracing::info!(user_id = %user.id, status = %user.status, "updated user status");
        Ok(user)
    }

    // ========================
    // Ledger operations
    // ========================

    /// Record a transaction for an existing user.
    ///
    /// Fails with `MissingField` before touching the store when a field is
    /// absent, and with `UserNotFound` (nothing written) for an unknown user.
    /// An entry that would push the balance out of range is rolled back.
    pub async fn record_transaction(&self, draft: TransactionDraft) -> Result<Transaction, AppError> {
        let checked = draft.validate()?;
        let user_id = resolve_user_id(&checked.user_id)?;
        if !checked.transaction_type.is_known() {
            tracing::debug!(transaction_type = %checked.transaction_type, "recording custom transaction type");
        }

        let mut tx = self
            .repo
            .begin_write()
            .await
            .map_err(AppError::StoreWriteFailure)?;

        // Stamped under the write lock so creation order follows id order
        let new = NewTransaction::new(user_id, checked.amount_cents, checked.transaction_type);
        let transaction = Repository::append_transaction(tx.conn(), &new)
            .await
            .map_err(AppError::StoreWriteFailure)?
            .ok_or_else(|| AppError::UserNotFound(checked.user_id.clone()))?;
        Repository::sum_amounts(tx.conn(), user_id, None)
            .await?
            .ok_or_else(|| AppError::BalanceOverflow(checked.user_id.clone()))?;
        tx.commit().await.map_err(AppError::StoreWriteFailure)?;

        tracing::info!(
            transaction_id = transaction.id,
            user_id = %transaction.user_id,
            amount_cents = transaction.amount_cents,
            transaction_type = %transaction.transaction_type,
            "recorded transaction"
        );
        Ok(transaction)
    }

    /// Current balance of a user: the sum of all of its amounts.
    pub async fn get_balance(&self, user_id: &str) -> Result<BalanceResult, AppError> {
        let id = resolve_user_id(user_id)?;

        let mut tx = self.repo.begin_read().await?;
        if !Repository::user_exists(&mut tx, id).await? {
            return Err(AppError::UserNotFound(user_id.to_string()));
        }
        let balance = Repository::sum_amounts(&mut tx, id, None)
            .await?
            .ok_or_else(|| AppError::BalanceOverflow(user_id.to_string()))?;
        tx.commit().await.map_err(anyhow::Error::from)?;

        Ok(BalanceResult {
            user_id: id,
            balance,
            computed_at: domain::now(),
        })
    }

    /// List a user's transactions oldest first with running balances.
    ///
    /// `type_filter` of `None` or `"all"` lists everything. With a filter the
    /// running balance only sums the listed entries. An empty result is an
    /// error whether or not the user exists.
    pub async fn list_transactions(
        &self,
        user_id: &str,
        type_filter: Option<&str>,
    ) -> Result<Vec<LedgerEntry>, AppError> {
        let no_transactions = || AppError::NoTransactionsFound(user_id.to_string());
        let id = parse_user_id(user_id).ok_or_else(no_transactions)?;
        let filter = parse_type_filter(type_filter);

        let mut tx = self.repo.begin_read().await?;
        let transactions = Repository::list_ordered_by_creation(&mut tx, id, filter.as_ref()).await?;
        tx.commit().await.map_err(anyhow::Error::from)?;

        if transactions.is_empty() {
            return Err(no_transactions());
        }

        tracing::debug!(user_id = %id, count = transactions.len(), "listed transactions");
        running_balances(transactions).map_err(|e| {
            tracing::warn!(user_id = %id, transaction_id = e.transaction_id, "running balance out of range");
            AppError::BalanceOverflow(user_id.to_string())
        })
    }

    /// Reverse a transaction by appending a compensating entry.
    ///
    /// The original stays untouched; the new entry negates its amount, is
    /// typed `reversal` and links back through `reverses`.
    pub async fn reverse_transaction(
        &self,
        transaction_id: Option<&str>,
    ) -> Result<ReversalResult, AppError> {
        let raw_id = transaction_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(AppError::MissingIdentifier)?;
        let id: TransactionId = raw_id
            .parse()
            .map_err(|_| AppError::TransactionNotFound(raw_id.to_string()))?;

        let mut tx = self
            .repo
            .begin_write()
            .await
            .map_err(AppError::StoreWriteFailure)?;

        let original = Repository::find_transaction(tx.conn(), id)
            .await?
            .ok_or_else(|| AppError::TransactionNotFound(raw_id.to_string()))?;
        let existing = Repository::find_reversal_of(tx.conn(), id).await?;
        validate_reversal(&original, existing.as_ref())?;

        let reversal = Repository::append_transaction(tx.conn(), &original.reversal_entry())
            .await
            .map_err(AppError::StoreWriteFailure)?
            .ok_or_else(|| AppError::UserNotFound(original.user_id.to_string()))?;
        let balance = Repository::sum_amounts(tx.conn(), original.user_id, None)
            .await?
            .ok_or_else(|| AppError::BalanceOverflow(original.user_id.to_string()))?;
        tx.commit().await.map_err(AppError::StoreWriteFailure)?;

        tracing::info!(
            original_id = original.id,
            reversal_id = reversal.id,
            user_id = %original.user_id,
            "reversed transaction"
        );
        Ok(ReversalResult {
            reversal,
            original,
            balance,
        })
    }

    // ========================
    // Integrity operations
    // ========================

    /// Check ledger integrity and return a report.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, AppError> {
        let mut tx = self.repo.begin_read().await?;
        let stats = Repository::get_integrity_stats(&mut tx).await?;
        tx.commit().await.map_err(anyhow::Error::from)?;

        let report = build_integrity_report(&stats);
        if !report.is_healthy() {
            tracing::warn!(issues = report.issues.len(), "ledger integrity issues found");
        }
        Ok(report)
    }

    /// Number of transactions currently stored.
    pub async fn transaction_count(&self) -> Result<i64, AppError> {
        let mut tx = self.repo.begin_read().await?;
        let count = Repository::count_transactions(&mut tx).await?;
        tx.commit().await.map_err(anyhow::Error::from)?;
        Ok(count)
    }
}

/// A malformed identifier cannot name an existing user.
fn resolve_user_id(raw: &str) -> Result<UserId, AppError> {
    parse_user_id(raw).ok_or_else(|| AppError::UserNotFound(raw.to_string()))
}
