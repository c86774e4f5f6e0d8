use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::domain::{
    Cents, IntegrityStats, NewTransaction, Transaction, TransactionId, TransactionType, User,
    UserId,
};

use super::MIGRATION_001_INITIAL;

const TRANSACTION_COLUMNS: &str =
    "id, user_id, amount_cents, transaction_type, reverses, created_at, modified_at";

const USER_COLUMNS: &str =
    "id, firstname, lastname, username, email, status, created_at, modified_at";

/// Read-side store transaction. Dropping it without committing rolls back.
pub type ReadTx = sqlx::Transaction<'static, Sqlite>;

/// How long a writer waits for another process's write lock by default.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Write-side store transaction.
///
/// Opened with `BEGIN IMMEDIATE`, so the database write lock is taken up
/// front and writers in other processes queue on the busy timeout. Within
/// one process the write gate is held for the whole lifetime as well.
/// Dropping it without `commit` rolls the transaction back and then
/// releases the gate.
pub struct WriteTx {
    tx: sqlx::Transaction<'static, Sqlite>,
    _gate: OwnedMutexGuard<()>,
}

impl WriteTx {
    /// Connection handle to pass to the store functions.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    pub async fn commit(self) -> Result<()> {
        self.tx
            .commit()
            .await
            .context("Failed to commit store transaction")
    }
}

/// Repository for persisting and querying users and transactions.
///
/// Query functions take an explicit connection so that every use case runs
/// inside the transaction it opened with [`Repository::begin_read`] or
/// [`Repository::begin_write`].
pub struct Repository {
    pool: SqlitePool,
    write_gate: Arc<Mutex<()>>,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Connect to a SQLite database.
    /// With `create`, the database file is created if it doesn't exist.
    pub async fn connect(database_url: &str, create: bool, busy_timeout: Duration) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .create_if_missing(create)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(busy_timeout)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect, creating the file, + migrate).
    pub async fn init(database_url: &str, busy_timeout: Duration) -> Result<Self> {
        let repo = Self::connect(database_url, true, busy_timeout).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Open a transaction for reads that must see one consistent snapshot.
    pub async fn begin_read(&self) -> Result<ReadTx> {
        self.pool
            .begin()
            .await
            .context("Failed to begin read transaction")
    }

    /// Open a write transaction, waiting for any other writer to finish.
    pub async fn begin_write(&self) -> Result<WriteTx> {
        let gate = Arc::clone(&self.write_gate).lock_owned().await;
        let tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .context("Failed to begin write transaction")?;
        Ok(WriteTx { tx, _gate: gate })
    }

    // ========================
    // User operations
    // ========================

    /// Save a new user.
    pub async fn insert_user(conn: &mut SqliteConnection, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, firstname, lastname, username, email, status, created_at, modified_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.status)
        .bind(encode_timestamp(user.created_at))
        .bind(encode_timestamp(user.modified_at))
        .execute(conn)
        .await
        .context("Failed to save user")?;
        Ok(())
    }

    /// Get a user by ID.
    pub async fn get_user(conn: &mut SqliteConnection, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(conn)
            .await
            .context("Failed to fetch user")?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    /// Check whether a user exists.
    pub async fn user_exists(conn: &mut SqliteConnection, id: UserId) -> Result<bool> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM users WHERE id = ?) AS present")
            .bind(id.to_string())
            .fetch_one(conn)
            .await
            .context("Failed to check user existence")?;

        Ok(row.get::<i64, _>("present") != 0)
    }

    /// Set a user's status. Returns the updated user, or `None` when no
    /// such user exists.
    pub async fn update_user_status(
        conn: &mut SqliteConnection,
        id: UserId,
        status: &str,
        modified_at: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "UPDATE users SET status = ?, modified_at = ? WHERE id = ? RETURNING {USER_COLUMNS}"
        ))
        .bind(status)
        .bind(encode_timestamp(modified_at))
        .bind(id.to_string())
        .fetch_optional(conn)
        .await
        .context("Failed to update user status")?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    fn row_to_user(row: &SqliteRow) -> Result<User> {
        let id_str: String = row.get("id");

        Ok(User {
            id: Uuid::parse_str(&id_str).context("Invalid user ID")?,
            firstname: row.get("firstname"),
            lastname: row.get("lastname"),
            username: row.get("username"),
            email: row.get("email"),
            status: row.get("status"),
            created_at: decode_timestamp(row.get("created_at"))
                .context("Invalid created_at timestamp")?,
            modified_at: decode_timestamp(row.get("modified_at"))
                .context("Invalid modified_at timestamp")?,
        })
    }

    // ========================
    // Transaction operations
    // ========================

    /// Append a transaction, assigning the next identifier.
    ///
    /// The owner check and the insert are one statement: `None` means the
    /// user does not exist and nothing was written.
    pub async fn append_transaction(
        conn: &mut SqliteConnection,
        new: &NewTransaction,
    ) -> Result<Option<Transaction>> {
        let created_at = encode_timestamp(new.created_at);

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO transactions (user_id, amount_cents, transaction_type, reverses, created_at, modified_at)
            SELECT ?, ?, ?, ?, ?, ?
            WHERE EXISTS (SELECT 1 FROM users WHERE id = ?)
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(new.user_id.to_string())
        .bind(new.amount_cents)
        .bind(new.transaction_type.as_str())
        .bind(new.reverses)
        .bind(&created_at)
        .bind(&created_at)
        .bind(new.user_id.to_string())
        .fetch_optional(conn)
        .await
        .context("Failed to save transaction")?;

        row.as_ref().map(Self::row_to_transaction).transpose()
    }

    /// Get a transaction by ID.
    pub async fn find_transaction(
        conn: &mut SqliteConnection,
        id: TransactionId,
    ) -> Result<Option<Transaction>> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await
        .context("Failed to fetch transaction")?;

        row.as_ref().map(Self::row_to_transaction).transpose()
    }

    /// Get the entry that reverses a given transaction, if any.
    pub async fn find_reversal_of(
        conn: &mut SqliteConnection,
        id: TransactionId,
    ) -> Result<Option<Transaction>> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE reverses = ?"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await
        .context("Failed to fetch reversal")?;

        row.as_ref().map(Self::row_to_transaction).transpose()
    }

    /// Sum a user's amounts, optionally for one transaction type only.
    /// A user without transactions sums to zero; `None` means the sum does
    /// not fit in [`Cents`].
    pub async fn sum_amounts(
        conn: &mut SqliteConnection,
        user_id: UserId,
        filter: Option<&TransactionType>,
    ) -> Result<Option<Cents>> {
        // Summed in two halves: SQLite's SUM fails on any intermediate
        // overflow, whatever order it visits the rows in
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(amount_cents / 1000000000), 0) AS high,
                COALESCE(SUM(amount_cents % 1000000000), 0) AS low
            FROM transactions
            WHERE user_id = ? AND (? IS NULL OR transaction_type = ?)
            "#,
        )
        .bind(user_id.to_string())
        .bind(filter.map(TransactionType::as_str))
        .bind(filter.map(TransactionType::as_str))
        .fetch_one(conn)
        .await
        .context("Failed to compute balance")?;

        let high: i64 = row.get("high");
        let low: i64 = row.get("low");
        let total = i128::from(high) * 1_000_000_000 + i128::from(low);
        Ok(Cents::try_from(total).ok())
    }

    /// List a user's transactions oldest first, ties broken by identifier.
    pub async fn list_ordered_by_creation(
        conn: &mut SqliteConnection,
        user_id: UserId,
        filter: Option<&TransactionType>,
    ) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM transactions
            WHERE user_id = ? AND (? IS NULL OR transaction_type = ?)
            ORDER BY created_at, id
            "#
        ))
        .bind(user_id.to_string())
        .bind(filter.map(TransactionType::as_str))
        .bind(filter.map(TransactionType::as_str))
        .fetch_all(conn)
        .await
        .context("Failed to list transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// Count every stored transaction.
    pub async fn count_transactions(conn: &mut SqliteConnection) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM transactions")
            .fetch_one(conn)
            .await
            .context("Failed to count transactions")?;

        Ok(row.get("count"))
    }

    /// Gather statistics for integrity checking.
    pub async fn get_integrity_stats(conn: &mut SqliteConnection) -> Result<IntegrityStats> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS user_count,
                (SELECT COUNT(*) FROM transactions) AS transaction_count,
                (SELECT COUNT(*) FROM transactions t
                    WHERE NOT EXISTS (SELECT 1 FROM users u WHERE u.id = t.user_id)
                ) AS orphaned,
                (SELECT COUNT(*) FROM transactions r
                    WHERE r.reverses IS NOT NULL
                      AND NOT EXISTS (SELECT 1 FROM transactions o WHERE o.id = r.reverses)
                ) AS dangling,
                (SELECT COUNT(*) FROM transactions r
                    JOIN transactions o ON o.id = r.reverses
                    WHERE r.amount_cents != -o.amount_cents OR r.user_id != o.user_id
                ) AS mismatched
            "#,
        )
        .fetch_one(conn)
        .await
        .context("Failed to gather integrity statistics")?;

        Ok(IntegrityStats {
            user_count: row.get("user_count"),
            transaction_count: row.get("transaction_count"),
            orphaned_transactions: row.get("orphaned"),
            dangling_reversals: row.get("dangling"),
            mismatched_reversals: row.get("mismatched"),
        })
    }

    fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
        let user_id_str: String = row.get("user_id");
        let transaction_type: String = row.get("transaction_type");

        Ok(Transaction {
            id: row.get("id"),
            user_id: Uuid::parse_str(&user_id_str).context("Invalid user ID")?,
            amount_cents: row.get("amount_cents"),
            transaction_type: TransactionType::new(transaction_type),
            reverses: row.get("reverses"),
            created_at: decode_timestamp(row.get("created_at"))
                .context("Invalid created_at timestamp")?,
            modified_at: decode_timestamp(row.get("modified_at"))
                .context("Invalid modified_at timestamp")?,
        })
    }
}

/// Timestamps are stored as fixed-width RFC 3339 text so that ordering by
/// the column is chronological.
fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(raw: String) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(&raw)?.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_timestamp_encoding_sorts_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2024, 4, 1, 12, 0, 0).unwrap();
        let later = earlier + chrono::Duration::microseconds(1500);

        let (a, b) = (encode_timestamp(earlier), encode_timestamp(later));
        assert_eq!(a, "2024-04-01T12:00:00.000000Z");
        assert!(a < b);
        assert_eq!(decode_timestamp(b).unwrap(), later);
    }
}
