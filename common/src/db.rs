use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

use crate::schema::{
    NewTransaction, Transaction, TransactionStatus, TransactionType, User, Wallet,
};

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str, acquire_timeout: Duration) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Failed to create SQLite connect options")?
            .create_if_missing(true)
            .busy_timeout(acquire_timeout);
        let pool = SqlitePoolOptions::new()
            .acquire_timeout(acquire_timeout)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to `{}`", database_url))?;
        Self::migrated(pool).await
    }

    /// Single-connection in-memory database. Each connection to
    /// `sqlite::memory:` is its own database, so the pool must never open a
    /// second one or recycle the first.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("Failed to create SQLite connect options")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory database")?;
        Self::migrated(pool).await
    }

    async fn migrated(pool: SqlitePool) -> anyhow::Result<Self> {
        sqlx::migrate!()
            .run(&pool)
            .await
            .context("Database migration error")?;
        Ok(Self { pool })
    }

    /// Opens a write transaction. `BEGIN IMMEDIATE` takes the SQLite writer
    /// lock up front, so a second writer waits on the busy timeout instead of
    /// failing to upgrade a read snapshot it already holds.
    pub async fn begin(&self) -> Result<sqlx::Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin_with("BEGIN IMMEDIATE").await
    }

    // --- USERS ---

    pub async fn save_user(&self, user: &User) -> anyhow::Result<User> {
        let saved = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, role)
            VALUES (?, ?, ?, ?)
            RETURNING *;
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await
        .context("Failed to save user to database")?;
        log::debug!("Saved user {} with id {}", saved.username, saved.id);
        Ok(saved)
    }

    pub async fn get_user(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_user_by_id(&self, user_id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    // --- WALLETS ---

    pub async fn get_wallet(&self, user_id: i64) -> Result<Option<Wallet>, sqlx::Error> {
        sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Adds `amount` to the balance, creating the wallet if the user has none.
    pub async fn credit_wallet(
        conn: &mut SqliteConnection,
        user_id: i64,
        amount: i64,
    ) -> Result<Wallet, sqlx::Error> {
        let wallet = sqlx::query_as::<_, Wallet>(
            r#"
            INSERT INTO wallets (user_id, balance) VALUES (?, ?)
            ON CONFLICT(user_id) DO UPDATE
            SET balance = balance + excluded.balance,
                updated_at = CURRENT_TIMESTAMP
            RETURNING *;
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .fetch_one(conn)
        .await?;
        log::debug!(
            "Credited {} to wallet of user {}, balance now {}",
            amount,
            user_id,
            wallet.balance
        );
        Ok(wallet)
    }

    /// Subtracts `amount` only when the balance covers it. `None` means the
    /// wallet is missing or short.
    pub async fn debit_wallet(
        conn: &mut SqliteConnection,
        user_id: i64,
        amount: i64,
    ) -> Result<Option<Wallet>, sqlx::Error> {
        let wallet = sqlx::query_as::<_, Wallet>(
            r#"
            UPDATE wallets
            SET balance = balance - ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE user_id = ? AND balance >= ?
            RETURNING *;
            "#,
        )
        .bind(amount)
        .bind(user_id)
        .bind(amount)
        .fetch_optional(conn)
        .await?;
        Ok(wallet)
    }

    // --- TRANSACTIONS ---

    pub async fn insert_transaction(
        conn: &mut SqliteConnection,
        new: &NewTransaction,
    ) -> Result<Transaction, sqlx::Error> {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (
                user_id, type, amount, status, method, description,
                ticket_id, bank_account_id, payment_ref
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *;
            "#,
        )
        .bind(new.user_id)
        .bind(new.kind)
        .bind(new.amount)
        .bind(TransactionStatus::Pending)
        .bind(&new.method)
        .bind(&new.description)
        .bind(new.ticket_id)
        .bind(new.bank_account_id)
        .bind(&new.payment_ref)
        .fetch_one(conn)
        .await?;
        log::debug!("Saved transaction to database: {:?}", transaction);
        Ok(transaction)
    }

    pub async fn get_transaction(
        conn: &mut SqliteConnection,
        transaction_id: i64,
    ) -> Result<Option<Transaction>, sqlx::Error> {
        sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = ?")
            .bind(transaction_id)
            .fetch_optional(conn)
            .await
    }

    /// Moves a pending transaction to `status`. Returns `None` when the row is
    /// no longer pending, so two writers can never both finalize it.
    pub async fn finalize_transaction(
        conn: &mut SqliteConnection,
        transaction_id: i64,
        status: TransactionStatus,
        admin_note: Option<&str>,
        error_message: Option<&str>,
        completed_at: Option<chrono::NaiveDateTime>,
    ) -> Result<Option<Transaction>, sqlx::Error> {
        sqlx::query_as::<_, Transaction>(
            r#"
            UPDATE transactions
            SET status = ?,
                admin_note = ?,
                error_message = ?,
                completed_at = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND status = 'pending'
            RETURNING *;
            "#,
        )
        .bind(status)
        .bind(admin_note)
        .bind(error_message)
        .bind(completed_at)
        .bind(transaction_id)
        .fetch_optional(conn)
        .await
    }

    pub async fn get_transactions_by_user(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<Transaction>, sqlx::Error> {
        sqlx::query_as::<_, Transaction>(
            r#"
            SELECT * FROM transactions
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Full history of a user, oldest first.
    pub async fn get_all_transactions_by_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<Transaction>, sqlx::Error> {
        sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions WHERE user_id = ? ORDER BY id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get_transactions_filtered(
        &self,
        status: Option<TransactionStatus>,
        kind: Option<TransactionType>,
        limit: i64,
    ) -> Result<Vec<Transaction>, sqlx::Error> {
        sqlx::query_as::<_, Transaction>(
            r#"
            SELECT * FROM transactions
            WHERE (?1 IS NULL OR status = ?1)
              AND (?2 IS NULL OR type = ?2)
            ORDER BY created_at DESC, id DESC
            LIMIT ?3
            "#,
        )
        .bind(status)
        .bind(kind)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}
