//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `accounts` - Users and bank accounts
//! - `transactions` - Transaction CRUD and batch import
//! - `merchants` - Merchant mapping rules
//! - `recurring` - Persisted recurring payment rules
//! - `transfers` - Self-transfer links

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;

use crate::error::Result;

mod accounts;
mod merchants;
mod recurring;
mod transactions;
mod transfers;


pub use transactions::BatchInsertOutcome;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Parse a stored "YYYY-MM-DD" date column
pub(crate) fn parse_date(s: &str) -> chrono::NaiveDate {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_default()
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Create a new database connection pool
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because every
    /// pooled connection to `:memory:` would open its own private database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = format!("/tmp/khata_test_{}_{}.db", std::process::id(), id);

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- WAL mode: better concurrency, readers don't block writers
            PRAGMA journal_mode = WAL;

            -- Synchronous NORMAL: good balance of safety and performance
            PRAGMA synchronous = NORMAL;

            PRAGMA temp_store = MEMORY;

            -- Users (ownership scope for everything below)
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Bank accounts
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                name TEXT NOT NULL,
                bank_name TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_accounts_user ON accounts(user_id);

            -- Imported transactions
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                account_id INTEGER NOT NULL REFERENCES accounts(id),
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                amount REAL NOT NULL,
                category TEXT,
                merchant_name TEXT,
                tx_type TEXT NOT NULL DEFAULT 'expense',
                signature TEXT NOT NULL UNIQUE,
                source TEXT NOT NULL DEFAULT 'import',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_user_date ON transactions(user_id, date);
            CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions(account_id);
            CREATE INDEX IF NOT EXISTS idx_transactions_merchant ON transactions(user_id, merchant_name);

            -- Merchant mapping rules; patterns stored as a JSON array
            CREATE TABLE IF NOT EXISTS merchant_rules (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                normalized_name TEXT NOT NULL COLLATE NOCASE,
                patterns TEXT NOT NULL DEFAULT '[]',
                category TEXT,
                fuzzy_threshold REAL NOT NULL DEFAULT 0.85,
                usage_count INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(user_id, normalized_name)
            );

            -- Recurring payment state, one row per (user, merchant)
            CREATE TABLE IF NOT EXISTS recurring_rules (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                merchant_name TEXT NOT NULL COLLATE NOCASE,
                expected_amount REAL NOT NULL,
                amount_min REAL NOT NULL,
                amount_max REAL NOT NULL,
                is_variable_amount INTEGER NOT NULL DEFAULT 0,
                interval TEXT NOT NULL,
                avg_interval_days REAL NOT NULL,
                status TEXT NOT NULL DEFAULT 'suggested',
                confidence REAL NOT NULL,
                last_seen_date TEXT NOT NULL,
                next_expected_date TEXT NOT NULL,
                transaction_count INTEGER NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(user_id, merchant_name)
            );

            -- Self-transfer links; each transaction can be in at most one
            CREATE TABLE IF NOT EXISTS transfers (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                debit_transaction_id INTEGER NOT NULL UNIQUE REFERENCES transactions(id),
                credit_transaction_id INTEGER NOT NULL UNIQUE REFERENCES transactions(id),
                amount REAL NOT NULL,
                transfer_date TEXT NOT NULL,
                confidence_score REAL,
                is_confirmed INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_transfers_user ON transfers(user_id);

            -- Default local user so single-user setups work out of the box
            INSERT OR IGNORE INTO users (id, email) VALUES (1, 'local@khata');
            "#,
        )?;

        Ok(())
    }
}
