//! User and account operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Account, User};

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        created_at: parse_datetime(&row.get::<_, String>(2)?),
    })
}

fn row_to_account(row: &Row) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        bank_name: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

impl Database {
    /// Get or create a user by email
    pub fn ensure_user(&self, email: &str) -> Result<User> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT OR IGNORE INTO users (email) VALUES (?)",
            params![email],
        )?;

        let user = conn.query_row(
            "SELECT id, email, created_at FROM users WHERE email = ?",
            params![email],
            row_to_user,
        )?;
        Ok(user)
    }

    pub fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, email, created_at FROM users WHERE id = ?",
                params![user_id],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Create a bank account for a user
    pub fn create_account(
        &self,
        user_id: i64,
        name: &str,
        bank_name: Option<&str>,
    ) -> Result<Account> {
        if name.trim().is_empty() {
            return Err(Error::InvalidData("Account name cannot be empty".into()));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO accounts (user_id, name, bank_name) VALUES (?, ?, ?)",
            params![user_id, name.trim(), bank_name],
        )?;
        let id = conn.last_insert_rowid();

        let account = conn.query_row(
            "SELECT id, user_id, name, bank_name, created_at FROM accounts WHERE id = ?",
            params![id],
            row_to_account,
        )?;
        Ok(account)
    }

    /// List a user's accounts, oldest first
    pub fn list_accounts(&self, user_id: i64) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, name, bank_name, created_at FROM accounts
             WHERE user_id = ? ORDER BY id",
        )?;
        let accounts = stmt
            .query_map(params![user_id], row_to_account)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(accounts)
    }

    pub fn get_account(&self, user_id: i64, account_id: i64) -> Result<Option<Account>> {
        let conn = self.conn()?;
        let account = conn
            .query_row(
                "SELECT id, user_id, name, bank_name, created_at FROM accounts
                 WHERE id = ? AND user_id = ?",
                params![account_id, user_id],
                row_to_account,
            )
            .optional()?;
        Ok(account)
    }
}
