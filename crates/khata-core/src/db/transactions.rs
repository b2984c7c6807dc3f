//! Transaction operations: batch import with dedup, listing, deletion

use std::collections::HashSet;

use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};
use tracing::debug;

use super::{parse_date, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewTransaction, Transaction, TransactionType};

// Keeps IN (...) clauses comfortably under SQLite's parameter limit
const SIGNATURE_CHUNK: usize = 500;

pub(crate) fn row_to_transaction(row: &Row) -> rusqlite::Result<Transaction> {
    let tx_type: String = row.get(8)?;
    Ok(Transaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        account_id: row.get(2)?,
        date: parse_date(&row.get::<_, String>(3)?),
        description: row.get(4)?,
        amount: row.get(5)?,
        category: row.get(6)?,
        merchant_name: row.get(7)?,
        tx_type: tx_type.parse().unwrap_or(TransactionType::Expense),
        signature: row.get(9)?,
        source: row.get(10)?,
        created_at: parse_datetime(&row.get::<_, String>(11)?),
    })
}

pub(crate) const TRANSACTION_COLUMNS: &str =
    "id, user_id, account_id, date, description, amount, category, merchant_name, tx_type, signature, source, created_at";

/// Outcome of the transactional section of a batch import
#[derive(Debug, Default)]
pub struct BatchInsertOutcome {
    pub inserted: Vec<Transaction>,
    pub skipped_duplicates: usize,
}

impl Database {
    /// Insert a batch of validated candidates, skipping rows whose signature
    /// already exists
    ///
    /// The existence check and the inserts run in one IMMEDIATE transaction
    /// so a concurrent import of the same statement cannot interleave between
    /// them.
    pub fn insert_transaction_batch(
        &self,
        user_id: i64,
        candidates: &[NewTransaction],
    ) -> Result<BatchInsertOutcome> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Collect signatures already present, chunked
        let mut existing: HashSet<String> = HashSet::new();
        for chunk in candidates.chunks(SIGNATURE_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT signature FROM transactions WHERE signature IN ({})",
                placeholders
            );
            let mut stmt = tx.prepare(&sql)?;
            let params_vec: Vec<&dyn rusqlite::ToSql> = chunk
                .iter()
                .map(|c| &c.signature as &dyn rusqlite::ToSql)
                .collect();
            let rows = stmt.query_map(params_vec.as_slice(), |row| row.get::<_, String>(0))?;
            for sig in rows {
                existing.insert(sig?);
            }
        }

        let mut outcome = BatchInsertOutcome::default();
        for candidate in candidates {
            if existing.contains(&candidate.signature) {
                outcome.skipped_duplicates += 1;
                continue;
            }

            tx.execute(
                r#"
                INSERT INTO transactions (user_id, account_id, date, description, amount, tx_type, signature)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
                params![
                    user_id,
                    candidate.account_id,
                    candidate.date.to_string(),
                    candidate.description,
                    candidate.amount,
                    candidate.tx_type.as_str(),
                    candidate.signature,
                ],
            )?;
            let id = tx.last_insert_rowid();

            let inserted = tx.query_row(
                &format!(
                    "SELECT {} FROM transactions WHERE id = ?",
                    TRANSACTION_COLUMNS
                ),
                params![id],
                row_to_transaction,
            )?;
            outcome.inserted.push(inserted);
        }

        tx.commit()?;

        debug!(
            inserted = outcome.inserted.len(),
            duplicates = outcome.skipped_duplicates,
            "Batch insert complete"
        );
        Ok(outcome)
    }

    /// List a user's transactions, newest first
    pub fn list_transactions(
        &self,
        user_id: i64,
        account_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;

        let transactions = if let Some(aid) = account_id {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM transactions WHERE user_id = ? AND account_id = ?
                 ORDER BY date DESC, id DESC LIMIT ? OFFSET ?",
                TRANSACTION_COLUMNS
            ))?;
            let rows = stmt
                .query_map(params![user_id, aid, limit, offset], row_to_transaction)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        } else {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM transactions WHERE user_id = ?
                 ORDER BY date DESC, id DESC LIMIT ? OFFSET ?",
                TRANSACTION_COLUMNS
            ))?;
            let rows = stmt
                .query_map(params![user_id, limit, offset], row_to_transaction)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        Ok(transactions)
    }

    pub fn get_transaction(&self, user_id: i64, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let transaction = conn
            .query_row(
                &format!(
                    "SELECT {} FROM transactions WHERE id = ? AND user_id = ?",
                    TRANSACTION_COLUMNS
                ),
                params![id, user_id],
                row_to_transaction,
            )
            .optional()?;
        Ok(transaction)
    }

    /// All of a user's transactions, oldest first (rule backfill input)
    pub fn all_transactions(&self, user_id: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE user_id = ? ORDER BY date, id",
            TRANSACTION_COLUMNS
        ))?;
        let transactions = stmt
            .query_map(params![user_id], row_to_transaction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(transactions)
    }

    /// A user's expenses, oldest first (recurring detection input)
    pub fn list_expenses(&self, user_id: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE user_id = ? AND tx_type = 'expense'
             ORDER BY date, id",
            TRANSACTION_COLUMNS
        ))?;
        let transactions = stmt
            .query_map(params![user_id], row_to_transaction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(transactions)
    }

    /// Transactions eligible as transfer legs: not typed transfer and not
    /// already linked
    pub fn list_unlinked_transactions(&self, user_id: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions t
             WHERE t.user_id = ?
               AND t.tx_type != 'transfer'
               AND NOT EXISTS (
                   SELECT 1 FROM transfers f
                   WHERE f.debit_transaction_id = t.id OR f.credit_transaction_id = t.id
               )
             ORDER BY t.date, t.id",
            TRANSACTION_COLUMNS
        ))?;
        let transactions = stmt
            .query_map(params![user_id], row_to_transaction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(transactions)
    }

    /// Set merchant (and optionally category) on one transaction
    pub fn set_transaction_merchant(
        &self,
        transaction_id: i64,
        merchant_name: &str,
        category: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn()?;
        if let Some(cat) = category {
            conn.execute(
                "UPDATE transactions SET merchant_name = ?, category = ? WHERE id = ?",
                params![merchant_name, cat, transaction_id],
            )?;
        } else {
            conn.execute(
                "UPDATE transactions SET merchant_name = ? WHERE id = ?",
                params![merchant_name, transaction_id],
            )?;
        }
        Ok(())
    }

    /// Delete a transaction, unwinding any transfer link first
    ///
    /// The counterpart leg of an unwound transfer gets its original type back
    /// (debit -> expense, credit -> income).
    pub fn delete_transaction(&self, user_id: i64, id: i64) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists: Option<i64> = tx
            .query_row(
                "SELECT id FROM transactions WHERE id = ? AND user_id = ?",
                params![id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(Error::NotFound(format!("Transaction {} not found", id)));
        }

        let link: Option<(i64, i64, i64)> = tx
            .query_row(
                "SELECT id, debit_transaction_id, credit_transaction_id FROM transfers
                 WHERE debit_transaction_id = ? OR credit_transaction_id = ?",
                params![id, id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        if let Some((transfer_id, debit_id, credit_id)) = link {
            tx.execute(
                "UPDATE transactions SET tx_type = 'expense' WHERE id = ?",
                params![debit_id],
            )?;
            tx.execute(
                "UPDATE transactions SET tx_type = 'income' WHERE id = ?",
                params![credit_id],
            )?;
            tx.execute("DELETE FROM transfers WHERE id = ?", params![transfer_id])?;
        }

        tx.execute(
            "DELETE FROM transactions WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;

        tx.commit()?;
        Ok(())
    }
}
