//! Transfer link operations

use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};
use tracing::debug;

use super::transactions::{row_to_transaction, TRANSACTION_COLUMNS};
use super::{parse_date, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Transfer;

fn row_to_transfer(row: &Row) -> rusqlite::Result<Transfer> {
    Ok(Transfer {
        id: row.get(0)?,
        user_id: row.get(1)?,
        debit_transaction_id: row.get(2)?,
        credit_transaction_id: row.get(3)?,
        amount: row.get(4)?,
        transfer_date: parse_date(&row.get::<_, String>(5)?),
        confidence_score: row.get(6)?,
        is_confirmed: row.get(7)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

const TRANSFER_COLUMNS: &str = "id, user_id, debit_transaction_id, credit_transaction_id, \
     amount, transfer_date, confidence_score, is_confirmed, created_at";

fn fetch_leg(
    tx: &rusqlite::Transaction<'_>,
    user_id: i64,
    id: i64,
) -> Result<crate::models::Transaction> {
    tx.query_row(
        &format!(
            "SELECT {} FROM transactions WHERE id = ? AND user_id = ?",
            TRANSACTION_COLUMNS
        ),
        params![id, user_id],
        row_to_transaction,
    )
    .optional()?
    .ok_or_else(|| Error::NotFound(format!("Transaction {} not found", id)))
}

impl Database {
    /// Link two transactions as one self-transfer
    ///
    /// Both legs must belong to the user, the debit must be negative and the
    /// credit positive, and neither may already be linked. Both legs are
    /// retyped to `transfer`, all within one IMMEDIATE transaction.
    pub fn create_transfer(
        &self,
        user_id: i64,
        debit_transaction_id: i64,
        credit_transaction_id: i64,
        confidence_score: Option<f64>,
        is_confirmed: bool,
    ) -> Result<Transfer> {
        if debit_transaction_id == credit_transaction_id {
            return Err(Error::InvalidData(
                "A transfer needs two distinct transactions".into(),
            ));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let debit = fetch_leg(&tx, user_id, debit_transaction_id)?;
        let credit = fetch_leg(&tx, user_id, credit_transaction_id)?;

        if debit.amount >= 0.0 {
            return Err(Error::InvalidData(format!(
                "Transaction {} is not a debit",
                debit_transaction_id
            )));
        }
        if credit.amount <= 0.0 {
            return Err(Error::InvalidData(format!(
                "Transaction {} is not a credit",
                credit_transaction_id
            )));
        }

        for id in [debit_transaction_id, credit_transaction_id] {
            let linked: Option<i64> = tx
                .query_row(
                    "SELECT id FROM transfers
                     WHERE debit_transaction_id = ? OR credit_transaction_id = ?",
                    params![id, id],
                    |row| row.get(0),
                )
                .optional()?;
            if linked.is_some() {
                return Err(Error::Conflict(format!(
                    "Transaction {} is already part of a transfer",
                    id
                )));
            }
        }

        tx.execute(
            r#"
            INSERT INTO transfers (user_id, debit_transaction_id, credit_transaction_id,
                                   amount, transfer_date, confidence_score, is_confirmed)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                debit_transaction_id,
                credit_transaction_id,
                debit.amount.abs(),
                debit.date.to_string(),
                confidence_score,
                is_confirmed,
            ],
        )?;
        let id = tx.last_insert_rowid();

        tx.execute(
            "UPDATE transactions SET tx_type = 'transfer' WHERE id IN (?, ?)",
            params![debit_transaction_id, credit_transaction_id],
        )?;

        let transfer = tx.query_row(
            &format!("SELECT {} FROM transfers WHERE id = ?", TRANSFER_COLUMNS),
            params![id],
            row_to_transfer,
        )?;

        tx.commit()?;

        debug!(
            transfer_id = transfer.id,
            debit = debit_transaction_id,
            credit = credit_transaction_id,
            "Transfer linked"
        );
        Ok(transfer)
    }

    /// Unlink a transfer, restoring the legs to expense/income
    pub fn delete_transfer(&self, user_id: i64, transfer_id: i64) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let transfer = tx
            .query_row(
                &format!(
                    "SELECT {} FROM transfers WHERE id = ? AND user_id = ?",
                    TRANSFER_COLUMNS
                ),
                params![transfer_id, user_id],
                row_to_transfer,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Transfer {} not found", transfer_id)))?;

        tx.execute(
            "UPDATE transactions SET tx_type = 'expense' WHERE id = ?",
            params![transfer.debit_transaction_id],
        )?;
        tx.execute(
            "UPDATE transactions SET tx_type = 'income' WHERE id = ?",
            params![transfer.credit_transaction_id],
        )?;
        tx.execute("DELETE FROM transfers WHERE id = ?", params![transfer_id])?;

        tx.commit()?;
        Ok(())
    }

    pub fn list_transfers(&self, user_id: i64) -> Result<Vec<Transfer>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transfers WHERE user_id = ? ORDER BY transfer_date DESC, id DESC",
            TRANSFER_COLUMNS
        ))?;
        let transfers = stmt
            .query_map(params![user_id], row_to_transfer)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(transfers)
    }

    pub fn get_transfer(&self, user_id: i64, transfer_id: i64) -> Result<Option<Transfer>> {
        let conn = self.conn()?;
        let transfer = conn
            .query_row(
                &format!(
                    "SELECT {} FROM transfers WHERE id = ? AND user_id = ?",
                    TRANSFER_COLUMNS
                ),
                params![transfer_id, user_id],
                row_to_transfer,
            )
            .optional()?;
        Ok(transfer)
    }
}
