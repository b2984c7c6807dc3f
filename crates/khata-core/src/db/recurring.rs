//! Recurring rule persistence
//!
//! Detection itself is pure (see `crate::recurring`); this module stores the
//! per-merchant lifecycle state: confirmed rules, dismissed merchants, and
//! the numbers captured at confirm/dismiss time.

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_date, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{RecurringInterval, RecurringRule, RecurringRuleUpsert, RecurringStatus};

fn row_to_rule(row: &Row) -> rusqlite::Result<RecurringRule> {
    let interval: String = row.get(7)?;
    let status: String = row.get(9)?;
    Ok(RecurringRule {
        id: row.get(0)?,
        user_id: row.get(1)?,
        merchant_name: row.get(2)?,
        expected_amount: row.get(3)?,
        amount_min: row.get(4)?,
        amount_max: row.get(5)?,
        is_variable_amount: row.get(6)?,
        interval: interval.parse().unwrap_or(RecurringInterval::Monthly),
        avg_interval_days: row.get(8)?,
        status: status.parse().unwrap_or(RecurringStatus::Suggested),
        confidence: row.get(10)?,
        last_seen_date: parse_date(&row.get::<_, String>(11)?),
        next_expected_date: parse_date(&row.get::<_, String>(12)?),
        transaction_count: row.get(13)?,
        created_at: parse_datetime(&row.get::<_, String>(14)?),
        updated_at: parse_datetime(&row.get::<_, String>(15)?),
    })
}

const RULE_COLUMNS: &str = "id, user_id, merchant_name, expected_amount, amount_min, amount_max, \
     is_variable_amount, interval, avg_interval_days, status, confidence, last_seen_date, \
     next_expected_date, transaction_count, created_at, updated_at";

impl Database {
    /// Create or refresh the rule for a merchant
    ///
    /// The (user, merchant) pair is unique case-insensitively; an upsert on
    /// an existing merchant overwrites the detection numbers and status.
    pub fn upsert_recurring_rule(
        &self,
        user_id: i64,
        state: &RecurringRuleUpsert,
    ) -> Result<RecurringRule> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO recurring_rules (
                user_id, merchant_name, expected_amount, amount_min, amount_max,
                is_variable_amount, interval, avg_interval_days, status, confidence,
                last_seen_date, next_expected_date, transaction_count
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, merchant_name) DO UPDATE SET
                expected_amount = excluded.expected_amount,
                amount_min = excluded.amount_min,
                amount_max = excluded.amount_max,
                is_variable_amount = excluded.is_variable_amount,
                interval = excluded.interval,
                avg_interval_days = excluded.avg_interval_days,
                status = excluded.status,
                confidence = excluded.confidence,
                last_seen_date = excluded.last_seen_date,
                next_expected_date = excluded.next_expected_date,
                transaction_count = excluded.transaction_count,
                updated_at = CURRENT_TIMESTAMP
            "#,
            params![
                user_id,
                state.merchant_name,
                state.expected_amount,
                state.amount_min,
                state.amount_max,
                state.is_variable_amount,
                state.interval.as_str(),
                state.avg_interval_days,
                state.status.as_str(),
                state.confidence,
                state.last_seen_date.to_string(),
                state.next_expected_date.to_string(),
                state.transaction_count,
            ],
        )?;

        let rule = conn.query_row(
            &format!(
                "SELECT {} FROM recurring_rules WHERE user_id = ? AND merchant_name = ?",
                RULE_COLUMNS
            ),
            params![user_id, state.merchant_name],
            row_to_rule,
        )?;
        Ok(rule)
    }

    pub fn list_recurring_rules(&self, user_id: i64) -> Result<Vec<RecurringRule>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM recurring_rules WHERE user_id = ? ORDER BY merchant_name",
            RULE_COLUMNS
        ))?;
        let rules = stmt
            .query_map(params![user_id], row_to_rule)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rules)
    }

    pub fn get_recurring_rule_by_merchant(
        &self,
        user_id: i64,
        merchant_name: &str,
    ) -> Result<Option<RecurringRule>> {
        let conn = self.conn()?;
        let rule = conn
            .query_row(
                &format!(
                    "SELECT {} FROM recurring_rules WHERE user_id = ? AND merchant_name = ?",
                    RULE_COLUMNS
                ),
                params![user_id, merchant_name],
                row_to_rule,
            )
            .optional()?;
        Ok(rule)
    }

    /// Delete a recurring rule, clearing confirmed/dismissed state so the
    /// merchant can be suggested again
    pub fn delete_recurring_rule(&self, user_id: i64, rule_id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM recurring_rules WHERE id = ? AND user_id = ?",
            params![rule_id, user_id],
        )?;
        if deleted == 0 {
            return Err(Error::NotFound(format!(
                "Recurring rule {} not found",
                rule_id
            )));
        }
        Ok(())
    }
}
