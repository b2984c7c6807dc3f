//! Merchant rule operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{MerchantRule, MerchantRuleUpdate, NewMerchantRule};

/// Default minimum token-set similarity for fuzzy rule matching
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.85;

fn row_to_rule(row: &Row) -> rusqlite::Result<(MerchantRule, String)> {
    let patterns_json: String = row.get(3)?;
    let rule = MerchantRule {
        id: row.get(0)?,
        user_id: row.get(1)?,
        normalized_name: row.get(2)?,
        patterns: Vec::new(),
        category: row.get(4)?,
        fuzzy_threshold: row.get(5)?,
        usage_count: row.get(6)?,
        created_at: parse_datetime(&row.get::<_, String>(7)?),
        updated_at: parse_datetime(&row.get::<_, String>(8)?),
    };
    Ok((rule, patterns_json))
}

// Pattern JSON decoding happens outside the rusqlite closure so bad stored
// data surfaces as Error::Json instead of a generic db error
fn finish_rule((mut rule, patterns_json): (MerchantRule, String)) -> Result<MerchantRule> {
    rule.patterns = serde_json::from_str(&patterns_json)?;
    Ok(rule)
}

const RULE_COLUMNS: &str =
    "id, user_id, normalized_name, patterns, category, fuzzy_threshold, usage_count, created_at, updated_at";

impl Database {
    /// Create a merchant rule
    ///
    /// The normalized name is unique per user, case-insensitive; a duplicate
    /// is a conflict.
    pub fn create_merchant_rule(&self, user_id: i64, new: &NewMerchantRule) -> Result<MerchantRule> {
        let name = new.normalized_name.trim();
        if name.is_empty() {
            return Err(Error::InvalidData("Merchant name cannot be empty".into()));
        }
        if let Some(t) = new.fuzzy_threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(Error::InvalidData(
                    "Fuzzy threshold must be between 0 and 1".into(),
                ));
            }
        }

        let conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM merchant_rules WHERE user_id = ? AND normalized_name = ?",
                params![user_id, name],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(Error::Conflict(format!(
                "Merchant rule '{}' already exists",
                name
            )));
        }

        let patterns_json = serde_json::to_string(&new.patterns)?;
        conn.execute(
            r#"
            INSERT INTO merchant_rules (user_id, normalized_name, patterns, category, fuzzy_threshold)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                name,
                patterns_json,
                new.category,
                new.fuzzy_threshold.unwrap_or(DEFAULT_FUZZY_THRESHOLD),
            ],
        )?;
        let id = conn.last_insert_rowid();

        let row = conn.query_row(
            &format!("SELECT {} FROM merchant_rules WHERE id = ?", RULE_COLUMNS),
            params![id],
            row_to_rule,
        )?;
        finish_rule(row)
    }

    /// List a user's merchant rules in deterministic match order (by id)
    pub fn list_merchant_rules(&self, user_id: i64) -> Result<Vec<MerchantRule>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM merchant_rules WHERE user_id = ? ORDER BY id",
            RULE_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![user_id], row_to_rule)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(finish_rule).collect()
    }

    pub fn get_merchant_rule(&self, user_id: i64, rule_id: i64) -> Result<Option<MerchantRule>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM merchant_rules WHERE id = ? AND user_id = ?",
                    RULE_COLUMNS
                ),
                params![rule_id, user_id],
                row_to_rule,
            )
            .optional()?;
        row.map(finish_rule).transpose()
    }

    /// Update a merchant rule; unset fields keep their current value
    pub fn update_merchant_rule(
        &self,
        user_id: i64,
        rule_id: i64,
        update: &MerchantRuleUpdate,
    ) -> Result<MerchantRule> {
        let current = self
            .get_merchant_rule(user_id, rule_id)?
            .ok_or_else(|| Error::NotFound(format!("Merchant rule {} not found", rule_id)))?;

        let conn = self.conn()?;

        if let Some(ref name) = update.normalized_name {
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::InvalidData("Merchant name cannot be empty".into()));
            }
            // Renaming onto another rule's name is a conflict
            let clash: Option<i64> = conn
                .query_row(
                    "SELECT id FROM merchant_rules WHERE user_id = ? AND normalized_name = ? AND id != ?",
                    params![user_id, name, rule_id],
                    |row| row.get(0),
                )
                .optional()?;
            if clash.is_some() {
                return Err(Error::Conflict(format!(
                    "Merchant rule '{}' already exists",
                    name
                )));
            }
        }
        if let Some(t) = update.fuzzy_threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(Error::InvalidData(
                    "Fuzzy threshold must be between 0 and 1".into(),
                ));
            }
        }

        let name = update
            .normalized_name
            .as_deref()
            .map(str::trim)
            .unwrap_or(&current.normalized_name);
        let patterns = update.patterns.as_ref().unwrap_or(&current.patterns);
        let patterns_json = serde_json::to_string(patterns)?;
        let category = update.category.as_deref().or(current.category.as_deref());
        let threshold = update.fuzzy_threshold.unwrap_or(current.fuzzy_threshold);

        conn.execute(
            r#"
            UPDATE merchant_rules
            SET normalized_name = ?, patterns = ?, category = ?, fuzzy_threshold = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND user_id = ?
            "#,
            params![name, patterns_json, category, threshold, rule_id, user_id],
        )?;

        let row = conn.query_row(
            &format!("SELECT {} FROM merchant_rules WHERE id = ?", RULE_COLUMNS),
            params![rule_id],
            row_to_rule,
        )?;
        finish_rule(row)
    }

    pub fn delete_merchant_rule(&self, user_id: i64, rule_id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM merchant_rules WHERE id = ? AND user_id = ?",
            params![rule_id, user_id],
        )?;
        if deleted == 0 {
            return Err(Error::NotFound(format!(
                "Merchant rule {} not found",
                rule_id
            )));
        }
        Ok(())
    }

    /// Bump a rule's usage counter after it maps transactions
    pub fn increment_rule_usage(&self, rule_id: i64, by: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE merchant_rules SET usage_count = usage_count + ?, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?",
            params![by, rule_id],
        )?;
        Ok(())
    }
}
