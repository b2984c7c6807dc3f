//! Duplicate-safe batch import
//!
//! Rows arrive already structured (date, amount, description, account); file
//! parsing lives upstream. Each row gets a dedup signature before insertion,
//! so re-importing a statement is a no-op, while genuinely repeated same-day
//! rows survive via occurrence indexes. Malformed rows skip themselves only.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::db::Database;
use crate::error::Result;
use crate::merchant::{MerchantMatcher, MerchantNormalizer};
use crate::models::{NewTransaction, Transaction, TransactionType};
use crate::signature::{transaction_signature, OccurrenceKey};

/// One statement row as supplied by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRow {
    /// `YYYY-MM-DD`, `DD/MM/YYYY`, or `DD-MM-YYYY`
    pub date: String,
    /// Signed amount: negative = money out
    pub amount: f64,
    pub description: String,
    pub account_id: i64,
}

/// What happened to a batch
#[derive(Debug, Default, Serialize)]
pub struct ImportSummary {
    pub inserted: Vec<Transaction>,
    pub skipped_duplicates: usize,
    pub skipped_invalid: usize,
}

fn parse_row_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    for format in ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }
    None
}

/// Imports row batches and enriches the inserted transactions with merchant
/// names
pub struct Importer<'a> {
    db: &'a Database,
    normalizer: MerchantNormalizer,
}

impl<'a> Importer<'a> {
    pub fn new(db: &'a Database) -> Result<Self> {
        Ok(Self {
            db,
            normalizer: MerchantNormalizer::new()?,
        })
    }

    /// Import a batch of rows for a user
    ///
    /// Validation is per-row: a bad date, non-finite amount, or unknown
    /// account skips that row and counts it, never the batch. Occurrence
    /// indexes are assigned within this batch in row order.
    pub fn import(&self, user_id: i64, rows: &[ImportRow]) -> Result<ImportSummary> {
        let accounts: HashSet<i64> = self
            .db
            .list_accounts(user_id)?
            .into_iter()
            .map(|a| a.id)
            .collect();

        let mut summary = ImportSummary::default();
        let mut occurrences: HashMap<OccurrenceKey, usize> = HashMap::new();
        let mut candidates = Vec::with_capacity(rows.len());

        for row in rows {
            let date = match parse_row_date(&row.date) {
                Some(d) => d,
                None => {
                    debug!(date = %row.date, "Skipping row with unparseable date");
                    summary.skipped_invalid += 1;
                    continue;
                }
            };
            if !row.amount.is_finite() {
                debug!(description = %row.description, "Skipping row with non-finite amount");
                summary.skipped_invalid += 1;
                continue;
            }
            if !accounts.contains(&row.account_id) {
                debug!(account_id = row.account_id, "Skipping row for unknown account");
                summary.skipped_invalid += 1;
                continue;
            }

            let key = OccurrenceKey::new(date, row.amount, &row.description, row.account_id);
            let index = occurrences.entry(key).or_insert(0);
            let signature =
                transaction_signature(date, row.amount, &row.description, row.account_id, *index);
            *index += 1;

            candidates.push(NewTransaction {
                account_id: row.account_id,
                date,
                description: row.description.clone(),
                amount: row.amount,
                tx_type: TransactionType::from_amount(row.amount),
                signature,
            });
        }

        let outcome = self.db.insert_transaction_batch(user_id, &candidates)?;
        summary.skipped_duplicates = outcome.skipped_duplicates;
        summary.inserted = outcome.inserted;

        self.enrich_merchants(user_id, &mut summary.inserted)?;

        info!(
            inserted = summary.inserted.len(),
            duplicates = summary.skipped_duplicates,
            invalid = summary.skipped_invalid,
            "Import complete"
        );
        Ok(summary)
    }

    /// Fill in merchant names: rules first, heuristic normalizer for the rest
    fn enrich_merchants(&self, user_id: i64, transactions: &mut [Transaction]) -> Result<()> {
        let matcher = MerchantMatcher::new(self.db);

        for tx in transactions.iter_mut() {
            match matcher.find_match(user_id, &tx.description)? {
                Some(m) => {
                    let category = if tx.category.is_none() {
                        m.rule.category.as_deref()
                    } else {
                        None
                    };
                    self.db
                        .set_transaction_merchant(tx.id, &m.rule.normalized_name, category)?;
                    self.db.increment_rule_usage(m.rule.id, 1)?;
                    tx.merchant_name = Some(m.rule.normalized_name.clone());
                    if let Some(cat) = category {
                        tx.category = Some(cat.to_string());
                    }
                }
                None => {
                    let name = self.normalizer.normalize(&tx.description);
                    self.db.set_transaction_merchant(tx.id, &name, None)?;
                    tx.merchant_name = Some(name);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Database, i64) {
        let db = Database::in_memory().unwrap();
        let account = db.create_account(1, "HDFC Savings", Some("HDFC")).unwrap();
        (db, account.id)
    }

    fn row(date: &str, amount: f64, description: &str, account_id: i64) -> ImportRow {
        ImportRow {
            date: date.to_string(),
            amount,
            description: description.to_string(),
            account_id,
        }
    }

    #[test]
    fn test_reimport_is_noop() {
        let (db, account) = setup();
        let importer = Importer::new(&db).unwrap();
        let rows = vec![
            row("2024-03-01", -120.50, "UPI/SWIGGY/12345", account),
            row("2024-03-02", -899.00, "AMZN MKTP IN", account),
        ];

        let first = importer.import(1, &rows).unwrap();
        assert_eq!(first.inserted.len(), 2);
        assert_eq!(first.skipped_duplicates, 0);

        let second = importer.import(1, &rows).unwrap();
        assert_eq!(second.inserted.len(), 0);
        assert_eq!(second.skipped_duplicates, 2);
    }

    #[test]
    fn test_repeated_same_day_rows_all_insert() {
        let (db, account) = setup();
        let importer = Importer::new(&db).unwrap();
        let rows = vec![
            row("2024-03-01", -45.0, "UPI/COFFEE DAY", account),
            row("2024-03-01", -45.0, "UPI/COFFEE DAY", account),
            row("2024-03-01", -45.0, "UPI/COFFEE DAY", account),
        ];

        let summary = importer.import(1, &rows).unwrap();
        assert_eq!(summary.inserted.len(), 3);

        // And the triple is still dedup-stable on re-import
        let again = importer.import(1, &rows).unwrap();
        assert_eq!(again.inserted.len(), 0);
        assert_eq!(again.skipped_duplicates, 3);
    }

    #[test]
    fn test_malformed_row_skips_itself_only() {
        let (db, account) = setup();
        let importer = Importer::new(&db).unwrap();
        let rows = vec![
            row("not-a-date", -10.0, "BAD DATE", account),
            row("2024-03-01", f64::NAN, "BAD AMOUNT", account),
            row("2024-03-01", -10.0, "GOOD ROW", account),
            row("2024-03-01", -10.0, "WRONG ACCOUNT", 9999),
        ];

        let summary = importer.import(1, &rows).unwrap();
        assert_eq!(summary.inserted.len(), 1);
        assert_eq!(summary.skipped_invalid, 3);
        assert_eq!(summary.inserted[0].description, "GOOD ROW");
    }

    #[test]
    fn test_tx_type_follows_sign() {
        let (db, account) = setup();
        let importer = Importer::new(&db).unwrap();
        let rows = vec![
            row("2024-03-01", -500.0, "POS/GROCERY", account),
            row("2024-03-05", 55000.0, "NEFT/SALARY MARCH", account),
        ];

        let summary = importer.import(1, &rows).unwrap();
        let expense = summary
            .inserted
            .iter()
            .find(|t| t.amount < 0.0)
            .unwrap();
        let income = summary
            .inserted
            .iter()
            .find(|t| t.amount > 0.0)
            .unwrap();
        assert_eq!(expense.tx_type, TransactionType::Expense);
        assert_eq!(income.tx_type, TransactionType::Income);
    }

    #[test]
    fn test_alternate_date_formats() {
        let (db, account) = setup();
        let importer = Importer::new(&db).unwrap();
        let rows = vec![
            row("01/03/2024", -10.0, "SLASH FORMAT", account),
            row("02-03-2024", -10.0, "DASH FORMAT", account),
        ];

        let summary = importer.import(1, &rows).unwrap();
        assert_eq!(summary.inserted.len(), 2);
        assert_eq!(
            summary.inserted[0].date,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn test_import_enriches_with_rules_and_normalizer() {
        use crate::models::NewMerchantRule;
        let (db, account) = setup();
        db.create_merchant_rule(
            1,
            &NewMerchantRule {
                normalized_name: "Amazon".to_string(),
                patterns: vec!["AMZN*".to_string()],
                category: Some("Shopping".to_string()),
                fuzzy_threshold: None,
            },
        )
        .unwrap();

        let importer = Importer::new(&db).unwrap();
        let rows = vec![
            row("2024-03-01", -899.0, "AMZN MKTP IN", account),
            row("2024-03-02", -120.0, "UPI/SWIGGY/9876", account),
        ];
        let summary = importer.import(1, &rows).unwrap();

        let amazon = &summary.inserted[0];
        assert_eq!(amazon.merchant_name.as_deref(), Some("Amazon"));
        assert_eq!(amazon.category.as_deref(), Some("Shopping"));

        let swiggy = &summary.inserted[1];
        assert_eq!(swiggy.merchant_name.as_deref(), Some("Swiggy"));
    }
}
