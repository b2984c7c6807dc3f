//! Dedup signatures for imported transactions
//!
//! A signature is a SHA-256 hash over the fields that identify a statement
//! row: date, amount, description, account, plus an occurrence index that
//! separates genuinely repeated same-day rows (three identical coffees are
//! three transactions, not one). Re-importing the same statement reproduces
//! the same signatures, so duplicates are dropped at the unique index.

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

/// Generate the dedup signature for one statement row
///
/// `index` is the 0-based occurrence number of this row within its
/// (date, amount, description, account) group in the import batch.
pub fn transaction_signature(
    date: NaiveDate,
    amount: f64,
    description: &str,
    account_id: i64,
    index: usize,
) -> String {
    let key = format!(
        "{}_{:.2}_{}_{}_{}",
        date,
        amount,
        description.trim().to_lowercase(),
        account_id,
        index
    );

    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Grouping key for assigning occurrence indexes within a batch
///
/// Amount is held in cents so float formatting quirks cannot split a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OccurrenceKey {
    pub date: NaiveDate,
    pub amount_cents: i64,
    pub description: String,
    pub account_id: i64,
}

impl OccurrenceKey {
    pub fn new(date: NaiveDate, amount: f64, description: &str, account_id: i64) -> Self {
        Self {
            date,
            amount_cents: (amount * 100.0).round() as i64,
            description: description.trim().to_lowercase(),
            account_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_signature_deterministic() {
        let a = transaction_signature(date("2024-03-01"), -120.50, "UPI/SWIGGY/12345", 1, 0);
        let b = transaction_signature(date("2024-03-01"), -120.50, "UPI/SWIGGY/12345", 1, 0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_signature_normalizes_description() {
        let a = transaction_signature(date("2024-03-01"), -120.50, "  UPI/Swiggy  ", 1, 0);
        let b = transaction_signature(date("2024-03-01"), -120.50, "upi/swiggy", 1, 0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_index_separates_repeated_rows() {
        let a = transaction_signature(date("2024-03-01"), -45.0, "COFFEE", 1, 0);
        let b = transaction_signature(date("2024-03-01"), -45.0, "COFFEE", 1, 1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_different_accounts_differ() {
        let a = transaction_signature(date("2024-03-01"), -45.0, "COFFEE", 1, 0);
        let b = transaction_signature(date("2024-03-01"), -45.0, "COFFEE", 2, 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_occurrence_key_groups_by_cents() {
        let a = OccurrenceKey::new(date("2024-03-01"), -45.004, "coffee", 1);
        let b = OccurrenceKey::new(date("2024-03-01"), -45.0, "Coffee ", 1);
        assert_eq!(a, b);
    }
}
