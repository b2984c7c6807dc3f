//! Self-transfer pairing
//!
//! Money moved between a user's own accounts shows up twice: a debit in one
//! account and a credit in another. Left alone, that inflates both expense
//! and income totals. The detector pairs opposite-sign transactions across
//! accounts within a date window and scores each pair; links are persisted
//! via `Database::create_transfer`, which retypes both legs.

use serde::Serialize;
use tracing::debug;

use crate::db::Database;
use crate::error::Result;
use crate::models::Transaction;

/// Default date window between the two legs, in days
pub const DEFAULT_DAYS_WINDOW: i64 = 2;

/// Default relative amount tolerance between the legs
pub const DEFAULT_AMOUNT_TOLERANCE: f64 = 0.01;

/// Description keywords that make a pair more likely to be a transfer
const TRANSFER_KEYWORDS: [&str; 6] = ["transfer", "trf", "neft", "imps", "rtgs", "upi"];

/// A scored candidate pair, not yet linked
#[derive(Debug, Clone, Serialize)]
pub struct TransferCandidate {
    pub debit: Transaction,
    pub credit: Transaction,
    /// Absolute amount of the debit leg
    pub amount: f64,
    pub date_diff_days: i64,
    pub confidence: f64,
}

fn has_transfer_keyword(description: &str) -> bool {
    let lower = description.to_lowercase();
    TRANSFER_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Score a candidate pair
///
/// Starts at 1.0, decays with date distance and amount mismatch, gets a
/// boost when either description mentions a transfer rail, capped at 1.0.
fn score_pair(debit: &Transaction, credit: &Transaction, date_diff: i64) -> f64 {
    let mut confidence: f64 = 1.0;

    confidence *= match date_diff {
        0 => 1.0,
        1 => 0.9,
        _ => 0.8,
    };

    let a = debit.amount.abs();
    let b = credit.amount.abs();
    let larger = a.max(b);
    if larger > 0.0 {
        confidence *= 1.0 - (a - b).abs() / larger;
    }

    if has_transfer_keyword(&debit.description) || has_transfer_keyword(&credit.description) {
        confidence *= 1.2;
    }

    confidence.min(1.0)
}

/// Pairs debit/credit legs across a user's accounts
pub struct TransferDetector<'a> {
    db: &'a Database,
}

impl<'a> TransferDetector<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Detect candidate pairs among unlinked transactions
    ///
    /// A pair needs opposite signs, different accounts, a date difference
    /// within `days_window`, and amounts within `amount_tolerance` of the
    /// debit. Results are sorted by confidence, best first.
    pub fn detect(
        &self,
        user_id: i64,
        days_window: i64,
        amount_tolerance: f64,
    ) -> Result<Vec<TransferCandidate>> {
        let transactions = self.db.list_unlinked_transactions(user_id)?;

        let debits: Vec<&Transaction> =
            transactions.iter().filter(|t| t.amount < 0.0).collect();
        let credits: Vec<&Transaction> =
            transactions.iter().filter(|t| t.amount > 0.0).collect();

        let mut candidates = Vec::new();
        for debit in &debits {
            for credit in &credits {
                if debit.account_id == credit.account_id {
                    continue;
                }

                let date_diff = (credit.date - debit.date).num_days().abs();
                if date_diff > days_window {
                    continue;
                }

                let amount_diff = (debit.amount.abs() - credit.amount.abs()).abs();
                if amount_diff > debit.amount.abs() * amount_tolerance {
                    continue;
                }

                candidates.push(TransferCandidate {
                    debit: (*debit).clone(),
                    credit: (*credit).clone(),
                    amount: debit.amount.abs(),
                    date_diff_days: date_diff,
                    confidence: score_pair(debit, credit, date_diff),
                });
            }
        }

        candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(count = candidates.len(), "Transfer detection complete");
        Ok(candidates)
    }
}
