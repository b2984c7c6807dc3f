//! Recurring payment detection
//!
//! Finds subscriptions, rent, and other repeating charges by analyzing the
//! day gaps between a merchant's expenses. Two passes: exact-amount groups
//! first (a 649.00 charge every month), then a variable-amount pass per
//! merchant (groceries that repeat weekly at changing totals). Detected
//! suggestions are merged with persisted confirm/dismiss state at the
//! presentation boundary.

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{
    RecurringInterval, RecurringRule, RecurringRuleUpsert, RecurringStatus, Transaction,
};

/// Minimum charges before a merchant can be considered recurring
const MIN_OCCURRENCES: usize = 3;

/// Variable-amount groups get this much more gap jitter allowance
const VARIABLE_STD_FACTOR: f64 = 1.5;

/// Confidence penalty for variable-amount groups
const VARIABLE_AMOUNT_PENALTY: f64 = 0.85;

/// Amount spread below this counts as "the same amount"
const EXACT_AMOUNT_EPSILON: f64 = 0.01;

struct IntervalSpec {
    interval: RecurringInterval,
    /// Inclusive mean-gap range in days
    min_gap: f64,
    max_gap: f64,
    /// Maximum gap standard deviation for exact-amount groups
    max_std: f64,
    base_confidence: f64,
    clamp_min: f64,
    clamp_max: f64,
}

const INTERVALS: [IntervalSpec; 5] = [
    IntervalSpec {
        interval: RecurringInterval::Weekly,
        min_gap: 6.0,
        max_gap: 8.0,
        max_std: 2.0,
        base_confidence: 0.80,
        clamp_min: 0.40,
        clamp_max: 0.90,
    },
    IntervalSpec {
        interval: RecurringInterval::Biweekly,
        min_gap: 13.0,
        max_gap: 16.0,
        max_std: 3.0,
        base_confidence: 0.80,
        clamp_min: 0.40,
        clamp_max: 0.90,
    },
    IntervalSpec {
        interval: RecurringInterval::Monthly,
        min_gap: 25.0,
        max_gap: 35.0,
        max_std: 5.0,
        base_confidence: 0.90,
        clamp_min: 0.50,
        clamp_max: 0.95,
    },
    IntervalSpec {
        interval: RecurringInterval::Quarterly,
        min_gap: 85.0,
        max_gap: 95.0,
        max_std: 7.0,
        base_confidence: 0.85,
        clamp_min: 0.45,
        clamp_max: 0.90,
    },
    IntervalSpec {
        interval: RecurringInterval::Yearly,
        min_gap: 360.0,
        max_gap: 370.0,
        max_std: 10.0,
        base_confidence: 0.90,
        clamp_min: 0.50,
        clamp_max: 0.95,
    },
];

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator)
fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

/// Result of classifying one group's date gaps
struct Cadence {
    interval: RecurringInterval,
    avg_gap: f64,
    confidence: f64,
}

/// Classify sorted dates into an interval, or None when the gaps fit no
/// known cadence or jitter too much
fn classify(dates: &[NaiveDate], variable: bool) -> Option<Cadence> {
    if dates.len() < MIN_OCCURRENCES {
        return None;
    }

    let gaps: Vec<f64> = dates
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days() as f64)
        .collect();
    let avg_gap = mean(&gaps);
    let std = sample_std(&gaps);

    let spec = INTERVALS
        .iter()
        .find(|s| avg_gap >= s.min_gap && avg_gap <= s.max_gap)?;

    let allowance = if variable {
        spec.max_std * VARIABLE_STD_FACTOR
    } else {
        spec.max_std
    };
    if std > allowance {
        return None;
    }

    let mut confidence = spec.base_confidence * (1.0 - 0.5 * std / allowance);
    if variable {
        confidence *= VARIABLE_AMOUNT_PENALTY;
    }
    confidence = confidence.clamp(spec.clamp_min, spec.clamp_max);

    Some(Cadence {
        interval: spec.interval,
        avg_gap,
        confidence,
    })
}

/// One detected recurring payment
#[derive(Debug, Clone, Serialize)]
pub struct RecurringSuggestion {
    pub merchant_name: String,
    pub expected_amount: f64,
    pub amount_min: f64,
    pub amount_max: f64,
    pub is_variable_amount: bool,
    pub interval: RecurringInterval,
    pub avg_interval_days: f64,
    pub confidence: f64,
    pub last_seen_date: NaiveDate,
    pub next_expected_date: NaiveDate,
    pub transaction_count: i64,
    pub transaction_ids: Vec<i64>,
}

/// Detection output merged with stored lifecycle state
#[derive(Debug, Serialize)]
pub struct RecurringReport {
    pub suggestions: Vec<RecurringSuggestion>,
    pub confirmed: Vec<RecurringRule>,
    /// Suggestions suppressed by a dismissed rule
    pub dismissed_count: usize,
}

/// Statistical recurring payment detector
pub struct RecurringDetector<'a> {
    db: &'a Database,
}

impl<'a> RecurringDetector<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Raw detection over a user's expenses, ignoring stored lifecycle state
    pub fn detect(&self, user_id: i64) -> Result<Vec<RecurringSuggestion>> {
        let expenses = self.db.list_expenses(user_id)?;

        // Group by merchant, case-insensitively, keeping a display name
        let mut by_merchant: BTreeMap<String, (String, Vec<&Transaction>)> = BTreeMap::new();
        for tx in &expenses {
            let display = tx
                .merchant_name
                .clone()
                .unwrap_or_else(|| tx.description.trim().to_string());
            let key = display.to_lowercase();
            by_merchant
                .entry(key)
                .or_insert_with(|| (display, Vec::new()))
                .1
                .push(tx);
        }

        let mut suggestions = Vec::new();

        for (_, (display, txs)) in by_merchant {
            // Pass one: exact-amount groups (rounded to the whole unit)
            let mut by_amount: BTreeMap<i64, Vec<&Transaction>> = BTreeMap::new();
            for tx in &txs {
                by_amount
                    .entry(tx.amount.abs().round() as i64)
                    .or_default()
                    .push(tx);
            }

            let mut matched = false;
            for group in by_amount.values() {
                if group.len() < MIN_OCCURRENCES {
                    continue;
                }
                let amounts: Vec<f64> = group.iter().map(|t| t.amount.abs()).collect();
                let spread = amounts.iter().cloned().fold(f64::MIN, f64::max)
                    - amounts.iter().cloned().fold(f64::MAX, f64::min);
                let variable = spread > EXACT_AMOUNT_EPSILON;

                if let Some(s) = Self::suggest(&display, group, variable) {
                    suggestions.push(s);
                    matched = true;
                }
            }

            // Pass two: the whole merchant at variable amounts
            if !matched && txs.len() >= MIN_OCCURRENCES {
                if let Some(s) = Self::suggest(&display, &txs, true) {
                    suggestions.push(s);
                }
            }
        }

        suggestions.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(
                    b.expected_amount
                        .partial_cmp(&a.expected_amount)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
        });

        debug!(count = suggestions.len(), "Recurring detection complete");
        Ok(suggestions)
    }

    fn suggest(
        display: &str,
        group: &[&Transaction],
        variable: bool,
    ) -> Option<RecurringSuggestion> {
        let dates: Vec<NaiveDate> = group.iter().map(|t| t.date).collect();
        let cadence = classify(&dates, variable)?;

        let mut amounts: Vec<f64> = group.iter().map(|t| t.amount.abs()).collect();
        let expected = median(&mut amounts);
        let last = *dates.last()?;

        Some(RecurringSuggestion {
            merchant_name: display.to_string(),
            expected_amount: expected,
            amount_min: amounts.first().copied().unwrap_or(expected),
            amount_max: amounts.last().copied().unwrap_or(expected),
            is_variable_amount: variable,
            interval: cadence.interval,
            avg_interval_days: cadence.avg_gap,
            confidence: cadence.confidence,
            last_seen_date: last,
            next_expected_date: last + Duration::days(cadence.avg_gap.round() as i64),
            transaction_count: group.len() as i64,
            transaction_ids: group.iter().map(|t| t.id).collect(),
        })
    }

    /// Detection merged with stored rules: dismissed merchants are
    /// suppressed, confirmed ones surface from their stored rule
    pub fn report(&self, user_id: i64) -> Result<RecurringReport> {
        let detected = self.detect(user_id)?;
        let rules = self.db.list_recurring_rules(user_id)?;

        let by_merchant: BTreeMap<String, &RecurringRule> = rules
            .iter()
            .map(|r| (r.merchant_name.to_lowercase(), r))
            .collect();

        let mut suggestions = Vec::new();
        let mut dismissed_count = 0;
        for suggestion in detected {
            match by_merchant
                .get(&suggestion.merchant_name.to_lowercase())
                .map(|r| r.status)
            {
                Some(RecurringStatus::Dismissed) => dismissed_count += 1,
                Some(RecurringStatus::Confirmed) => {}
                _ => suggestions.push(suggestion),
            }
        }

        let confirmed = rules
            .iter()
            .filter(|r| r.status == RecurringStatus::Confirmed)
            .cloned()
            .collect();

        Ok(RecurringReport {
            suggestions,
            confirmed,
            dismissed_count,
        })
    }

    /// Confirm a suggestion, persisting it as a rule
    pub fn confirm(&self, user_id: i64, merchant_name: &str) -> Result<RecurringRule> {
        self.persist(user_id, merchant_name, RecurringStatus::Confirmed)
    }

    /// Dismiss a merchant so it stops being suggested
    pub fn dismiss(&self, user_id: i64, merchant_name: &str) -> Result<RecurringRule> {
        self.persist(user_id, merchant_name, RecurringStatus::Dismissed)
    }

    fn persist(
        &self,
        user_id: i64,
        merchant_name: &str,
        status: RecurringStatus,
    ) -> Result<RecurringRule> {
        let suggestion = self
            .detect(user_id)?
            .into_iter()
            .find(|s| s.merchant_name.eq_ignore_ascii_case(merchant_name))
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "No recurring suggestion for merchant '{}'",
                    merchant_name
                ))
            })?;

        self.db.upsert_recurring_rule(
            user_id,
            &RecurringRuleUpsert {
                merchant_name: suggestion.merchant_name,
                expected_amount: suggestion.expected_amount,
                amount_min: suggestion.amount_min,
                amount_max: suggestion.amount_max,
                is_variable_amount: suggestion.is_variable_amount,
                interval: suggestion.interval,
                avg_interval_days: suggestion.avg_interval_days,
                status,
                confidence: suggestion.confidence,
                last_seen_date: suggestion.last_seen_date,
                next_expected_date: suggestion.next_expected_date,
                transaction_count: suggestion.transaction_count,
            },
        )
    }
}
