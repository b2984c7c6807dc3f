//! Data models for transactions, merchant rules, recurring rules, and transfers

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Transaction classification derived from the amount sign at import.
///
/// Negative amounts are expenses, non-negative amounts are income. Both legs
/// of a linked self-transfer are retyped to `Transfer` so they drop out of
/// income/expense aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
    Transfer,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
            TransactionType::Transfer => "transfer",
        }
    }

    /// Classification for a freshly imported amount
    pub fn from_amount(amount: f64) -> Self {
        if amount < 0.0 {
            TransactionType::Expense
        } else {
            TransactionType::Income
        }
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            "transfer" => Ok(TransactionType::Transfer),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

/// A ledger user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A bank account belonging to a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub bank_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An imported transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub account_id: i64,
    pub date: NaiveDate,
    pub description: String,
    /// Signed amount: negative = money out, positive = money in
    pub amount: f64,
    pub category: Option<String>,
    pub merchant_name: Option<String>,
    pub tx_type: TransactionType,
    /// Dedup signature, unique across the whole table
    pub signature: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

/// A validated import candidate, ready for insertion
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub account_id: i64,
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub tx_type: TransactionType,
    pub signature: String,
}

/// A user-defined merchant mapping rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantRule {
    pub id: i64,
    pub user_id: i64,
    /// Clean display name, unique per user (case-insensitive)
    pub normalized_name: String,
    /// Match patterns: literal substrings or globs (`*`, `?`)
    pub patterns: Vec<String>,
    pub category: Option<String>,
    /// Minimum token-set similarity for a fuzzy hit
    pub fuzzy_threshold: f64,
    /// How many transactions this rule has been applied to
    pub usage_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a merchant rule
#[derive(Debug, Clone, Deserialize)]
pub struct NewMerchantRule {
    pub normalized_name: String,
    pub patterns: Vec<String>,
    pub category: Option<String>,
    pub fuzzy_threshold: Option<f64>,
}

/// Partial update for a merchant rule; `None` fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MerchantRuleUpdate {
    pub normalized_name: Option<String>,
    pub patterns: Option<Vec<String>>,
    pub category: Option<String>,
    pub fuzzy_threshold: Option<f64>,
}

/// Lifecycle state of a recurring payment rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurringStatus {
    Suggested,
    Confirmed,
    Dismissed,
}

impl RecurringStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurringStatus::Suggested => "suggested",
            RecurringStatus::Confirmed => "confirmed",
            RecurringStatus::Dismissed => "dismissed",
        }
    }
}

impl FromStr for RecurringStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "suggested" => Ok(RecurringStatus::Suggested),
            "confirmed" => Ok(RecurringStatus::Confirmed),
            "dismissed" => Ok(RecurringStatus::Dismissed),
            _ => Err(format!("Unknown recurring status: {}", s)),
        }
    }
}

/// Detected cadence of a recurring payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurringInterval {
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl RecurringInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurringInterval::Weekly => "weekly",
            RecurringInterval::Biweekly => "biweekly",
            RecurringInterval::Monthly => "monthly",
            RecurringInterval::Quarterly => "quarterly",
            RecurringInterval::Yearly => "yearly",
        }
    }
}

impl FromStr for RecurringInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(RecurringInterval::Weekly),
            "biweekly" => Ok(RecurringInterval::Biweekly),
            "monthly" => Ok(RecurringInterval::Monthly),
            "quarterly" => Ok(RecurringInterval::Quarterly),
            "yearly" => Ok(RecurringInterval::Yearly),
            _ => Err(format!("Unknown recurring interval: {}", s)),
        }
    }
}

/// Persisted recurring payment state for one merchant
///
/// One row per (user, merchant). Confirmed rows are surfaced instead of
/// fresh suggestions; dismissed rows suppress the merchant until deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringRule {
    pub id: i64,
    pub user_id: i64,
    pub merchant_name: String,
    /// Representative charge amount (absolute value)
    pub expected_amount: f64,
    pub amount_min: f64,
    pub amount_max: f64,
    pub is_variable_amount: bool,
    pub interval: RecurringInterval,
    pub avg_interval_days: f64,
    pub status: RecurringStatus,
    pub confidence: f64,
    pub last_seen_date: NaiveDate,
    pub next_expected_date: NaiveDate,
    pub transaction_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full state written when a recurring rule is created or refreshed
#[derive(Debug, Clone)]
pub struct RecurringRuleUpsert {
    pub merchant_name: String,
    pub expected_amount: f64,
    pub amount_min: f64,
    pub amount_max: f64,
    pub is_variable_amount: bool,
    pub interval: RecurringInterval,
    pub avg_interval_days: f64,
    pub status: RecurringStatus,
    pub confidence: f64,
    pub last_seen_date: NaiveDate,
    pub next_expected_date: NaiveDate,
    pub transaction_count: i64,
}

/// A confirmed or detected link between two legs of a self-transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transfer {
    pub id: i64,
    pub user_id: i64,
    pub debit_transaction_id: i64,
    pub credit_transaction_id: i64,
    /// Absolute amount of the debit leg
    pub amount: f64,
    pub transfer_date: NaiveDate,
    pub confidence_score: Option<f64>,
    pub is_confirmed: bool,
    pub created_at: DateTime<Utc>,
}
