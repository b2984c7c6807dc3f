//! Pluggable merchant suggestion backends
//!
//! An optional refinement pass over imported transactions: a backend looks
//! at raw descriptions the rule matcher could not claim and proposes a
//! cleaner merchant name. Always best-effort; a dead or slow backend never
//! fails an import, it just leaves the normalizer's answer in place.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::db::Database;
use crate::error::Result;
use crate::merchant::MerchantMatcher;
use crate::models::Transaction;

/// Environment variable naming the suggestion service host
pub const SUGGEST_HOST_ENV: &str = "KHATA_SUGGEST_HOST";

/// Per-request timeout for suggestion calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Suggestions below this confidence are ignored
const MIN_SUGGESTION_CONFIDENCE: f64 = 0.7;

/// A proposed merchant for one description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantSuggestion {
    pub merchant: String,
    pub category: Option<String>,
    pub confidence: f64,
}

/// A backend that can propose merchant names for raw descriptions
#[async_trait]
pub trait MerchantSuggester: Send + Sync {
    /// Propose a merchant, or None when the backend has no opinion
    async fn suggest(&self, description: &str) -> Result<Option<MerchantSuggestion>>;
}

/// HTTP suggestion backend
///
/// POSTs `{"description": ...}` to `{host}/v1/suggest` and expects a
/// `MerchantSuggestion` JSON body (or 204 for no opinion).
pub struct HttpSuggester {
    client: reqwest::Client,
    host: String,
}

impl HttpSuggester {
    pub fn new(host: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
        })
    }

    /// Build from `KHATA_SUGGEST_HOST`, or None when unset
    pub fn from_env() -> Option<Self> {
        let host = std::env::var(SUGGEST_HOST_ENV).ok()?;
        match Self::new(&host) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!(error = %e, "Failed to build suggestion client");
                None
            }
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

#[async_trait]
impl MerchantSuggester for HttpSuggester {
    async fn suggest(&self, description: &str) -> Result<Option<MerchantSuggestion>> {
        let response = self
            .client
            .post(format!("{}/v1/suggest", self.host))
            .json(&serde_json::json!({ "description": description }))
            .send()
            .await?
            .error_for_status()?;

        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let suggestion: MerchantSuggestion = response.json().await?;
        Ok(Some(suggestion))
    }
}

/// In-memory backend for tests: exact description lookup
#[derive(Default)]
pub struct MockSuggester {
    responses: HashMap<String, MerchantSuggestion>,
}

impl MockSuggester {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, description: &str, suggestion: MerchantSuggestion) -> Self {
        self.responses.insert(description.to_string(), suggestion);
        self
    }
}

#[async_trait]
impl MerchantSuggester for MockSuggester {
    async fn suggest(&self, description: &str) -> Result<Option<MerchantSuggestion>> {
        Ok(self.responses.get(description).cloned())
    }
}

/// Refinement pass over freshly imported transactions
///
/// Skips transactions a merchant rule claims (rules are authoritative) and
/// applies confident suggestions to the rest. Backend failures are logged
/// and swallowed; only database errors propagate. Returns the number of
/// transactions updated.
pub async fn refine_merchants(
    db: &Database,
    suggester: &dyn MerchantSuggester,
    user_id: i64,
    transactions: &[Transaction],
) -> Result<usize> {
    let matcher = MerchantMatcher::new(db);
    let mut updated = 0;

    for tx in transactions {
        if matcher.find_match(user_id, &tx.description)?.is_some() {
            continue;
        }

        let suggestion = match suggester.suggest(&tx.description).await {
            Ok(Some(s)) => s,
            Ok(None) => continue,
            Err(e) => {
                warn!(error = %e, transaction_id = tx.id, "Suggestion backend failed");
                continue;
            }
        };
        if suggestion.confidence < MIN_SUGGESTION_CONFIDENCE {
            continue;
        }

        let category = if tx.category.is_none() {
            suggestion.category.as_deref()
        } else {
            None
        };
        db.set_transaction_merchant(tx.id, &suggestion.merchant, category)?;
        updated += 1;
        debug!(
            transaction_id = tx.id,
            merchant = %suggestion.merchant,
            confidence = suggestion.confidence,
            "Merchant refined from suggestion"
        );
    }

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{ImportRow, Importer};

    #[tokio::test]
    async fn test_refine_applies_confident_suggestions() {
        let db = Database::in_memory().unwrap();
        let account = db.create_account(1, "HDFC Savings", None).unwrap();
        let importer = Importer::new(&db).unwrap();
        let summary = importer
            .import(
                1,
                &[ImportRow {
                    date: "2024-03-01".to_string(),
                    amount: -240.0,
                    description: "POS/KAKA HALWAI 4411".to_string(),
                    account_id: account.id,
                }],
            )
            .unwrap();

        let suggester = MockSuggester::new().with_response(
            "POS/KAKA HALWAI 4411",
            MerchantSuggestion {
                merchant: "Kaka Halwai".to_string(),
                category: Some("Food".to_string()),
                confidence: 0.92,
            },
        );

        let updated = refine_merchants(&db, &suggester, 1, &summary.inserted)
            .await
            .unwrap();
        assert_eq!(updated, 1);

        let tx = db
            .get_transaction(1, summary.inserted[0].id)
            .unwrap()
            .unwrap();
        assert_eq!(tx.merchant_name.as_deref(), Some("Kaka Halwai"));
        assert_eq!(tx.category.as_deref(), Some("Food"));
    }

    #[tokio::test]
    async fn test_refine_skips_low_confidence_and_rule_matches() {
        use crate::models::NewMerchantRule;
        let db = Database::in_memory().unwrap();
        let account = db.create_account(1, "HDFC Savings", None).unwrap();
        db.create_merchant_rule(
            1,
            &NewMerchantRule {
                normalized_name: "Swiggy".to_string(),
                patterns: vec!["SWIGGY".to_string()],
                category: None,
                fuzzy_threshold: None,
            },
        )
        .unwrap();

        let importer = Importer::new(&db).unwrap();
        let summary = importer
            .import(
                1,
                &[
                    ImportRow {
                        date: "2024-03-01".to_string(),
                        amount: -120.0,
                        description: "UPI/SWIGGY/111".to_string(),
                        account_id: account.id,
                    },
                    ImportRow {
                        date: "2024-03-02".to_string(),
                        amount: -90.0,
                        description: "POS/CORNER SHOP".to_string(),
                        account_id: account.id,
                    },
                ],
            )
            .unwrap();

        let suggester = MockSuggester::new()
            .with_response(
                "UPI/SWIGGY/111",
                MerchantSuggestion {
                    merchant: "Not Swiggy".to_string(),
                    category: None,
                    confidence: 0.99,
                },
            )
            .with_response(
                "POS/CORNER SHOP",
                MerchantSuggestion {
                    merchant: "Corner Shop".to_string(),
                    category: None,
                    confidence: 0.3,
                },
            );

        let updated = refine_merchants(&db, &suggester, 1, &summary.inserted)
            .await
            .unwrap();
        assert_eq!(updated, 0);

        // The rule's mapping was not overwritten
        let tx = db
            .get_transaction(1, summary.inserted[0].id)
            .unwrap()
            .unwrap();
        assert_eq!(tx.merchant_name.as_deref(), Some("Swiggy"));
    }
}
