//! Khata Core Library
//!
//! Shared functionality for the Khata transaction ledger:
//! - Database access and migrations
//! - Duplicate-safe batch import with dedup signatures
//! - Merchant rule matching (literal, glob, fuzzy) with a fallback normalizer
//! - Statistical recurring payment detection with a confirm/dismiss lifecycle
//! - Self-transfer pairing across a user's accounts
//! - Pluggable merchant suggestion backends

pub mod ai;
pub mod db;
pub mod error;
pub mod import;
pub mod merchant;
pub mod models;
pub mod recurring;
pub mod signature;
pub mod transfer;

pub use ai::{HttpSuggester, MerchantSuggester, MerchantSuggestion, MockSuggester};
pub use db::Database;
pub use error::{Error, Result};
pub use import::{ImportRow, ImportSummary, Importer};
pub use merchant::{MerchantMatch, MerchantMatcher, MerchantNormalizer};
pub use recurring::{RecurringDetector, RecurringReport, RecurringSuggestion};
pub use transfer::{TransferCandidate, TransferDetector};
