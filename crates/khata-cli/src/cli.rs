//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Khata - Bank statement transaction ledger
#[derive(Parser)]
#[command(name = "khata")]
#[command(about = "Self-hosted bank statement transaction ledger", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "khata.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Import transactions from a JSON file of statement rows
    Import {
        /// JSON file: an array of {date, amount, description, account_id}
        #[arg(short, long)]
        file: PathBuf,

        /// Send every row to this account, overriding per-row account ids
        #[arg(short, long)]
        account: Option<i64>,
    },

    /// Manage accounts
    Accounts {
        #[command(subcommand)]
        action: Option<AccountsAction>,
    },

    /// List transactions
    Transactions {
        #[command(subcommand)]
        action: Option<TransactionsAction>,
    },

    /// Manage merchant rules
    Merchants {
        #[command(subcommand)]
        action: Option<MerchantsAction>,
    },

    /// Recurring payment suggestions and rules
    Recurring {
        #[command(subcommand)]
        action: Option<RecurringAction>,
    },

    /// Self-transfer detection and links
    Transfers {
        #[command(subcommand)]
        action: Option<TransfersAction>,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Allowed CORS origin (repeatable)
        #[arg(long = "cors-origin")]
        cors_origins: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum AccountsAction {
    /// List accounts
    List,
    /// Add an account
    Add {
        /// Account name
        name: String,
        /// Bank name
        #[arg(short, long)]
        bank: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum TransactionsAction {
    /// List recent transactions
    List {
        /// Maximum number to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
        /// Only this account
        #[arg(short, long)]
        account: Option<i64>,
    },
    /// Delete a transaction
    Delete {
        /// Transaction ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum MerchantsAction {
    /// List merchant rules
    List,
    /// Add a merchant rule
    Add {
        /// Normalized merchant name
        name: String,
        /// Match patterns, literal or glob (repeatable)
        #[arg(short, long = "pattern")]
        patterns: Vec<String>,
        /// Category to assign
        #[arg(short, long)]
        category: Option<String>,
        /// Fuzzy match threshold (0..=1)
        #[arg(short, long)]
        threshold: Option<f64>,
    },
    /// Delete a merchant rule
    Delete {
        /// Rule ID
        id: i64,
    },
    /// Apply a rule to existing transactions
    Apply {
        /// Rule ID
        id: i64,
        /// Leave transaction categories untouched
        #[arg(long)]
        no_category: bool,
    },
    /// Dry-run the matcher against a description
    Match {
        /// Raw transaction description
        description: String,
    },
}

#[derive(Subcommand)]
pub enum RecurringAction {
    /// Show suggestions and confirmed rules
    Report,
    /// Confirm a suggested merchant as recurring
    Confirm {
        /// Merchant name from the suggestion list
        merchant: String,
    },
    /// Dismiss a suggested merchant
    Dismiss {
        /// Merchant name from the suggestion list
        merchant: String,
    },
    /// Delete a rule, resetting the merchant's state
    Delete {
        /// Rule ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum TransfersAction {
    /// List transfer links
    List,
    /// Detect candidate pairs without linking
    Detect {
        /// Maximum days between the two legs
        #[arg(long)]
        days_window: Option<i64>,
        /// Relative amount tolerance (0..=1)
        #[arg(long)]
        tolerance: Option<f64>,
    },
    /// Link two transactions as a self-transfer
    Link {
        /// Debit (money out) transaction ID
        debit: i64,
        /// Credit (money in) transaction ID
        credit: i64,
    },
    /// Unlink a transfer, restoring both legs
    Unlink {
        /// Transfer ID
        id: i64,
    },
}
