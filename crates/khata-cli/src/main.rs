//! Khata CLI - Bank statement transaction ledger
//!
//! Usage:
//!   khata init                  Initialize database
//!   khata import --file FILE    Import statement rows from JSON
//!   khata recurring             Show recurring payment suggestions
//!   khata serve --port 3000     Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Import { file, account } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_import(&db, &file, account)
        }
        Commands::Accounts { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None | Some(AccountsAction::List) => commands::cmd_accounts_list(&db),
                Some(AccountsAction::Add { name, bank }) => {
                    commands::cmd_accounts_add(&db, &name, bank.as_deref())
                }
            }
        }
        Commands::Transactions { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None => commands::cmd_transactions_list(&db, 20, None),
                Some(TransactionsAction::List { limit, account }) => {
                    commands::cmd_transactions_list(&db, limit, account)
                }
                Some(TransactionsAction::Delete { id }) => {
                    commands::cmd_transactions_delete(&db, id)
                }
            }
        }
        Commands::Merchants { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None | Some(MerchantsAction::List) => commands::cmd_merchants_list(&db),
                Some(MerchantsAction::Add {
                    name,
                    patterns,
                    category,
                    threshold,
                }) => commands::cmd_merchants_add(
                    &db,
                    &name,
                    patterns,
                    category.as_deref(),
                    threshold,
                ),
                Some(MerchantsAction::Delete { id }) => commands::cmd_merchants_delete(&db, id),
                Some(MerchantsAction::Apply { id, no_category }) => {
                    commands::cmd_merchants_apply(&db, id, !no_category)
                }
                Some(MerchantsAction::Match { description }) => {
                    commands::cmd_merchants_match(&db, &description)
                }
            }
        }
        Commands::Recurring { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None | Some(RecurringAction::Report) => commands::cmd_recurring_report(&db),
                Some(RecurringAction::Confirm { merchant }) => {
                    commands::cmd_recurring_confirm(&db, &merchant)
                }
                Some(RecurringAction::Dismiss { merchant }) => {
                    commands::cmd_recurring_dismiss(&db, &merchant)
                }
                Some(RecurringAction::Delete { id }) => commands::cmd_recurring_delete(&db, id),
            }
        }
        Commands::Transfers { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None | Some(TransfersAction::List) => commands::cmd_transfers_list(&db),
                Some(TransfersAction::Detect {
                    days_window,
                    tolerance,
                }) => commands::cmd_transfers_detect(&db, days_window, tolerance),
                Some(TransfersAction::Link { debit, credit }) => {
                    commands::cmd_transfers_link(&db, debit, credit)
                }
                Some(TransfersAction::Unlink { id }) => commands::cmd_transfers_unlink(&db, id),
            }
        }
        Commands::Serve {
            port,
            host,
            cors_origins,
        } => commands::cmd_serve(&cli.db, &host, port, cors_origins).await,
    }
}
