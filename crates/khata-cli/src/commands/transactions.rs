//! Transaction command implementations

use anyhow::Result;
use khata_core::Database;

use super::{truncate, LOCAL_USER};

pub fn cmd_transactions_list(db: &Database, limit: i64, account: Option<i64>) -> Result<()> {
    let transactions = db.list_transactions(LOCAL_USER, account, limit, 0)?;

    if transactions.is_empty() {
        println!("No transactions found. Import some with:");
        println!("  khata import --file rows.json");
        return Ok(());
    }

    println!();
    println!("📝 Recent Transactions");
    println!("   ─────────────────────────────────────────────────────────────");

    for tx in transactions {
        let amount_str = if tx.amount < 0.0 {
            format!("\x1b[31m{:.2}\x1b[0m", tx.amount.abs()) // Red for expenses
        } else {
            format!("\x1b[32m+{:.2}\x1b[0m", tx.amount) // Green for income
        };

        let merchant = tx.merchant_name.as_deref().unwrap_or("-");
        println!(
            "   [{}] {} │ {:>12} │ {:<20} │ {}",
            tx.id,
            tx.date,
            amount_str,
            truncate(merchant, 20),
            truncate(&tx.description, 36)
        );
    }

    Ok(())
}

pub fn cmd_transactions_delete(db: &Database, id: i64) -> Result<()> {
    db.delete_transaction(LOCAL_USER, id)?;
    println!("✅ Deleted transaction {}", id);
    Ok(())
}
