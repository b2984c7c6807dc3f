//! Self-transfer command implementations

use anyhow::Result;
use khata_core::transfer::{DEFAULT_AMOUNT_TOLERANCE, DEFAULT_DAYS_WINDOW};
use khata_core::{Database, TransferDetector};

use super::{truncate, LOCAL_USER};

pub fn cmd_transfers_list(db: &Database) -> Result<()> {
    let transfers = db.list_transfers(LOCAL_USER)?;

    if transfers.is_empty() {
        println!("No transfer links yet. Find candidates with:");
        println!("  khata transfers detect");
        return Ok(());
    }

    println!();
    println!("🔗 Transfer Links");
    println!("   ─────────────────────────────────────────────────────────────");
    for t in transfers {
        println!(
            "   [{}] {} │ {:>12.2} │ tx {} → tx {} │ {}",
            t.id,
            t.transfer_date,
            t.amount,
            t.debit_transaction_id,
            t.credit_transaction_id,
            if t.is_confirmed { "confirmed" } else { "detected" }
        );
    }

    Ok(())
}

pub fn cmd_transfers_detect(
    db: &Database,
    days_window: Option<i64>,
    tolerance: Option<f64>,
) -> Result<()> {
    let days_window = days_window.unwrap_or(DEFAULT_DAYS_WINDOW);
    let tolerance = tolerance.unwrap_or(DEFAULT_AMOUNT_TOLERANCE);

    let candidates = TransferDetector::new(db).detect(LOCAL_USER, days_window, tolerance)?;

    if candidates.is_empty() {
        println!("No transfer candidates found.");
        return Ok(());
    }

    println!();
    println!("🔍 Transfer Candidates");
    println!("   ─────────────────────────────────────────────────────────────");
    for c in &candidates {
        println!(
            "   {:>12.2} │ conf {:.2} │ {} day(s) apart",
            c.amount, c.confidence, c.date_diff_days
        );
        println!(
            "      out: [{}] {} {}",
            c.debit.id,
            c.debit.date,
            truncate(&c.debit.description, 40)
        );
        println!(
            "      in:  [{}] {} {}",
            c.credit.id,
            c.credit.date,
            truncate(&c.credit.description, 40)
        );
    }
    println!();
    println!("   Link a pair with: khata transfers link <debit-id> <credit-id>");

    Ok(())
}

pub fn cmd_transfers_link(db: &Database, debit: i64, credit: i64) -> Result<()> {
    let transfer = db.create_transfer(LOCAL_USER, debit, credit, None, true)?;
    println!(
        "✅ Linked tx {} → tx {} as transfer [{}] ({:.2})",
        debit, credit, transfer.id, transfer.amount
    );
    Ok(())
}

pub fn cmd_transfers_unlink(db: &Database, id: i64) -> Result<()> {
    db.delete_transfer(LOCAL_USER, id)?;
    println!("✅ Unlinked transfer {}; both legs restored", id);
    Ok(())
}
