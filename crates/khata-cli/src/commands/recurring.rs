//! Recurring payment command implementations

use anyhow::Result;
use khata_core::{Database, RecurringDetector};

use super::{truncate, LOCAL_USER};

pub fn cmd_recurring_report(db: &Database) -> Result<()> {
    let report = RecurringDetector::new(db).report(LOCAL_USER)?;

    if report.suggestions.is_empty() && report.confirmed.is_empty() {
        println!("No recurring payments detected yet.");
        println!("Suggestions appear once a merchant has three charges on a steady cadence.");
        return Ok(());
    }

    if !report.suggestions.is_empty() {
        println!();
        println!("🔁 Suggested ({} dismissed hidden)", report.dismissed_count);
        println!("   ─────────────────────────────────────────────────────────────");
        for s in &report.suggestions {
            let amount = if s.is_variable_amount {
                format!("~{:.2} ({:.2}-{:.2})", s.expected_amount, s.amount_min, s.amount_max)
            } else {
                format!("{:.2}", s.expected_amount)
            };
            println!(
                "   {:<24} │ {:<9} │ {:>20} │ conf {:.2} │ next {}",
                truncate(&s.merchant_name, 24),
                s.interval.as_str(),
                amount,
                s.confidence,
                s.next_expected_date
            );
        }
        println!();
        println!("   Confirm with: khata recurring confirm \"<merchant>\"");
    }

    if !report.confirmed.is_empty() {
        println!();
        println!("✅ Confirmed");
        println!("   ─────────────────────────────────────────────────────────────");
        for rule in &report.confirmed {
            println!(
                "   [{}] {:<24} │ {:<9} │ {:>10.2} │ next {}",
                rule.id,
                truncate(&rule.merchant_name, 24),
                rule.interval.as_str(),
                rule.expected_amount,
                rule.next_expected_date
            );
        }
    }

    Ok(())
}

pub fn cmd_recurring_confirm(db: &Database, merchant: &str) -> Result<()> {
    let rule = RecurringDetector::new(db).confirm(LOCAL_USER, merchant)?;
    println!(
        "✅ Confirmed {} as {} recurring (next expected {})",
        rule.merchant_name,
        rule.interval.as_str(),
        rule.next_expected_date
    );
    Ok(())
}

pub fn cmd_recurring_dismiss(db: &Database, merchant: &str) -> Result<()> {
    let rule = RecurringDetector::new(db).dismiss(LOCAL_USER, merchant)?;
    println!("✅ Dismissed {}; it will not be suggested again", rule.merchant_name);
    Ok(())
}

pub fn cmd_recurring_delete(db: &Database, id: i64) -> Result<()> {
    db.delete_recurring_rule(LOCAL_USER, id)?;
    println!("✅ Deleted recurring rule {}; the merchant can be suggested again", id);
    Ok(())
}
