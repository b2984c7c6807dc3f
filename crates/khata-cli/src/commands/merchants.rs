//! Merchant rule command implementations

use anyhow::Result;
use khata_core::models::NewMerchantRule;
use khata_core::{Database, MerchantMatcher};

use super::{truncate, LOCAL_USER};

pub fn cmd_merchants_list(db: &Database) -> Result<()> {
    let rules = db.list_merchant_rules(LOCAL_USER)?;

    if rules.is_empty() {
        println!("No merchant rules yet. Add one with:");
        println!("  khata merchants add Amazon --pattern 'AMZN*' --category Shopping");
        return Ok(());
    }

    println!();
    println!("🏷️  Merchant Rules");
    println!("   ─────────────────────────────────────────────────────────────");
    for rule in rules {
        println!(
            "   [{}] {:<24} │ {:<16} │ used {}x │ {}",
            rule.id,
            truncate(&rule.normalized_name, 24),
            rule.category.as_deref().unwrap_or("-"),
            rule.usage_count,
            rule.patterns.join(", ")
        );
    }

    Ok(())
}

pub fn cmd_merchants_add(
    db: &Database,
    name: &str,
    patterns: Vec<String>,
    category: Option<&str>,
    threshold: Option<f64>,
) -> Result<()> {
    let rule = db.create_merchant_rule(
        LOCAL_USER,
        &NewMerchantRule {
            normalized_name: name.to_string(),
            patterns,
            category: category.map(String::from),
            fuzzy_threshold: threshold,
        },
    )?;
    println!("✅ Created merchant rule [{}] {}", rule.id, rule.normalized_name);
    Ok(())
}

pub fn cmd_merchants_delete(db: &Database, id: i64) -> Result<()> {
    db.delete_merchant_rule(LOCAL_USER, id)?;
    println!("✅ Deleted merchant rule {}", id);
    Ok(())
}

pub fn cmd_merchants_apply(db: &Database, id: i64, update_category: bool) -> Result<()> {
    let matcher = MerchantMatcher::new(db);
    let updated = matcher.apply_rule(LOCAL_USER, id, update_category)?;
    println!("✅ Rule {} applied to {} transaction(s)", id, updated);
    Ok(())
}

pub fn cmd_merchants_match(db: &Database, description: &str) -> Result<()> {
    let matcher = MerchantMatcher::new(db);
    match matcher.find_match(LOCAL_USER, description)? {
        Some(m) => {
            println!("✅ Matched: {} (score {:.2})", m.rule.normalized_name, m.score);
            if let Some(pattern) = m.matched_pattern {
                println!("   Pattern: {}", pattern);
            }
        }
        None => println!("No rule matches '{}'", description),
    }
    Ok(())
}
