//! Account command implementations

use anyhow::Result;
use khata_core::Database;

use super::LOCAL_USER;

pub fn cmd_accounts_list(db: &Database) -> Result<()> {
    let accounts = db.list_accounts(LOCAL_USER)?;

    if accounts.is_empty() {
        println!("No accounts yet. Add one with:");
        println!("  khata accounts add \"HDFC Savings\" --bank HDFC");
        return Ok(());
    }

    println!();
    println!("🏦 Accounts");
    println!("   ─────────────────────────────────────────────");
    for account in accounts {
        println!(
            "   [{}] {} {}",
            account.id,
            account.name,
            account
                .bank_name
                .map(|b| format!("({})", b))
                .unwrap_or_default()
        );
    }

    Ok(())
}

pub fn cmd_accounts_add(db: &Database, name: &str, bank: Option<&str>) -> Result<()> {
    let account = db.create_account(LOCAL_USER, name, bank)?;
    println!("✅ Created account [{}] {}", account.id, account.name);
    Ok(())
}
