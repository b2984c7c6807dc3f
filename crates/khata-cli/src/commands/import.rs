//! JSON statement row import

use std::path::Path;

use anyhow::{Context, Result};
use khata_core::{Database, ImportRow, Importer};

use super::LOCAL_USER;

/// Import a JSON array of statement rows
///
/// `account_override` redirects every row to one account, which is handy
/// when the export tool does not know the ledger's account ids.
pub fn cmd_import(db: &Database, file: &Path, account_override: Option<i64>) -> Result<()> {
    println!("📥 Importing {}...", file.display());

    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let mut rows: Vec<ImportRow> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {} as a JSON row array", file.display()))?;

    if let Some(account_id) = account_override {
        for row in &mut rows {
            row.account_id = account_id;
        }
    }

    let importer = Importer::new(db)?;
    let summary = importer.import(LOCAL_USER, &rows)?;

    println!("✅ Import complete");
    println!("   Inserted:   {}", summary.inserted.len());
    println!("   Duplicates: {}", summary.skipped_duplicates);
    println!("   Invalid:    {}", summary.skipped_invalid);

    if summary.skipped_invalid > 0 {
        println!();
        println!("   Run with --verbose to see which rows were skipped.");
    }

    Ok(())
}
