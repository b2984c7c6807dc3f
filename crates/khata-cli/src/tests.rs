//! CLI command tests

use std::io::Write;

use khata_core::Database;

use crate::commands::{self, truncate, LOCAL_USER};

fn setup_test_db() -> Database {
    Database::in_memory().unwrap()
}

fn write_rows_file(rows: &serde_json::Value) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(rows.to_string().as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

// ========== Account Command Tests ==========

#[test]
fn test_cmd_accounts_add_and_list() {
    let db = setup_test_db();

    commands::cmd_accounts_add(&db, "HDFC Savings", Some("HDFC")).unwrap();
    assert!(commands::cmd_accounts_list(&db).is_ok());

    let accounts = db.list_accounts(LOCAL_USER).unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].bank_name.as_deref(), Some("HDFC"));
}

// ========== Import Command Tests ==========

#[test]
fn test_cmd_import_from_json_file() {
    let db = setup_test_db();
    let account = db.create_account(LOCAL_USER, "HDFC Savings", None).unwrap();

    let file = write_rows_file(&serde_json::json!([
        { "date": "2024-03-01", "amount": -120.5, "description": "UPI/SWIGGY/123", "account_id": account.id },
        { "date": "2024-03-02", "amount": -899.0, "description": "AMZN MKTP IN", "account_id": account.id },
    ]));

    commands::cmd_import(&db, file.path(), None).unwrap();

    let transactions = db.list_transactions(LOCAL_USER, None, 50, 0).unwrap();
    assert_eq!(transactions.len(), 2);

    // Re-running the same file changes nothing
    commands::cmd_import(&db, file.path(), None).unwrap();
    assert_eq!(db.list_transactions(LOCAL_USER, None, 50, 0).unwrap().len(), 2);
}

#[test]
fn test_cmd_import_account_override() {
    let db = setup_test_db();
    let account = db.create_account(LOCAL_USER, "HDFC Savings", None).unwrap();

    // The file points at a bogus account; the override redirects it
    let file = write_rows_file(&serde_json::json!([
        { "date": "2024-03-01", "amount": -50.0, "description": "POS/COFFEE", "account_id": 9999 },
    ]));

    commands::cmd_import(&db, file.path(), Some(account.id)).unwrap();

    let transactions = db.list_transactions(LOCAL_USER, None, 50, 0).unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].account_id, account.id);
}

#[test]
fn test_cmd_import_rejects_bad_json() {
    let db = setup_test_db();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"not json").unwrap();
    file.flush().unwrap();

    assert!(commands::cmd_import(&db, file.path(), None).is_err());
}

// ========== Merchant Command Tests ==========

#[test]
fn test_cmd_merchants_add_apply_and_match() {
    let db = setup_test_db();
    let account = db.create_account(LOCAL_USER, "HDFC Savings", None).unwrap();

    let file = write_rows_file(&serde_json::json!([
        { "date": "2024-03-01", "amount": -899.0, "description": "AMZN MKTP IN", "account_id": account.id },
    ]));
    commands::cmd_import(&db, file.path(), None).unwrap();

    commands::cmd_merchants_add(
        &db,
        "Amazon Shopping",
        vec!["AMZN*".to_string()],
        Some("Shopping"),
        None,
    )
    .unwrap();
    let rule_id = db.list_merchant_rules(LOCAL_USER).unwrap()[0].id;

    commands::cmd_merchants_apply(&db, rule_id, true).unwrap();
    let tx = &db.list_transactions(LOCAL_USER, None, 10, 0).unwrap()[0];
    assert_eq!(tx.merchant_name.as_deref(), Some("Amazon Shopping"));
    assert_eq!(tx.category.as_deref(), Some("Shopping"));

    assert!(commands::cmd_merchants_match(&db, "AMZN MKTP IN").is_ok());
    commands::cmd_merchants_delete(&db, rule_id).unwrap();
    assert!(db.list_merchant_rules(LOCAL_USER).unwrap().is_empty());
}

// ========== Recurring Command Tests ==========

#[test]
fn test_cmd_recurring_confirm_flow() {
    let db = setup_test_db();
    let account = db.create_account(LOCAL_USER, "HDFC Savings", None).unwrap();

    let file = write_rows_file(&serde_json::json!([
        { "date": "2024-01-01", "amount": -649.0, "description": "NETFLIX", "account_id": account.id },
        { "date": "2024-02-01", "amount": -649.0, "description": "NETFLIX", "account_id": account.id },
        { "date": "2024-03-01", "amount": -649.0, "description": "NETFLIX", "account_id": account.id },
        { "date": "2024-04-01", "amount": -649.0, "description": "NETFLIX", "account_id": account.id },
    ]));
    commands::cmd_import(&db, file.path(), None).unwrap();

    assert!(commands::cmd_recurring_report(&db).is_ok());
    commands::cmd_recurring_confirm(&db, "Netflix").unwrap();

    let rules = db.list_recurring_rules(LOCAL_USER).unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(
        rules[0].status,
        khata_core::models::RecurringStatus::Confirmed
    );

    commands::cmd_recurring_delete(&db, rules[0].id).unwrap();
    assert!(db.list_recurring_rules(LOCAL_USER).unwrap().is_empty());
}

#[test]
fn test_cmd_recurring_confirm_unknown_merchant_fails() {
    let db = setup_test_db();
    assert!(commands::cmd_recurring_confirm(&db, "Nobody").is_err());
}

// ========== Transfer Command Tests ==========

#[test]
fn test_cmd_transfers_link_and_unlink() {
    let db = setup_test_db();
    let savings = db.create_account(LOCAL_USER, "HDFC Savings", None).unwrap();
    let current = db.create_account(LOCAL_USER, "ICICI Current", None).unwrap();

    let file = write_rows_file(&serde_json::json!([
        { "date": "2024-03-10", "amount": -25000.0, "description": "NEFT/SELF/ICICI", "account_id": savings.id },
        { "date": "2024-03-10", "amount": 25000.0, "description": "NEFT CREDIT FROM HDFC", "account_id": current.id },
    ]));
    commands::cmd_import(&db, file.path(), None).unwrap();

    assert!(commands::cmd_transfers_detect(&db, None, None).is_ok());

    let transactions = db.list_transactions(LOCAL_USER, None, 10, 0).unwrap();
    let debit = transactions.iter().find(|t| t.amount < 0.0).unwrap().id;
    let credit = transactions.iter().find(|t| t.amount > 0.0).unwrap().id;

    commands::cmd_transfers_link(&db, debit, credit).unwrap();
    assert_eq!(db.list_transfers(LOCAL_USER).unwrap().len(), 1);

    let transfer_id = db.list_transfers(LOCAL_USER).unwrap()[0].id;
    commands::cmd_transfers_unlink(&db, transfer_id).unwrap();
    assert!(db.list_transfers(LOCAL_USER).unwrap().is_empty());
}

// ========== Utility Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("exactly ten", 11), "exactly ten");
    assert_eq!(truncate("a longer string here", 10), "a longe...");
}

#[test]
fn test_truncate_multibyte() {
    // Devanagari merchant name; byte-offset slicing would panic here
    assert_eq!(truncate("शर्मा जनरल स्टोर्स", 8), "शर्मा...");
    assert_eq!(truncate("कैफ़े", 10), "कैफ़े");
}
