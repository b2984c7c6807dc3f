//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

fn setup_test_app() -> (Database, Router) {
    let db = Database::in_memory().unwrap();
    let app = create_router_with_suggester(db.clone(), ServerConfig::default(), None);
    (db, app)
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn create_account(app: &Router, name: &str) -> i64 {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/accounts",
            serde_json::json!({ "name": name }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    get_body_json(response).await["id"].as_i64().unwrap()
}

fn import_row(date: &str, amount: f64, description: &str, account_id: i64) -> serde_json::Value {
    serde_json::json!({
        "date": date,
        "amount": amount,
        "description": description,
        "account_id": account_id,
    })
}

// ========== Account API Tests ==========

#[tokio::test]
async fn test_create_and_list_accounts() {
    let (_db, app) = setup_test_app();

    create_account(&app, "HDFC Savings").await;

    let response = app.oneshot(get_request("/api/accounts")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    let accounts = json.as_array().unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0]["name"], "HDFC Savings");
}

#[tokio::test]
async fn test_get_account_not_found() {
    let (_db, app) = setup_test_app();

    let response = app.oneshot(get_request("/api/accounts/999")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_empty_account_name_is_bad_request() {
    let (_db, app) = setup_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/accounts",
            serde_json::json!({ "name": "  " }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Import API Tests ==========

#[tokio::test]
async fn test_import_then_list_transactions() {
    let (_db, app) = setup_test_app();
    let account = create_account(&app, "HDFC Savings").await;

    let body = serde_json::json!({
        "rows": [
            import_row("2024-03-01", -120.50, "UPI/SWIGGY/12345", account),
            import_row("not-a-date", -10.0, "BAD ROW", account),
            import_row("2024-03-05", 55000.0, "NEFT/SALARY MARCH", account),
        ]
    });

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/import", body.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let summary = get_body_json(response).await;
    assert_eq!(summary["inserted"].as_array().unwrap().len(), 2);
    assert_eq!(summary["skipped_invalid"], 1);
    assert_eq!(summary["skipped_duplicates"], 0);

    // Re-importing the same batch is a no-op
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/import", body))
        .await
        .unwrap();
    let summary = get_body_json(response).await;
    assert_eq!(summary["inserted"].as_array().unwrap().len(), 0);
    assert_eq!(summary["skipped_duplicates"], 2);

    let response = app.oneshot(get_request("/api/transactions")).await.unwrap();
    let json = get_body_json(response).await;
    let transactions = json.as_array().unwrap();
    assert_eq!(transactions.len(), 2);
    // Newest first, enriched with merchant names
    assert_eq!(transactions[1]["merchant_name"], "Swiggy");
}

#[tokio::test]
async fn test_transactions_scoped_by_user_header() {
    let (_db, app) = setup_test_app();
    let account = create_account(&app, "HDFC Savings").await;

    let body = serde_json::json!({
        "rows": [import_row("2024-03-01", -100.0, "POS/GROCERY", account)]
    });
    app.clone()
        .oneshot(json_request("POST", "/api/import", body))
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/transactions")
                .header("x-user-id", "2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert!(json.as_array().unwrap().is_empty());
}

// ========== Merchant API Tests ==========

#[tokio::test]
async fn test_merchant_rule_match_endpoint() {
    let (_db, app) = setup_test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/merchants",
            serde_json::json!({
                "normalized_name": "Amazon",
                "patterns": ["AMZN*"],
                "category": "Shopping",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request("/api/merchants/match?description=AMZN%20MKTP%20IN"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["rule"]["normalized_name"], "Amazon");
    assert_eq!(json["score"], 1.0);

    // The glob is anchored, so a prefixed description misses
    let response = app
        .oneshot(get_request("/api/merchants/match?description=XAMZN%20MKTP"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert!(json.is_null());
}

#[tokio::test]
async fn test_duplicate_merchant_rule_is_conflict() {
    let (_db, app) = setup_test_app();

    let body = serde_json::json!({ "normalized_name": "Swiggy", "patterns": ["SWIGGY"] });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/merchants", body.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(json_request("POST", "/api/merchants", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_apply_merchant_rule_backfills() {
    let (_db, app) = setup_test_app();
    let account = create_account(&app, "HDFC Savings").await;

    // Import first, so the transactions predate the rule
    let body = serde_json::json!({
        "rows": [
            import_row("2024-03-01", -899.0, "AMZN MKTP IN", account),
            import_row("2024-03-02", -120.0, "UPI/SWIGGY/9876", account),
        ]
    });
    app.clone()
        .oneshot(json_request("POST", "/api/import", body))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/merchants",
            serde_json::json!({ "normalized_name": "Amazon Shopping", "patterns": ["AMZN*"] }),
        ))
        .await
        .unwrap();
    let rule_id = get_body_json(response).await["id"].as_i64().unwrap();

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/api/merchants/{}/apply", rule_id),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["updated"], 1);
}

// ========== Recurring API Tests ==========

#[tokio::test]
async fn test_recurring_report_confirm_and_dismiss() {
    let (_db, app) = setup_test_app();
    let account = create_account(&app, "HDFC Savings").await;

    let body = serde_json::json!({
        "rows": [
            import_row("2024-01-01", -649.0, "NETFLIX", account),
            import_row("2024-02-01", -649.0, "NETFLIX", account),
            import_row("2024-03-01", -649.0, "NETFLIX", account),
            import_row("2024-04-01", -649.0, "NETFLIX", account),
        ]
    });
    app.clone()
        .oneshot(json_request("POST", "/api/import", body))
        .await
        .unwrap();

    let response = app.clone().oneshot(get_request("/api/recurring")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report = get_body_json(response).await;
    let suggestions = report["suggestions"].as_array().unwrap();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0]["merchant_name"], "Netflix");
    assert_eq!(suggestions[0]["interval"], "monthly");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/recurring/confirm",
            serde_json::json!({ "merchant_name": "Netflix" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let rule = get_body_json(response).await;
    assert_eq!(rule["status"], "confirmed");

    let response = app.clone().oneshot(get_request("/api/recurring")).await.unwrap();
    let report = get_body_json(response).await;
    assert!(report["suggestions"].as_array().unwrap().is_empty());
    assert_eq!(report["confirmed"].as_array().unwrap().len(), 1);

    // Dismissing a merchant that was never suggested is a 404
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/recurring/dismiss",
            serde_json::json!({ "merchant_name": "Nobody" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Transfer API Tests ==========

#[tokio::test]
async fn test_transfer_detect_link_and_unlink() {
    let (_db, app) = setup_test_app();
    let savings = create_account(&app, "HDFC Savings").await;
    let current = create_account(&app, "ICICI Current").await;

    let body = serde_json::json!({
        "rows": [
            import_row("2024-03-10", -25000.0, "NEFT/SELF/ICICI", savings),
            import_row("2024-03-10", 25000.0, "NEFT CREDIT FROM HDFC", current),
        ]
    });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/import", body))
        .await
        .unwrap();
    let summary = get_body_json(response).await;
    let inserted = summary["inserted"].as_array().unwrap();
    let debit_id = inserted[0]["id"].as_i64().unwrap();
    let credit_id = inserted[1]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(get_request("/api/transfers/detect"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let candidates = get_body_json(response).await;
    assert_eq!(candidates.as_array().unwrap().len(), 1);

    let link_body = serde_json::json!({
        "debit_transaction_id": debit_id,
        "credit_transaction_id": credit_id,
        "confidence_score": 0.95,
        "is_confirmed": true,
    });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/transfers", link_body.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let transfer = get_body_json(response).await;
    assert_eq!(transfer["amount"], 25000.0);
    let transfer_id = transfer["id"].as_i64().unwrap();

    // Linked legs leave the candidate pool
    let response = app
        .clone()
        .oneshot(get_request("/api/transfers/detect"))
        .await
        .unwrap();
    let candidates = get_body_json(response).await;
    assert!(candidates.as_array().unwrap().is_empty());

    // Re-linking the same legs is a conflict
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/transfers", link_body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/transfers/{}", transfer_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_detect_rejects_bad_params() {
    let (_db, app) = setup_test_app();

    let response = app
        .clone()
        .oneshot(get_request("/api/transfers/detect?days_window=-1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(get_request("/api/transfers/detect?amount_tolerance=1.5"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_transaction_unwinds_transfer() {
    let (db, app) = setup_test_app();
    let savings = create_account(&app, "HDFC Savings").await;
    let current = create_account(&app, "ICICI Current").await;

    let body = serde_json::json!({
        "rows": [
            import_row("2024-03-10", -500.0, "TRF OUT", savings),
            import_row("2024-03-10", 500.0, "TRF IN", current),
        ]
    });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/import", body))
        .await
        .unwrap();
    let summary = get_body_json(response).await;
    let inserted = summary["inserted"].as_array().unwrap();
    let debit_id = inserted[0]["id"].as_i64().unwrap();
    let credit_id = inserted[1]["id"].as_i64().unwrap();

    db.create_transfer(1, debit_id, credit_id, None, true).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/transactions/{}", debit_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert!(db.list_transfers(1).unwrap().is_empty());
    let credit = db.get_transaction(1, credit_id).unwrap().unwrap();
    assert_eq!(credit.tx_type, khata_core::models::TransactionType::Income);
}
