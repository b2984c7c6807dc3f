//! Khata Web Server
//!
//! Axum-based REST API over `khata-core`. The server is a thin layer: every
//! endpoint maps to a core operation and every core error maps to an HTTP
//! status. Requests select a user with the `x-user-id` header (default 1,
//! the seeded local user); there is no authentication layer, this is meant
//! to sit on localhost or behind one.

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use khata_core::{Database, HttpSuggester, MerchantSuggester};

mod handlers;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Header selecting the acting user
const USER_ID_HEADER: &str = "x-user-id";

/// Server configuration
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    /// Optional merchant suggestion backend for post-import refinement
    pub suggester: Option<Box<dyn MerchantSuggester>>,
}

/// Resolve the acting user from request headers
///
/// Falls back to the seeded local user on a missing or unparseable header.
pub fn get_user_id(headers: &axum::http::HeaderMap) -> i64 {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(1)
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(db: Database, config: ServerConfig) -> Router {
    let suggester: Option<Box<dyn MerchantSuggester>> = match HttpSuggester::from_env() {
        Some(s) => {
            info!(host = s.host(), "Merchant suggestion backend configured");
            Some(Box::new(s))
        }
        None => None,
    };
    create_router_with_suggester(db, config, suggester)
}

/// Create the application router with an explicit suggestion backend
/// (for testing)
pub fn create_router_with_suggester(
    db: Database,
    config: ServerConfig,
    suggester: Option<Box<dyn MerchantSuggester>>,
) -> Router {
    let state = Arc::new(AppState { db, suggester });

    let api_routes = Router::new()
        // Accounts
        .route(
            "/accounts",
            get(handlers::list_accounts).post(handlers::create_account),
        )
        .route("/accounts/:id", get(handlers::get_account))
        // Import
        .route("/import", post(handlers::import_rows))
        // Transactions
        .route("/transactions", get(handlers::list_transactions))
        .route(
            "/transactions/:id",
            get(handlers::get_transaction).delete(handlers::delete_transaction),
        )
        // Merchant rules
        .route(
            "/merchants",
            get(handlers::list_merchant_rules).post(handlers::create_merchant_rule),
        )
        .route(
            "/merchants/:id",
            get(handlers::get_merchant_rule)
                .put(handlers::update_merchant_rule)
                .delete(handlers::delete_merchant_rule),
        )
        .route("/merchants/:id/apply", post(handlers::apply_merchant_rule))
        .route("/merchants/match", get(handlers::match_merchant))
        // Recurring payments
        .route("/recurring", get(handlers::recurring_report))
        .route("/recurring/confirm", post(handlers::confirm_recurring))
        .route("/recurring/dismiss", post(handlers::dismiss_recurring))
        .route("/recurring/:id", delete(handlers::delete_recurring_rule))
        // Transfers
        .route(
            "/transfers",
            get(handlers::list_transfers).post(handlers::create_transfer),
        )
        .route("/transfers/detect", get(handlers::detect_transfers))
        .route("/transfers/:id", delete(handlers::delete_transfer));

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE])
    };

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Start the server
pub async fn serve(db: Database, host: &str, port: u16, config: ServerConfig) -> anyhow::Result<()> {
    let app = create_router(db, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn conflict(msg: &str) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl From<khata_core::Error> for AppError {
    fn from(err: khata_core::Error) -> Self {
        use khata_core::Error;
        match err {
            Error::NotFound(msg) => Self::not_found(&msg),
            Error::Conflict(msg) => Self::conflict(&msg),
            Error::InvalidData(msg) => Self::bad_request(&msg),
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                // Return generic message to client
                message: "An internal error occurred".to_string(),
                // Keep full error for logging
                internal: Some(other.into()),
            },
        }
    }
}

#[cfg(test)]
mod tests;
