//! Account handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::{get_user_id, AppError, AppState};
use khata_core::models::Account;

/// Request body for creating an account
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,
    pub bank_name: Option<String>,
}

/// GET /api/accounts - List the user's accounts
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Account>>, AppError> {
    let user_id = get_user_id(&headers);
    let accounts = state.db.list_accounts(user_id)?;
    Ok(Json(accounts))
}

/// POST /api/accounts - Create an account
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateAccountRequest>,
) -> Result<Json<Account>, AppError> {
    let user_id = get_user_id(&headers);
    let account = state
        .db
        .create_account(user_id, &body.name, body.bank_name.as_deref())?;
    Ok(Json(account))
}

/// GET /api/accounts/:id - Get one account
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Account>, AppError> {
    let user_id = get_user_id(&headers);
    let account = state
        .db
        .get_account(user_id, id)?
        .ok_or_else(|| AppError::not_found(&format!("Account {} not found", id)))?;
    Ok(Json(account))
}
