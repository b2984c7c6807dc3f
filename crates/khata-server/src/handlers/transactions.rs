//! Transaction handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::{get_user_id, AppError, AppState, SuccessResponse, MAX_PAGE_LIMIT};
use khata_core::models::Transaction;

/// Query params for listing transactions
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// Filter by account ID
    pub account_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/transactions - List transactions, newest first
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let user_id = get_user_id(&headers);

    let limit = query.limit.unwrap_or(50).clamp(1, MAX_PAGE_LIMIT);
    let offset = query.offset.unwrap_or(0).max(0);

    let transactions = state
        .db
        .list_transactions(user_id, query.account_id, limit, offset)?;
    Ok(Json(transactions))
}

/// GET /api/transactions/:id - Get one transaction
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Transaction>, AppError> {
    let user_id = get_user_id(&headers);
    let transaction = state
        .db
        .get_transaction(user_id, id)?
        .ok_or_else(|| AppError::not_found(&format!("Transaction {} not found", id)))?;
    Ok(Json(transaction))
}

/// DELETE /api/transactions/:id - Delete a transaction
///
/// A transaction inside a transfer link takes the link down with it and the
/// counterpart leg gets its original type back.
pub async fn delete_transaction(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    let user_id = get_user_id(&headers);
    state.db.delete_transaction(user_id, id)?;
    Ok(Json(SuccessResponse { success: true }))
}
