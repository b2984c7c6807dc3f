//! Self-transfer handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::{get_user_id, AppError, AppState, SuccessResponse};
use khata_core::models::Transfer;
use khata_core::transfer::{DEFAULT_AMOUNT_TOLERANCE, DEFAULT_DAYS_WINDOW};
use khata_core::{TransferCandidate, TransferDetector};

/// GET /api/transfers - List the user's transfer links
pub async fn list_transfers(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Transfer>>, AppError> {
    let user_id = get_user_id(&headers);
    let transfers = state.db.list_transfers(user_id)?;
    Ok(Json(transfers))
}

/// Query params for transfer detection
#[derive(Debug, Deserialize)]
pub struct DetectTransfersQuery {
    pub days_window: Option<i64>,
    pub amount_tolerance: Option<f64>,
}

/// GET /api/transfers/detect - Score candidate pairs without linking
pub async fn detect_transfers(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<DetectTransfersQuery>,
) -> Result<Json<Vec<TransferCandidate>>, AppError> {
    let user_id = get_user_id(&headers);

    let days_window = query.days_window.unwrap_or(DEFAULT_DAYS_WINDOW);
    if days_window < 0 {
        return Err(AppError::bad_request("days_window cannot be negative"));
    }
    let amount_tolerance = query.amount_tolerance.unwrap_or(DEFAULT_AMOUNT_TOLERANCE);
    if !(0.0..=1.0).contains(&amount_tolerance) {
        return Err(AppError::bad_request(
            "amount_tolerance must be between 0 and 1",
        ));
    }

    let candidates =
        TransferDetector::new(&state.db).detect(user_id, days_window, amount_tolerance)?;
    Ok(Json(candidates))
}

/// Request body for linking a transfer
#[derive(Debug, Deserialize)]
pub struct CreateTransferRequest {
    pub debit_transaction_id: i64,
    pub credit_transaction_id: i64,
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub is_confirmed: bool,
}

/// POST /api/transfers - Link two transactions as a self-transfer
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateTransferRequest>,
) -> Result<Json<Transfer>, AppError> {
    let user_id = get_user_id(&headers);
    let transfer = state.db.create_transfer(
        user_id,
        body.debit_transaction_id,
        body.credit_transaction_id,
        body.confidence_score,
        body.is_confirmed,
    )?;
    Ok(Json(transfer))
}

/// DELETE /api/transfers/:id - Unlink a transfer, restoring both legs
pub async fn delete_transfer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    let user_id = get_user_id(&headers);
    state.db.delete_transfer(user_id, id)?;
    Ok(Json(SuccessResponse { success: true }))
}
