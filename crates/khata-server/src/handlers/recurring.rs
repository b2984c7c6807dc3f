//! Recurring payment handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::{get_user_id, AppError, AppState, SuccessResponse};
use khata_core::models::RecurringRule;
use khata_core::{RecurringDetector, RecurringReport};

/// GET /api/recurring - Detection report merged with stored lifecycle state
pub async fn recurring_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<RecurringReport>, AppError> {
    let user_id = get_user_id(&headers);
    let report = RecurringDetector::new(&state.db).report(user_id)?;
    Ok(Json(report))
}

/// Request body selecting a suggested merchant
#[derive(Debug, Deserialize)]
pub struct RecurringActionRequest {
    pub merchant_name: String,
}

/// POST /api/recurring/confirm - Confirm a suggestion as a recurring rule
pub async fn confirm_recurring(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<RecurringActionRequest>,
) -> Result<Json<RecurringRule>, AppError> {
    let user_id = get_user_id(&headers);
    let rule = RecurringDetector::new(&state.db).confirm(user_id, &body.merchant_name)?;
    Ok(Json(rule))
}

/// POST /api/recurring/dismiss - Dismiss a suggestion
pub async fn dismiss_recurring(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<RecurringActionRequest>,
) -> Result<Json<RecurringRule>, AppError> {
    let user_id = get_user_id(&headers);
    let rule = RecurringDetector::new(&state.db).dismiss(user_id, &body.merchant_name)?;
    Ok(Json(rule))
}

/// DELETE /api/recurring/:id - Delete a rule, resetting the merchant's state
pub async fn delete_recurring_rule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    let user_id = get_user_id(&headers);
    state.db.delete_recurring_rule(user_id, id)?;
    Ok(Json(SuccessResponse { success: true }))
}
