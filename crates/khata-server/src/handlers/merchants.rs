//! Merchant rule handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{get_user_id, AppError, AppState, SuccessResponse};
use khata_core::models::{MerchantRule, MerchantRuleUpdate, NewMerchantRule};
use khata_core::{MerchantMatch, MerchantMatcher};

/// GET /api/merchants - List the user's merchant rules
pub async fn list_merchant_rules(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<MerchantRule>>, AppError> {
    let user_id = get_user_id(&headers);
    let rules = state.db.list_merchant_rules(user_id)?;
    Ok(Json(rules))
}

/// POST /api/merchants - Create a merchant rule
pub async fn create_merchant_rule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewMerchantRule>,
) -> Result<Json<MerchantRule>, AppError> {
    let user_id = get_user_id(&headers);
    let rule = state.db.create_merchant_rule(user_id, &body)?;
    Ok(Json(rule))
}

/// GET /api/merchants/:id - Get one merchant rule
pub async fn get_merchant_rule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<MerchantRule>, AppError> {
    let user_id = get_user_id(&headers);
    let rule = state
        .db
        .get_merchant_rule(user_id, id)?
        .ok_or_else(|| AppError::not_found(&format!("Merchant rule {} not found", id)))?;
    Ok(Json(rule))
}

/// PUT /api/merchants/:id - Update a merchant rule
pub async fn update_merchant_rule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<MerchantRuleUpdate>,
) -> Result<Json<MerchantRule>, AppError> {
    let user_id = get_user_id(&headers);
    let rule = state.db.update_merchant_rule(user_id, id, &body)?;
    Ok(Json(rule))
}

/// DELETE /api/merchants/:id - Delete a merchant rule
pub async fn delete_merchant_rule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    let user_id = get_user_id(&headers);
    state.db.delete_merchant_rule(user_id, id)?;
    Ok(Json(SuccessResponse { success: true }))
}

/// Request body for applying a rule retroactively
#[derive(Debug, Default, Deserialize)]
pub struct ApplyRuleRequest {
    /// Also set the rule's category on transactions without one
    #[serde(default = "default_update_category")]
    pub update_category: bool,
}

fn default_update_category() -> bool {
    true
}

/// Response for applying a rule
#[derive(Serialize)]
pub struct ApplyRuleResponse {
    pub updated: usize,
}

/// POST /api/merchants/:id/apply - Apply a rule to existing transactions
///
/// Backfills the rule's merchant name onto unmapped transactions whose
/// descriptions hit one of the rule's exact patterns.
pub async fn apply_merchant_rule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    body: Option<Json<ApplyRuleRequest>>,
) -> Result<Json<ApplyRuleResponse>, AppError> {
    let user_id = get_user_id(&headers);
    let request = body.map(|Json(b)| b).unwrap_or_default();

    let matcher = MerchantMatcher::new(&state.db);
    let updated = matcher.apply_rule(user_id, id, request.update_category)?;
    Ok(Json(ApplyRuleResponse { updated }))
}

/// Query params for a dry-run match
#[derive(Debug, Deserialize)]
pub struct MatchQuery {
    pub description: String,
}

/// GET /api/merchants/match?description= - Dry-run the matcher
///
/// Returns the winning match or null; nothing is written.
pub async fn match_merchant(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<MatchQuery>,
) -> Result<Json<Option<MerchantMatch>>, AppError> {
    let user_id = get_user_id(&headers);
    let matcher = MerchantMatcher::new(&state.db);
    let result = matcher.find_match(user_id, &query.description)?;
    Ok(Json(result))
}
