//! Batch import handler

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, Json};
use serde::Deserialize;
use tracing::warn;

use crate::{get_user_id, AppError, AppState};
use khata_core::{ImportRow, ImportSummary, Importer};

/// Request body for a batch import
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub rows: Vec<ImportRow>,
}

/// POST /api/import - Import a batch of statement rows
///
/// Rows arrive already structured; file parsing happens client-side. When a
/// suggestion backend is configured, a best-effort refinement pass runs over
/// the inserted rows after import.
pub async fn import_rows(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ImportRequest>,
) -> Result<Json<ImportSummary>, AppError> {
    let user_id = get_user_id(&headers);

    let importer = Importer::new(&state.db)?;
    let summary = importer.import(user_id, &body.rows)?;

    if let Some(suggester) = &state.suggester {
        if let Err(e) =
            khata_core::ai::refine_merchants(&state.db, suggester.as_ref(), user_id, &summary.inserted)
                .await
        {
            warn!(error = %e, "Merchant refinement pass failed");
        }
    }

    Ok(Json(summary))
}
