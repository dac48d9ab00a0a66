use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use chrono::Utc;
use serde_json::Value;

use crate::api::format::entry_to_api_value;
use crate::error::ApiError;
use crate::journal::{EntryPatch, JournalError};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::server::AppState;

/// GET /api/entries/:id - Get a single entry by ID
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let entry = state
        .entries
        .get_by_id(Some(&user.identity), &id)
        .await?
        .ok_or(JournalError::NotFound(id))?;

    Ok(ApiResponse::success(entry_to_api_value(&entry, state.locale, Utc::now())))
}

/// PATCH /api/entries/:id - Merge title/body into an entry the caller owns
///
/// Returns the entry as stored after the merge.
pub async fn patch(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<EntryPatch>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(patch) = payload?;
    let caller = Some(&user.identity);

    state.entries.update(caller, &id, patch).await?;

    let entry = state
        .entries
        .get_by_id(caller, &id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Entry not found: {}", id)))?;

    Ok(ApiResponse::success(entry_to_api_value(&entry, state.locale, Utc::now())))
}

/// DELETE /api/entries/:id - Permanently delete an entry the caller owns
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.entries.delete(Some(&user.identity), &id).await?;
    Ok(ApiResponse::no_content())
}
