use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::api::format::{entries_to_api_value, entry_links};
use crate::journal::EntryContent;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::server::AppState;

/// GET /api/entries - Every entry in the journal, newest first
pub async fn get(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Vec<Value>> {
    let entries = state.entries.list_all(Some(&user.identity)).await?;
    Ok(ApiResponse::success(entries_to_api_value(&entries, state.locale, Utc::now())))
}

/// POST /api/entries - Create an entry owned by the caller
///
/// Accepts `{ "title": "...", "body": "..." }`. Owner and timestamp fields
/// are assigned here and rejected if supplied.
pub async fn post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<EntryContent>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(content) = payload?;
    let id = state.entries.create(Some(&user.identity), content).await?;

    Ok(ApiResponse::created(json!({ "id": id, "links": entry_links(&id) })))
}
