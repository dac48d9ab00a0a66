// Page routes. Each returns the view model the page renders; the
// navigation guard middleware has already run for protected pages.

use axum::{
    extract::{Path, State},
    Extension,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::api::format::{entries_to_api_value, entry_to_api_value, identity_to_api_value};
use crate::journal::JournalError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::server::AppState;

/// GET / - Journal home: the caller and every entry, newest first
pub async fn home(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Value> {
    let entries = state.entries.list_all(Some(&user.identity)).await?;

    Ok(ApiResponse::success(json!({
        "page": "home",
        "user": identity_to_api_value(&user.identity),
        "entries": entries_to_api_value(&entries, state.locale, Utc::now()),
        "links": { "new": "/new", "logout": "/api/auth/session" },
    })))
}

/// GET /login
pub async fn login() -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "page": "login",
        "form": { "action": "/auth/login", "fields": ["email", "password"] },
        "links": { "signup": "/signup" },
    })))
}

/// GET /signup
pub async fn signup() -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "page": "signup",
        "form": { "action": "/auth/register", "fields": ["email", "password", "display_name"] },
        "links": { "login": "/login" },
    })))
}

/// GET /entry/:id - One entry; edit and delete are offered only to its owner
pub async fn entry(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let entry = state
        .entries
        .get_by_id(Some(&user.identity), &id)
        .await?
        .ok_or(JournalError::NotFound(id))?;

    let actions: Vec<&str> = if entry.is_owned_by_current_user {
        vec!["edit", "delete"]
    } else {
        Vec::new()
    };

    Ok(ApiResponse::success(json!({
        "page": "entry",
        "entry": entry_to_api_value(&entry, state.locale, Utc::now()),
        "actions": actions,
        "links": { "home": "/" },
    })))
}

/// GET /new
pub async fn new_entry(Extension(user): Extension<AuthUser>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "page": "new",
        "user": identity_to_api_value(&user.identity),
        "form": { "action": "/api/entries", "fields": ["title", "body"] },
        "links": { "home": "/" },
    })))
}
