use axum::{
    extract::State,
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse, Response},
    Extension,
};
use serde_json::{json, Value};

use crate::api::format::identity_to_api_value;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, SESSION_COOKIE};
use crate::server::AppState;

/// GET /api/auth/whoami - Identity the bearer token was issued for
pub async fn whoami(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Value> {
    let identity = state
        .gateway_for(user.identity)
        .current_identity_snapshot()
        .await?
        .ok_or_else(|| ApiError::unauthorized("Not signed in"))?;

    Ok(ApiResponse::success(identity_to_api_value(&identity)))
}

/// DELETE /api/auth/session - Sign out
///
/// Tokens are stateless, so this ends the request's session and clears the
/// page-route cookie. The bearer token itself stays valid until it expires.
pub async fn logout(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> Result<Response, ApiError> {
    let id = user.identity.id.clone();
    state.gateway_for(user.identity).logout().await?;
    tracing::info!("Session ended for {}", id);

    let cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE);
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        ApiResponse::success(json!({ "signed_out": true })),
    )
        .into_response())
}
