use axum::{
    extract::{rejection::JsonRejection, State},
    response::Response,
    Json,
};
use serde::Deserialize;

use super::{with_session_cookie, SessionResponse};
use crate::auth::generate_jwt;
use crate::error::ApiError;
use crate::middleware::ApiResponse;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    /// Optional; blank leaves the account without a display name
    #[serde(default)]
    pub display_name: String,
}

/// POST /auth/register - Create an account and sign in as it
///
/// Expected Input:
/// ```json
/// { "email": "ada@example.com", "password": "secret1", "display_name": "Ada" }
/// ```
///
/// Answers 201 with `{ token, expires_in, user }`. Invalid email and weak
/// password are 400 with a field error, a taken email is 409.
pub async fn register_post(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;

    let identity = state
        .gateway()
        .register(&request.email, &request.password, &request.display_name)
        .await?;
    let session = generate_jwt(&identity, &state.security)?;

    Ok(with_session_cookie(ApiResponse::created(SessionResponse::new(&identity, session))))
}
