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
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /auth/login - Authenticate with email and password
///
/// Expected Input:
/// ```json
/// { "email": "ada@example.com", "password": "secret1" }
/// ```
///
/// Returns `{ token, expires_in, user }` and sets the session cookie.
/// Unknown email and wrong password both answer 401 with the same message.
pub async fn login_post(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;

    let identity = state.gateway().login(&request.email, &request.password).await?;
    let session = generate_jwt(&identity, &state.security)?;

    Ok(with_session_cookie(ApiResponse::success(SessionResponse::new(&identity, session))))
}
