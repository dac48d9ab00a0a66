use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::validate_jwt;
use crate::error::ApiError;
use crate::identity::Identity;
use crate::server::AppState;

/// Cookie carrying the session token for page routes
pub const SESSION_COOKIE: &str = "journal_token";

/// Authenticated user context extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub identity: Identity,
}

impl From<Identity> for AuthUser {
    fn from(identity: Identity) -> Self {
        Self { identity }
    }
}

/// JWT authentication middleware that validates tokens and extracts user context
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    // Extract JWT from Authorization header
    let token = match extract_jwt_from_headers(&headers) {
        Ok(token) => token,
        Err(msg) => return ApiError::unauthorized(msg).into_response(),
    };

    // Validate and decode JWT
    let identity = match validate_jwt(&token, &state.security) {
        Ok(identity) => identity,
        Err(e) => {
            tracing::debug!("Rejected bearer token: {}", e);
            return ApiError::from(e).into_response();
        }
    };

    request.extensions_mut().insert(AuthUser::from(identity));

    next.run(request).await
}

/// Extract JWT token from Authorization header
pub(crate) fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

/// Session token from the bearer header, else the session cookie
pub(crate) fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Ok(token) = extract_jwt_from_headers(headers) {
        return Some(token);
    }

    headers
        .get_all("cookie")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
