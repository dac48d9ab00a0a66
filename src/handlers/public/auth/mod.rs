// Token acquisition endpoints that do not require authentication.

use axum::http::header::SET_COOKIE;
use axum::response::{AppendHeaders, IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;

use crate::api::format::identity_to_api_value;
use crate::auth::SessionToken;
use crate::identity::Identity;
use crate::middleware::{ApiResponse, SESSION_COOKIE};

pub mod login; // POST /auth/login - authenticate and get JWT
pub mod register; // POST /auth/register - create new account

pub use login::login_post;
pub use register::register_post;

/// Body returned by login and register
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub expires_in: i64,
    pub user: Value,
}

impl SessionResponse {
    pub fn new(identity: &Identity, session: SessionToken) -> Self {
        Self {
            token: session.token,
            expires_in: session.expires_in,
            user: identity_to_api_value(identity),
        }
    }
}

/// Wrap a session body and mirror the token into the page-route cookie
pub(crate) fn with_session_cookie(response: ApiResponse<SessionResponse>) -> Response {
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, response.data.token, response.data.expires_in
    );
    (AppendHeaders([(SET_COOKIE, cookie)]), response).into_response()
}
