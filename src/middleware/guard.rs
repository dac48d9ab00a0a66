use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use super::auth::{session_token, AuthUser};
use crate::auth::validate_jwt;
use crate::identity::{AuthError, IdentityGateway};
use crate::navigation::Navigation;
use crate::server::AppState;

/// Runs the navigation guard for page routes.
///
/// A protected page resolves the caller from the bearer header or the
/// session cookie. Anonymous callers and unverifiable tokens are redirected
/// to the login page with `303 See Other`.
pub async fn navigation_guard_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let Some(route) = state.guard.routes().resolve(&path).cloned() else {
        return next.run(request).await;
    };

    let session = resolve_session(&state, &request);
    let outcome = state
        .guard
        .before_each(&route, || async move {
            match session {
                Ok(gateway) => gateway.current_identity_snapshot().await,
                Err(e) => Err(e),
            }
        })
        .await;

    match outcome {
        Navigation::Allowed { identity } => {
            if let Some(identity) = identity {
                request.extensions_mut().insert(AuthUser::from(identity));
            }
            next.run(request).await
        }
        Navigation::Redirected { to } => Redirect::to(to).into_response(),
    }
}

/// Per-request session: resumed from a verified token, otherwise signed out
fn resolve_session(state: &AppState, request: &Request) -> Result<IdentityGateway, AuthError> {
    match session_token(request.headers()) {
        Some(token) => Ok(state.gateway_for(validate_jwt(&token, &state.security)?)),
        None => Ok(state.gateway()),
    }
}
