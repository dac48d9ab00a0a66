pub mod auth;
pub mod guard;
pub mod response;

pub use auth::{jwt_auth_middleware, AuthUser, SESSION_COOKIE};
pub use guard::navigation_guard_middleware;
pub use response::{ApiResponse, ApiResult};
