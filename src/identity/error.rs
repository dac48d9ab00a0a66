use thiserror::Error;

/// Identity provider failures. Each reason is reported distinctly so forms
/// can show an accurate message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Password must be at least {min_length} characters")]
    WeakPassword { min_length: usize },

    #[error("Email already in use: {0}")]
    EmailAlreadyInUse(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("No account registered for {0}")]
    UserNotFound(String),

    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    /// Network partition, storage outage or any other provider-level failure
    #[error("Identity service unavailable: {0}")]
    Unavailable(String),
}
