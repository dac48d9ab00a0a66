//! Identity: who is signed in, and how to become someone else.
//!
//! [`IdentityService`] is the provider seam. One service instance backs one
//! caller session; nothing here reads ambient global auth state.
//! [`IdentityGateway`] is what the rest of the crate talks to.

pub mod accounts;
pub mod error;
pub mod gateway;
pub mod password;
pub mod provider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub use accounts::{Account, AccountStore, MemoryAccountStore, PgAccountStore};
pub use error::AuthError;
pub use gateway::{IdentityGateway, Subscription};
pub use provider::PasswordIdentityService;

/// Label used when an identity has neither display name nor email
pub const UNKNOWN_USER: &str = "Unknown User";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub display_name: Option<String>,
    pub email: String,
}

impl Identity {
    /// Display name, else email, else "Unknown User"
    pub fn label(&self) -> String {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .or_else(|| Some(self.email.trim()).filter(|email| !email.is_empty()))
            .unwrap_or(UNKNOWN_USER)
            .to_string()
    }
}

/// Identity state at subscription time plus every later sign-in/sign-out
/// transition, in the order the provider emitted them
pub struct IdentityChanges {
    pub initial: Option<Identity>,
    pub receiver: broadcast::Receiver<Option<Identity>>,
}

#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Create a credentialed account and sign the session in as it
    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn set_display_name(&self, identity: &Identity, name: &str) -> Result<Identity, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    async fn on_change(&self) -> Result<IdentityChanges, AuthError>;

    /// Synchronous best-effort view of the session
    fn current(&self) -> Option<Identity>;
}
