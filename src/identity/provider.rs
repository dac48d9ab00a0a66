use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

use super::password::{hash_password, verify_password};
use super::{AccountStore, AuthError, Identity, IdentityChanges, IdentityService};

const TRANSITION_BUFFER: usize = 16;

/// Email/password identity provider for a single session.
///
/// Current state lives in a `watch` channel; every sign-in and sign-out is
/// also sent on a `broadcast` channel so subscribers see each transition in
/// order.
pub struct PasswordIdentityService {
    accounts: Arc<dyn AccountStore>,
    min_password_length: usize,
    state: watch::Sender<Option<Identity>>,
    transitions: broadcast::Sender<Option<Identity>>,
}

impl PasswordIdentityService {
    /// New signed-out session
    pub fn new(accounts: Arc<dyn AccountStore>, min_password_length: usize) -> Self {
        Self::with_state(accounts, min_password_length, None)
    }

    /// Session resumed for an identity the caller already verified (e.g. from a token)
    pub fn resumed(accounts: Arc<dyn AccountStore>, min_password_length: usize, identity: Identity) -> Self {
        Self::with_state(accounts, min_password_length, Some(identity))
    }

    fn with_state(accounts: Arc<dyn AccountStore>, min_password_length: usize, initial: Option<Identity>) -> Self {
        let (state, _) = watch::channel(initial);
        let (transitions, _) = broadcast::channel(TRANSITION_BUFFER);
        Self {
            accounts,
            min_password_length,
            state,
            transitions,
        }
    }

    fn publish(&self, next: Option<Identity>) {
        match &next {
            Some(identity) => tracing::info!("Signed in: {} ({})", identity.email, identity.id),
            None => tracing::info!("Signed out"),
        }
        self.state.send_replace(next.clone());
        // No receivers is fine
        let _ = self.transitions.send(next);
    }

    fn validate_credentials(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let email = normalize_email(email)?;
        if password.chars().count() < self.min_password_length {
            return Err(AuthError::WeakPassword {
                min_length: self.min_password_length,
            });
        }
        Ok(email)
    }
}

#[async_trait]
impl IdentityService for PasswordIdentityService {
    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = self.validate_credentials(email, password)?;
        let password_hash = hash_password(password)?;

        let account = self.accounts.insert(&email, &password_hash).await?;
        let identity = account.identity();
        self.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn set_display_name(&self, identity: &Identity, name: &str) -> Result<Identity, AuthError> {
        let updated = self.accounts.set_display_name(&identity.id, name).await?.identity();

        // Profile edits refresh the session but are not sign-in transitions
        self.state.send_if_modified(|current| match current {
            Some(current) if current.id == updated.id => {
                *current = updated.clone();
                true
            }
            _ => false,
        });
        Ok(updated)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = normalize_email(email)?;
        let account = self
            .accounts
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AuthError::UserNotFound(email.clone()))?;

        if !verify_password(password, &account.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let identity = account.identity();
        self.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.state.borrow().is_some() {
            self.publish(None);
        }
        Ok(())
    }

    async fn on_change(&self) -> Result<IdentityChanges, AuthError> {
        // Subscribe before reading so no transition falls between the two
        let receiver = self.transitions.subscribe();
        let initial = self.state.borrow().clone();
        Ok(IdentityChanges { initial, receiver })
    }

    fn current(&self) -> Option<Identity> {
        self.state.borrow().clone()
    }
}

/// Trim and lowercase an email, rejecting anything not shaped `local@domain.tld`
pub fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    let invalid = || AuthError::InvalidEmail(email.clone());

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.rsplit_once('@').ok_or_else(invalid)?;
    if local.is_empty() || local.contains('@') {
        return Err(invalid());
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') || domain.contains("..") {
        return Err(invalid());
    }
    Ok(email)
}
