use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AuthError, Identity};
use crate::database::DatabaseManager;

/// Credentialed account as persisted by an [`AccountStore`]
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
}

impl Account {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id.to_string(),
            display_name: self.display_name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Account persistence behind the password identity service.
/// Emails arrive already normalized (trimmed, lowercase).
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fails with `EmailAlreadyInUse` when the email is taken
    async fn insert(&self, email: &str, password_hash: &str) -> Result<Account, AuthError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AuthError>;

    /// Fails with `UserNotFound` when no account has this id
    async fn set_display_name(&self, id: &str, name: &str) -> Result<Account, AuthError>;
}

#[derive(Clone, Default)]
pub struct MemoryAccountStore {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn insert(&self, email: &str, password_hash: &str) -> Result<Account, AuthError> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(email) {
            return Err(AuthError::EmailAlreadyInUse(email.to_string()));
        }

        let account = Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            display_name: None,
        };
        accounts.insert(email.to_string(), account.clone());
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AuthError> {
        Ok(self.accounts.read().await.get(email).cloned())
    }

    async fn set_display_name(&self, id: &str, name: &str) -> Result<Account, AuthError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .values_mut()
            .find(|a| a.id.to_string() == id)
            .ok_or_else(|| AuthError::UserNotFound(id.to_string()))?;

        account.display_name = Some(name.to_string());
        Ok(account.clone())
    }
}

/// Accounts kept in the `accounts` table
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(db: &DatabaseManager) -> Self {
        Self { pool: db.pool().clone() }
    }

    fn row_to_account(row: &sqlx::postgres::PgRow) -> Result<Account, sqlx::Error> {
        Ok(Account {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            display_name: row.try_get("display_name")?,
        })
    }
}

fn unavailable(err: sqlx::Error) -> AuthError {
    tracing::error!("Account store error: {}", err);
    AuthError::Unavailable("account store error".to_string())
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn insert(&self, email: &str, password_hash: &str) -> Result<Account, AuthError> {
        let row = sqlx::query(
            r#"
            INSERT INTO accounts (id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, display_name
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return AuthError::EmailAlreadyInUse(email.to_string());
                }
            }
            unavailable(e)
        })?;

        Self::row_to_account(&row).map_err(unavailable)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AuthError> {
        let row = sqlx::query("SELECT id, email, password_hash, display_name FROM accounts WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;

        row.as_ref()
            .map(Self::row_to_account)
            .transpose()
            .map_err(unavailable)
    }

    async fn set_display_name(&self, id: &str, name: &str) -> Result<Account, AuthError> {
        let uuid = Uuid::parse_str(id).map_err(|_| AuthError::UserNotFound(id.to_string()))?;

        let row = sqlx::query(
            r#"
            UPDATE accounts SET display_name = $2, updated_at = now()
            WHERE id = $1
            RETURNING id, email, password_hash, display_name
            "#,
        )
        .bind(uuid)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?
        .ok_or_else(|| AuthError::UserNotFound(id.to_string()))?;

        Self::row_to_account(&row).map_err(unavailable)
    }
}
