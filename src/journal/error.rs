use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("User must be logged in to {0}")]
    NotAuthenticated(&'static str),

    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("You do not have permission to {action} entry {id}")]
    Permission { action: &'static str, id: String },

    #[error("Entry {id} is missing required field '{field}'")]
    InvalidDocument { id: String, field: &'static str },

    #[error(transparent)]
    Store(#[from] StoreError),
}
