use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::SelectionField;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found")]
    NotFound,

    #[error("Selector (rank '{rank}', promoted on {promoted_on}) matches {matches} promotions")]
    AmbiguousSelector {
        rank: String,
        promoted_on: DateTime<Utc>,
        matches: usize,
    },

    #[error("Selection invalidated: {0} must be re-selected")]
    InvalidatedSelection(SelectionField),

    #[error("Concurrent modification, the record changed while it was being updated")]
    ConcurrentModification,

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    pub fn validation(msg: impl Into<String>) -> Self {
        StorageError::Validation(msg.into())
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            StorageError::Database(sqlx::Error::Database(e))
                if e.code().as_deref() == Some("23505")
        )
    }

    /// True for errors an interactive caller should answer with "please re-select"
    /// rather than an error message.
    pub fn is_reset_signal(&self) -> bool {
        matches!(self, StorageError::InvalidatedSelection(_))
    }
}

impl From<validator::ValidationErrors> for StorageError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    format!(
                        "{}: {}",
                        field,
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    )
                })
            })
            .collect();
        details.sort();

        StorageError::Validation(details.join("; "))
    }
}
