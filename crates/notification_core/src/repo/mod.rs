//! Repository layer: store contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define the lookups this core needs from collaborators
//!   (`ActivityStore`, `AccountStore`, `NotificationRepository`).
//! - Keep SQL details out of the service layer.
//!
//! # Invariants
//! - Missing rows surface as `None` or as absent map entries, never as errors.
//! - Unknown `activity_type` tags abort the read with `UnknownActivityType`.
//! - Bulk lookups issue one query per table regardless of batch size.

use crate::db::DbError;
use crate::model::activity::UnknownActivityType;
use crate::model::notification::NotificationValidationError;
use thiserror::Error;

pub mod account_repo;
pub mod activity_repo;
pub mod notification_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for store reads and notification writes.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Validation(#[from] NotificationValidationError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
    #[error(transparent)]
    UnknownActivityType(#[from] UnknownActivityType),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// `?, ?, ?` list for an `IN (...)` clause with `count` binds.
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
