//! Store error mapping

use roadmap_core::StoreError;

/// Failure opening or migrating the database
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem error preparing the database directory
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub(crate) fn db_err(err: sqlx::Error) -> StoreError {
    match err.as_database_error() {
        Some(db) if db.is_unique_violation() => StoreError::Conflict(db.message().to_string()),
        _ => StoreError::Unavailable(err.to_string()),
    }
}

pub(crate) fn corrupt(what: &str, detail: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("{what}: {detail}"))
}
