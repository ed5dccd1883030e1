//! Error types for Roadmap Core
//!
//! Provides error handling for:
//! - Quota exhaustion
//! - Identity resolution (quota address, ownership header)
//! - External generation failures, by cause
//! - Input validation
//! - Store failures

use crate::identity::IdentityError;
use crate::types::Tool;
use roadmap_artifact::{FieldIssue, ProfileError};
use serde::Serialize;
use std::fmt;

/// Main core error type
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Usage limit reached for this (identity, tool)
    #[error("usage limit reached for {tool}: {count}/{limit}")]
    QuotaExceeded {
        /// Tool whose counter is full
        tool: Tool,
        /// Count observed when the request was refused
        count: u32,
        /// Configured limit
        limit: u32,
    },

    /// Caller identity could not be resolved
    #[error("identity unresolved: {0}")]
    IdentityUnresolved(#[from] IdentityError),

    /// External generation failed; counter untouched
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// Request input rejected
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Backing store failed
    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    /// Absent, or owned by someone else
    #[error("not found")]
    NotFound,
}

impl CoreError {
    /// Check if the caller can fix the request and try again
    #[inline]
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CoreError::Validation(_) | CoreError::IdentityUnresolved(_) | CoreError::NotFound
        )
    }
}

impl From<ProfileError> for CoreError {
    fn from(err: ProfileError) -> Self {
        CoreError::Validation(err.into())
    }
}

/// Invalid request fields, reported all at once
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", describe(.fields))]
pub struct ValidationError {
    /// Each rejected field with its reason
    pub fields: Vec<FieldIssue>,
}

impl ValidationError {
    /// Single-field validation error
    #[must_use]
    pub fn field(field: &'static str, reason: &'static str) -> Self {
        Self {
            fields: vec![FieldIssue::new(field, reason)],
        }
    }
}

impl From<ProfileError> for ValidationError {
    fn from(err: ProfileError) -> Self {
        Self {
            fields: err.issues().to_vec(),
        }
    }
}

fn describe(fields: &[FieldIssue]) -> String {
    fields
        .iter()
        .map(|f| format!("{} {}", f.field, f.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Store failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Store could not be reached or the operation failed
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Stored data could not be decoded
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// Write collided with an existing key
    #[error("conflicting record: {0}")]
    Conflict(String),
}

/// Why an external generation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GenerationCause {
    /// Provider account is out of quota
    Quota,
    /// Provider rejected our credentials
    Auth,
    /// Provider is throttling
    RateLimited,
    /// Generation exceeded the configured bound
    Timeout,
    /// Anything else, including unparsable responses
    Unexpected,
}

impl GenerationCause {
    /// Stable label for logs and metrics
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            GenerationCause::Quota => "quota",
            GenerationCause::Auth => "auth",
            GenerationCause::RateLimited => "rateLimited",
            GenerationCause::Timeout => "timeout",
            GenerationCause::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for GenerationCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External generation failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{cause}: {detail}")]
pub struct GenerationError {
    /// Failure class
    pub cause: GenerationCause,
    /// Provider detail; only surfaced to callers in development
    pub detail: String,
}

impl GenerationError {
    /// Create generation error
    #[must_use]
    pub fn new(cause: GenerationCause, detail: impl Into<String>) -> Self {
        Self {
            cause,
            detail: detail.into(),
        }
    }

    /// Unexpected failure
    #[must_use]
    pub fn unexpected(detail: impl Into<String>) -> Self {
        Self::new(GenerationCause::Unexpected, detail)
    }

    /// Generation ran past its bound
    #[must_use]
    pub fn timeout(after: std::time::Duration) -> Self {
        Self::new(
            GenerationCause::Timeout,
            format!("no response after {}s", after.as_secs()),
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CoreError>;
