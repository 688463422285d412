//! Domain error taxonomy.
//!
//! Every failure that can leave the generation pipeline is a
//! [`GenerationError`].  Each variant describes itself through
//! [`GenerationError::kind`] and [`GenerationError::code`] so the HTTP layer
//! can map them uniformly instead of special-casing endpoints.

use std::fmt;

use thiserror::Error;

use crate::descriptors::OperationMode;
use crate::provider::ProviderError;
use crate::storage::StorageError;

/// A single rejected request field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Coarse classification driving the externally visible status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    QuotaExceeded,
    Upstream,
    NotFound,
    UnsupportedMode,
    Internal,
}

/// All errors surfaced by the generation pipeline and its collaborators.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Malformed or missing request fields.
    #[error("{}", join_fields(.0))]
    Validation(Vec<FieldError>),

    /// The provider rate-limited the call.
    #[error("API rate limit exceeded. Try again in {retry_after_secs} seconds.")]
    QuotaExceeded { retry_after_secs: u64 },

    /// Provider 4xx/5xx, timeout or malformed response.
    #[error("upstream provider error: {0}")]
    Upstream(String),

    /// The referenced image has no record or no stored file.
    #[error("Image not found: {0}")]
    NotFound(String),

    /// No strategy is registered for the requested mode.
    #[error("No strategy registered for mode: {0}")]
    UnsupportedMode(OperationMode),

    /// Any other failure, including persistence after a successful call.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GenerationError {
    /// Shorthand for a single-field validation failure.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        GenerationError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationError::Validation(_) => ErrorKind::Validation,
            GenerationError::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            GenerationError::Upstream(_) => ErrorKind::Upstream,
            GenerationError::NotFound(_) => ErrorKind::NotFound,
            GenerationError::UnsupportedMode(_) => ErrorKind::UnsupportedMode,
            GenerationError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::QuotaExceeded => "QUOTA_EXCEEDED",
            ErrorKind::Upstream => "UPSTREAM_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::UnsupportedMode => "UNSUPPORTED_MODE",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }

    /// Retry hint in seconds; only quota errors carry one.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            GenerationError::QuotaExceeded { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }
}

fn join_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<ProviderError> for GenerationError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::QuotaExceeded { retry_after_secs } => {
                GenerationError::QuotaExceeded { retry_after_secs }
            }
            // Misconfiguration is ours to fix, not the provider's.
            ProviderError::Config(message) => GenerationError::Internal(message),
            other => GenerationError::Upstream(other.to_string()),
        }
    }
}

impl From<StorageError> for GenerationError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(id) => GenerationError::NotFound(id),
            other => GenerationError::Internal(other.to_string()),
        }
    }
}
