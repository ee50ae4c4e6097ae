use thiserror::Error;

use crate::config::ValidationError;
use crate::resolver::ResolveError;
use crate::store::StoreError;
use crate::types::{
    ContextId,
    DomainId,
    MessageId,
    RecordId,
};

/// Errors returned by the selection engine
#[derive(Error, Debug)]
pub enum SharingError {
    /// Rejected before any store access
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Unknown context: {0}")]
    UnknownContext(ContextId),

    #[error("Unknown message: {0}")]
    UnknownMessage(MessageId),

    /// Record id unknown, or not visible from the context it was used with
    #[error("Record {0} not found in this context")]
    UnknownRecord(RecordId),

    /// Another writer kept winning the partition. Safe to retry.
    #[error("Concurrent update of {message} in domain '{domain}' (gave up after {attempts} attempts)")]
    Conflict { message: MessageId, domain: DomainId, attempts: u32 },

    /// Store-layer bug. Not retryable.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error(transparent)]
    Store(StoreError),
}

impl SharingError {
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<ResolveError> for SharingError {
    fn from(error: ResolveError) -> Self {
        match error {
            ResolveError::UnknownContext(context) => Self::UnknownContext(context),
            ResolveError::DuplicateContext(context) => {
                Self::InvariantViolation(format!("context '{context}' resolved twice"))
            }
        }
    }
}

impl From<StoreError> for SharingError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict { message, domain } => Self::Conflict { message, domain, attempts: 1 },
            StoreError::InvariantViolation(detail) => Self::InvariantViolation(detail),
            StoreError::UnknownRecord(id) => Self::UnknownRecord(id),
            other => Self::Store(other),
        }
    }
}
