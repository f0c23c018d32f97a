//! Error types for wrapper operations.
//!
//! This module defines the structured errors raised synchronously by the map and
//! array adapters, the normalizer and the identity cache. Every variant aborts only
//! the offending operation; none of them leave cache or tracking state half-updated.

use thiserror::Error;

/// Structured error types for wrapper operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProxyError {
    /// A write targeted a read-only or reserved property, or an invalid key
    #[error("Invalid mutation '{operation}': {reason}")]
    InvalidMutation { operation: String, reason: String },

    /// An index lies outside the ordered container
    #[error("Index {index} out of bounds for array of length {len}")]
    IndexOutOfBounds { index: u32, len: u32 },

    /// A value is not the kind of engine node the operation requires
    #[error("Type mismatch: expected {expected}, found {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// A container already owned by a document was offered for insertion
    #[error("Cross-document insertion rejected: {reason}")]
    CrossDocument { reason: String },

    /// The engine refused to open a transaction (another one is still active)
    #[error("Could not acquire engine transaction: {reason}")]
    Transaction { reason: String },

    /// Registering a document-level hook failed
    #[error("Failed to register document hook: {reason}")]
    Hook { reason: String },
}

impl ProxyError {
    pub(crate) fn invalid_mutation(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        ProxyError::InvalidMutation {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error rejected a mutation before it reached the engine
    pub fn is_invalid_mutation(&self) -> bool {
        matches!(
            self,
            ProxyError::InvalidMutation { .. } | ProxyError::IndexOutOfBounds { .. }
        )
    }

    /// Check if this error is related to type mismatches
    pub fn is_type_error(&self) -> bool {
        matches!(self, ProxyError::TypeMismatch { .. })
    }

    /// Check if this error came from inserting an already-integrated container
    pub fn is_cross_document(&self) -> bool {
        matches!(self, ProxyError::CrossDocument { .. })
    }

    /// Check if the engine was busy with another transaction
    pub fn is_transaction_error(&self) -> bool {
        matches!(self, ProxyError::Transaction { .. })
    }

    /// Check if a document-level hook could not be registered
    pub fn is_hook_error(&self) -> bool {
        matches!(self, ProxyError::Hook { .. })
    }

    /// Get the operation name if this is an invalid-mutation error
    pub fn operation(&self) -> Option<&str> {
        match self {
            ProxyError::InvalidMutation { operation, .. } => Some(operation),
            _ => None,
        }
    }
}

// Conversion from ProxyError to the main Error type
impl From<ProxyError> for crate::Error {
    fn from(err: ProxyError) -> Self {
        crate::Error::Proxy(err)
    }
}
