//! Cross-cutting error types for Consult.
//!
//! `ConsultError` is the taxonomy every coordinator operation reports to its
//! caller. Storage errors (`DatabaseError`) are defined in `consult-db` and
//! convert into [`ConsultError::Unexpected`].

use thiserror::Error;

/// Errors surfaced by the consultation coordinator and the doctor search.
#[derive(Debug, Error)]
pub enum ConsultError {
    /// Empty or malformed input (message, invitee list, reply text, query).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown consultation, patient or doctor, or a caller who is not a
    /// participant of the consultation.
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    /// Persistence or transport failure. Never shown verbatim to clients.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl ConsultError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Whether the error describes a client mistake rather than a fault.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound { .. })
    }
}
