//! Search error types for consult-search.

use consult_core::errors::ConsultError;

/// Errors from doctor search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Empty or whitespace-only search query.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Error from the libSQL database (candidate list).
    #[error("database error: {0}")]
    Database(#[from] consult_db::error::DatabaseError),
}

impl From<SearchError> for ConsultError {
    fn from(error: SearchError) -> Self {
        match error {
            SearchError::InvalidQuery(reason) => Self::Validation(reason),
            SearchError::Database(db) => db.into(),
        }
    }
}
