//! Session error taxonomy.

use std::collections::BTreeMap;
use storefront_api::ApiError;
use thiserror::Error;

/// Errors surfaced to the view layer by session operations.
///
/// Best-effort operations (`fetch_profile`, `refresh_access_token`) never
/// return these; they log and degrade instead.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Bad credentials, or an expired/invalid token
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The server rejected field-level input
    #[error("Validation rejected for fields: {}", fields.keys().cloned().collect::<Vec<_>>().join(", "))]
    Validation {
        fields: BTreeMap<String, Vec<String>>,
    },

    /// Transport failure or unexpected server answer
    #[error("Network error: {0}")]
    Network(ApiError),

    /// Persistent store failure
    #[error("Storage error: {0}")]
    Storage(#[from] storefront_storage::StorageError),
}

impl SessionError {
    /// Map a login failure. A 400 or 401 from the token endpoint means the
    /// credentials were not accepted; anything else is a network problem.
    pub(crate) fn from_login(error: ApiError) -> Self {
        match error.status() {
            Some(400) | Some(401) => {
                SessionError::InvalidCredentials(error.to_string())
            }
            _ => SessionError::Network(error),
        }
    }

    /// Map a registration or profile-update failure, surfacing field-level
    /// rejections when the server provided them.
    pub(crate) fn from_submission(error: ApiError) -> Self {
        if let Some(fields) = error.field_errors() {
            return SessionError::Validation { fields };
        }
        SessionError::Network(error)
    }
}

/// Result type alias using SessionError.
pub type SessionResult<T> = Result<T, SessionError>;
