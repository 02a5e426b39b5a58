//! API error types.

use std::collections::BTreeMap;
use thiserror::Error;

/// Error type for gateway calls.
///
/// Every failed call is tagged either with the HTTP status the server
/// answered with, or as a transport failure when no answer arrived.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport-level failure (connect, timeout, TLS)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status from the server
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body could not be decoded
    #[error("Response decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// HTTP status code of the server's answer, if one arrived.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            ApiError::Decode(_) => None,
        }
    }

    /// True for a 401 answer. The session manager treats this as
    /// "credential invalid" wherever it appears.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// True when the request never produced a server answer
    /// (connection refused, timeout, decode of a garbled body).
    pub fn is_network(&self) -> bool {
        match self {
            ApiError::Transport(e) => e.status().is_none(),
            ApiError::Decode(_) => true,
            ApiError::Status { .. } => false,
        }
    }

    /// Field-level validation messages out of a 400 body.
    ///
    /// The server rejects bad input with a JSON object mapping field names
    /// to either a message or a list of messages. Anything else yields None.
    pub fn field_errors(&self) -> Option<BTreeMap<String, Vec<String>>> {
        let ApiError::Status { status: 400, body } = self else {
            return None;
        };
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(body).ok()?;
        let mut fields = BTreeMap::new();
        for (name, value) in raw {
            match value {
                serde_json::Value::String(msg) => {
                    fields.insert(name, vec![msg]);
                }
                serde_json::Value::Array(items) => {
                    let msgs: Vec<String> = items
                        .into_iter()
                        .filter_map(|v| v.as_str().map(String::from))
                        .collect();
                    if !msgs.is_empty() {
                        fields.insert(name, msgs);
                    }
                }
                _ => {}
            }
        }
        if fields.is_empty() {
            None
        } else {
            Some(fields)
        }
    }
}

/// Result type alias using ApiError.
pub type ApiResult<T> = Result<T, ApiError>;
