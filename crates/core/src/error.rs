//! Centralized error types for the gymdesk workspace.

use thiserror::Error;

/// Top-level error enum. Variants map to failure classes, not crates.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GymError {
    /// The request never produced an HTTP response.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The silent refresh failed and the local session was cleared.
    #[error("Session expired")]
    SessionExpired,

    #[error("API error {status}: {detail}")]
    Api { status: u16, detail: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GymError {
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// 5xx responses.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status >= 500)
    }

    /// Text suitable for a toast or an inline banner.
    pub fn detail(&self) -> String {
        match self {
            Self::Api { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for GymError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

pub type GymResult<T> = Result<T, GymError>;
