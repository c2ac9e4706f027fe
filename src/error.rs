//! Error taxonomy shared by the gateways, the extraction adapter, and the
//! state manager.
//!
//! Every failure a FlashRead operation can produce falls into one of the
//! [`FlashError`] variants. The HTTP layer maps each variant to a status code
//! via [`FlashError::status_code`] and renders `{ "error": message }`.

use axum::http::StatusCode;

/// Result alias used throughout the library.
pub type Result<T, E = FlashError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlashError {
    /// A required field is missing or empty. Raised before any external call.
    #[error("{0}")]
    Validation(String),

    /// The credential for the selected provider path is missing.
    #[error("{0}")]
    Credential(String),

    /// An external dependency answered with a non-success status, an empty
    /// result, or a payload that could not be decoded.
    #[error("{message}")]
    Provider {
        /// Upstream HTTP status, when the failure came with one.
        status: Option<u16>,
        message: String,
    },

    /// The uploaded file's content type is not in the supported set.
    #[error("{0}")]
    UnsupportedFormat(String),

    /// The extraction library succeeded but produced no usable text.
    #[error("{0}")]
    Extraction(String),

    /// The durable key-value store could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),
}

impl FlashError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn credential(message: impl Into<String>) -> Self {
        Self::Credential(message.into())
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            status: None,
            message: message.into(),
        }
    }

    pub fn provider_status(status: u16, message: impl Into<String>) -> Self {
        Self::Provider {
            status: Some(status),
            message: message.into(),
        }
    }

    /// HTTP status used when this error crosses the server boundary.
    ///
    /// Provider errors reuse the upstream status when it is itself an error
    /// status; anything else becomes `502 Bad Gateway`.
    pub fn status_code(&self) -> StatusCode {
        match self {
            FlashError::Validation(_)
            | FlashError::Credential(_)
            | FlashError::UnsupportedFormat(_)
            | FlashError::Extraction(_) => StatusCode::BAD_REQUEST,
            FlashError::Provider { status, .. } => status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            FlashError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for FlashError {
    fn from(err: reqwest::Error) -> Self {
        FlashError::Provider {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for FlashError {
    fn from(err: serde_json::Error) -> Self {
        FlashError::Storage(err.to_string())
    }
}
