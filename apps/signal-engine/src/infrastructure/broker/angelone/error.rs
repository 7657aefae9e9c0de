//! AngelOne-specific error types.

use thiserror::Error;

use crate::application::ports::BrokerError;

/// Errors from the AngelOne adapter.
#[derive(Debug, Error, Clone)]
pub enum AngelOneError {
    /// The session token was rejected by the API.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The API envelope reported failure.
    #[error("api error {code}: {message}")]
    Api {
        /// AngelOne error code, e.g. `AB1007`.
        code: String,
        /// Error message from the envelope.
        message: String,
    },

    /// Non-success HTTP status with no parseable envelope.
    #[error("http status {status}")]
    Http {
        /// HTTP status code.
        status: u16,
    },

    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// Response body was not the expected JSON.
    #[error("json parse error: {0}")]
    JsonParse(String),

    /// A success envelope arrived without its data payload.
    #[error("missing data in success response")]
    MissingData,
}

// AngelOne token errors come back inside a 200 envelope; AG8XXX codes all
// mean the session is dead.
const AUTH_ERROR_PREFIX: &str = "AG8";

impl AngelOneError {
    /// Build from a failure envelope, classifying token errors.
    #[must_use]
    pub fn from_envelope(code: String, message: String) -> Self {
        if code.starts_with(AUTH_ERROR_PREFIX) {
            Self::Authentication(format!("{code}: {message}"))
        } else {
            Self::Api { code, message }
        }
    }
}

impl From<AngelOneError> for BrokerError {
    fn from(err: AngelOneError) -> Self {
        match err {
            AngelOneError::Authentication(_) => Self::Auth,
            AngelOneError::Api { code, message } => Self::Api { code, message },
            AngelOneError::Http { status } => Self::Http { status },
            AngelOneError::Network(message) => Self::Network(message),
            AngelOneError::JsonParse(message) => Self::JsonParse(message),
            AngelOneError::MissingData => {
                Self::JsonParse("missing data in success response".to_string())
            }
        }
    }
}
