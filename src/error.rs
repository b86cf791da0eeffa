//! Error types for the Tapdata client and the CLI input checks.

use thiserror::Error;

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors raised while talking to the Tapdata service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (connect failure, timeout, ...)
    #[error("request failed ({kind}): {message}")]
    Transport {
        /// Short classification of the failure, e.g. `timeout`
        kind: String,
        message: String,
    },

    /// The service answered with a status other than 200
    #[error("HTTP status code {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not the JSON we expected
    #[error("failed to parse JSON response: {0}")]
    Parse(String),

    /// The response was JSON but lacked a required field
    #[error("unable to extract {field} from response: {body}")]
    MissingField { field: &'static str, body: String },

    /// Local file access failed
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn transport(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            "timeout"
        } else if err.is_connect() {
            "connect"
        } else if err.is_body() || err.is_decode() {
            "body"
        } else if err.is_builder() {
            "builder"
        } else {
            "request"
        };
        Self::transport(kind, err.to_string())
    }
}

/// Missing or invalid input, detected before any network call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("{0} parameter is empty")]
    Empty(&'static str),

    #[error("TAR file does not exist: {0}")]
    MissingFile(String),

    #[error("no access code configured (use --access-code, TAPDATA_ACCESS_CODE or the config file)")]
    MissingAccessCode,
}
