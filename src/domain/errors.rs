//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Request timed out after {millis} ms")]
    Timeout { millis: u64 },

    #[error("Parse error: {0}")]
    Parse(String),

    /// Payload parsed but does not have the expected shape.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// A single record could not be converted into an event.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Caller passed an argument that can never be valid (e.g. an empty course URL).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("UI error: {0}")]
    Ui(String),
}

impl DomainError {
    /// True for failures of the transport itself (network, status, timeout).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            DomainError::Http(_) | DomainError::HttpStatus { .. } | DomainError::Timeout { .. }
        )
    }
}
