//! Error types and handling for Storefront Insights
//!
//! Data-quality gaps (missing join keys, prices, categories) are never errors;
//! they resolve to documented defaults inside the pipeline. What remains here
//! are configuration problems, broken collaborators and upstream failures.

use thiserror::Error;

/// Main result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Storefront Insights
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Envelope contract violations
    #[error("Envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    /// Acquisition (upstream source) errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal system errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O errors from std
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Prometheus metrics errors
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Contract errors raised while building or decoding an envelope.
///
/// These indicate a broken collaborator rather than bad data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// Entity type tag outside `product | transaction | user`
    #[error("Unknown entity type: {0}")]
    UnknownEntityType(String),

    /// Enveloped record without a payload
    #[error("Envelope for {entity_type} has no payload")]
    MissingPayload {
        /// Entity type of the offending record
        entity_type: String,
    },

    /// Raw item is not a JSON object
    #[error("Raw {entity_type} item is not a mapping (found {found})")]
    NotAMapping {
        /// Entity type the item was fetched as
        entity_type: String,
        /// JSON kind that was found instead
        found: &'static str,
    },

    /// Any other structural problem with an enveloped record
    #[error("Malformed envelope: {0}")]
    Malformed(String),
}

/// Upstream acquisition errors
#[derive(Error, Debug)]
pub enum SourceError {
    /// Transport or body decoding failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("{url} returned status {status}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Body parsed but did not have the expected shape
    #[error("Unexpected response shape from {url}: expected {expected}")]
    UnexpectedShape {
        /// Requested URL
        url: String,
        /// Description of the expected shape
        expected: String,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this is a client error (4xx equivalent)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_)
                | Error::Envelope(EnvelopeError::UnknownEntityType(_))
        )
    }

    /// Check if this is a server error (5xx equivalent)
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }
}
