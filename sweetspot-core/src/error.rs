//! Error types for the aggregation engine.
//!
//! Every variant is recoverable: the router drops the offending event,
//! reports it on the info channel and leaves aggregation state untouched.

use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while validating or applying an experiment event.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration tuple length does not match the declared parameters.
    #[error("schema mismatch: expected {expected} parameter values, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },

    /// Missing objective direction or malformed search-space description.
    #[error("configuration error: {0}")]
    Config(String),

    /// Observed value is outside the declared categorical set.
    #[error("value {value} is outside the domain of parameter `{parameter}`")]
    DomainViolation { parameter: String, value: String },

    /// Event body is missing the fields the event requires.
    #[error("empty payload: {0}")]
    EmptyPayload(String),

    /// Event body has the expected fields but an unusable shape.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Envelope names no known event.
    #[error("unknown event `{event}` (subtype {subtype:?})")]
    UnknownEvent {
        event: String,
        subtype: Option<String>,
    },

    /// Body text is not valid JSON.
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Stable label used as a structured log field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SchemaMismatch { .. } => "schema_mismatch",
            Self::Config(_) => "config_error",
            Self::DomainViolation { .. } => "domain_violation",
            Self::EmptyPayload(_) => "empty_payload",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::UnknownEvent { .. } => "unknown_event",
            Self::Json(_) => "invalid_json",
        }
    }
}
