//! Error types for the telemetry link.
//!
//! All errors implement the `std::error::Error` trait and carry structured
//! context. The supervisor consumes the classification methods to decide
//! between a budgeted restart and a terminal stop:
//!
//! - **Transport-transient** (connect failure, link I/O, declare failure):
//!   retryable, never propagates past the supervisor boundary.
//! - **Protocol-fatal** (`NoFlightSim`, an uncorrelatable response): surfaced
//!   immediately on the failure channel, never retried.
//! - **Decode-local** (a field conversion hit the wrong value kind): logged,
//!   the field keeps its zero value, never escapes the decoder.
//! - **Resource exhaustion** (retry budget at zero): terminal.
//!
//! ```rust
//! use airlink::LinkError;
//!
//! let error = LinkError::connect_failed("simulator not running");
//! assert!(error.is_retryable());
//!
//! let fatal = LinkError::no_flight_sim("flight simulator not found");
//! assert!(fatal.is_fatal());
//! ```

use std::time::Duration;
use thiserror::Error;

/// Result type alias for link operations.
pub type Result<T, E = LinkError> = std::result::Result<T, E>;

/// Main error type for the telemetry link.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LinkError {
    #[error("Failed to connect to simulator link: {reason}")]
    Connect {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Link I/O error during {context}")]
    Link {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Declare request rejected: {reason}")]
    Declare { reason: String },

    #[error("Protocol error in response to '{command}': {details}")]
    Protocol { command: String, details: String },

    #[error("No flight simulator available: {message}")]
    NoFlightSim { message: String },

    #[error("Conversion failed for field '{field}': {details}")]
    Conversion { field: String, details: String },

    #[error("Schema validation failed: {reason}")]
    Schema { reason: String },

    #[error("Session went stale after {idle:?} without an update")]
    Stale { idle: Duration },

    #[error("Retry budget exhausted after {tries} failed sessions")]
    RetriesExhausted { tries: u32 },

    #[error("Supervised task failed: {reason}")]
    TaskFailed { reason: String },
}

impl LinkError {
    /// Returns whether this error should trigger a budgeted session restart.
    pub fn is_retryable(&self) -> bool {
        match self {
            LinkError::Connect { .. } => true,
            LinkError::Link { .. } => true,
            LinkError::Declare { .. } => true,
            LinkError::Stale { .. } => true,
            LinkError::Conversion { .. } => false,
            LinkError::Protocol { .. } => false,
            LinkError::NoFlightSim { .. } => false,
            LinkError::Schema { .. } => false,
            LinkError::RetriesExhausted { .. } => false,
            LinkError::TaskFailed { .. } => false,
        }
    }

    /// Returns whether this error ends the supervisor permanently.
    ///
    /// Fatal errors are surfaced to the owner through the failure channel;
    /// everything else is absorbed by the retry policy.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LinkError::Protocol { .. }
                | LinkError::NoFlightSim { .. }
                | LinkError::Schema { .. }
                | LinkError::RetriesExhausted { .. }
                | LinkError::TaskFailed { .. }
        )
    }

    /// Helper constructor for connect failures.
    pub fn connect_failed(reason: impl Into<String>) -> Self {
        LinkError::Connect { reason: reason.into(), source: None }
    }

    /// Helper constructor for connect failures with an underlying cause.
    pub fn connect_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        LinkError::Connect { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for link I/O errors.
    pub fn link(
        context: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        LinkError::Link { context: context.into(), source }
    }

    /// Helper constructor for rejected declare requests.
    pub fn declare(reason: impl Into<String>) -> Self {
        LinkError::Declare { reason: reason.into() }
    }

    /// Helper constructor for uncorrelatable or malformed responses.
    pub fn protocol(command: impl Into<String>, details: impl Into<String>) -> Self {
        LinkError::Protocol { command: command.into(), details: details.into() }
    }

    /// Helper constructor for the simulator-absent condition.
    pub fn no_flight_sim(message: impl Into<String>) -> Self {
        LinkError::NoFlightSim { message: message.into() }
    }

    /// Helper constructor for per-field conversion failures.
    pub fn conversion(field: impl Into<String>, details: impl Into<String>) -> Self {
        LinkError::Conversion { field: field.into(), details: details.into() }
    }

    /// Helper constructor for schema validation failures.
    pub fn schema(reason: impl Into<String>) -> Self {
        LinkError::Schema { reason: reason.into() }
    }
}

impl From<std::io::Error> for LinkError {
    fn from(err: std::io::Error) -> Self {
        LinkError::Link { context: "socket".to_string(), source: Some(Box::new(err)) }
    }
}
