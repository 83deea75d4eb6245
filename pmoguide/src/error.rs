//! Error types for the guide data layer
//!
//! Errors are split by concern:
//!
//! - [`DecodeError`]: one raw record could not become a typed entity
//! - [`TransportError`]: a batch exchange with upstream failed as a whole
//! - [`FetchError`]: what the orchestrator reports to its callers
//! - [`StateError`]: an entity was used before its lazy data was loaded
//!
//! [`GuideError`] aggregates all of them for callers that do not care which
//! layer failed.

use thiserror::Error;

/// Result type used by the higher level operations of this crate
pub type Result<T> = std::result::Result<T, GuideError>;

/// Failure to turn one raw record into a typed entity
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A required field is absent (or null)
    #[error("{entity}: missing required field '{field}'")]
    MissingField { entity: &'static str, field: String },

    /// A field is present but holds a value of the wrong shape
    #[error("{entity}: malformed field '{field}': {reason}")]
    MalformedField {
        entity: &'static str,
        field: String,
        reason: String,
    },

    /// The record references an owner other than the one supplied
    #[error("{entity}: record references '{found}' but owner is '{expected}'")]
    ReferentialMismatch {
        entity: &'static str,
        expected: String,
        found: String,
    },
}

impl DecodeError {
    pub fn missing(entity: &'static str, field: impl Into<String>) -> Self {
        Self::MissingField {
            entity,
            field: field.into(),
        }
    }

    pub fn malformed(
        entity: &'static str,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedField {
            entity,
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn mismatch(
        entity: &'static str,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::ReferentialMismatch {
            entity,
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Name of the entity kind being decoded when the error happened
    pub fn entity(&self) -> &'static str {
        match self {
            Self::MissingField { entity, .. }
            | Self::MalformedField { entity, .. }
            | Self::ReferentialMismatch { entity, .. } => entity,
        }
    }
}

/// Failure of a whole batch exchange
///
/// Every variant is fatal to the batch that produced it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No response was obtained (DNS, TCP, TLS, timeout...)
    #[error("Connectivity failure: {0}")]
    Connectivity(String),

    /// Upstream answered with a non-success HTTP status
    #[error("HTTP status {code}: {message}")]
    Status { code: u16, message: String },

    /// Upstream answered with a document carrying a non-zero response code
    #[error("Upstream API error (code {code}): {message}")]
    Api { code: i64, message: String },

    /// The response body is neither a JSON document nor a JSON line stream
    #[error("Invalid response body: {0}")]
    InvalidBody(String),
}

impl TransportError {
    /// Builds an error from a non-success HTTP status and its body
    pub fn from_status_code(code: u16, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }

    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::Connectivity(message.into())
    }

    /// Upstream response code carried by an `Api` error
    pub fn api_code(&self) -> Option<i64> {
        match self {
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }

    /// Always true: no part of a failed exchange is usable
    pub fn is_fatal(&self) -> bool {
        true
    }
}

/// Why one requested id did not resolve inside an otherwise successful batch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// Upstream answered for this id with a non-zero response code
    /// (e.g. 6001, program queued for generation)
    #[error("upstream refused (code {code}): {message}")]
    Upstream { code: i64, message: String },

    #[error("not returned by upstream")]
    NotReturned,

    /// An airing references a program that could not be resolved
    #[error("referenced program '{program_id}' is unavailable")]
    MissingProgram { program_id: String },
}

/// One entry of a batch failure manifest
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{id}: {reason}")]
pub struct PartialFailure {
    pub id: String,
    pub reason: FailureReason,
}

impl PartialFailure {
    pub fn new(id: impl Into<String>, reason: impl Into<FailureReason>) -> Self {
        Self {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// The decode error behind this failure, if it was a decode failure
    pub fn decode_error(&self) -> Option<&DecodeError> {
        match &self.reason {
            FailureReason::Decode(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors reported by the fetch orchestrator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The batch request itself failed; nothing from the batch is usable
    #[error("Batch request failed: {0}")]
    TransportFailure(#[from] TransportError),

    /// A single id did not resolve; batch callers find these in the manifest
    #[error("Partial decode failure: {0}")]
    PartialDecodeFailure(#[from] PartialFailure),
}

impl FetchError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::TransportFailure(_))
    }
}

/// Errors raised by entities whose data is loaded on demand
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Lineup '{lineup}' details are not loaded yet")]
    NotYetLoaded { lineup: String },
}

/// Any error produced by this crate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuideError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    State(#[from] StateError),
}

impl From<TransportError> for GuideError {
    fn from(err: TransportError) -> Self {
        Self::Fetch(FetchError::TransportFailure(err))
    }
}

impl From<PartialFailure> for GuideError {
    fn from(err: PartialFailure) -> Self {
        Self::Fetch(FetchError::PartialDecodeFailure(err))
    }
}
