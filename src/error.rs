//! Error taxonomy shared by the dispatch bus and every handler routed through it.
//!
//! Handlers classify their failures with an [`ErrorKind`]; the bus passes the
//! resulting [`BusError`] back to the caller untouched so the caller can match
//! on the kind and pick an outward status code.

use std::fmt;
use thiserror::Error;

/// A boxed, thread-safe error used as the optional cause of a [`BusError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The addressed alert, channel or dashboard does not exist.
    NotFound,
    /// The caller may not perform the operation.
    AccessDenied,
    /// The request itself is invalid.
    ValidationFailed,
    /// A uniqueness constraint (name, uid) was violated.
    Conflict,
    /// A required feature or setting is not available.
    PreconditionFailed,
    /// A message was dispatched with no handler bound to its type.
    NoHandlerRegistered,
    /// A second handler was registered for a message type.
    DuplicateHandlerRegistered,
    /// Anything else.
    UpstreamFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::AccessDenied => "access_denied",
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::Conflict => "conflict",
            ErrorKind::PreconditionFailed => "precondition_failed",
            ErrorKind::NoHandlerRegistered => "no_handler_registered",
            ErrorKind::DuplicateHandlerRegistered => "duplicate_handler_registered",
            ErrorKind::UpstreamFailure => "upstream_failure",
        }
    }

    /// The default outward status code for this kind.
    ///
    /// Individual operations may pick a different code for the same kind
    /// (e.g. a malformed notification test is a 400, not a 422).
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::AccessDenied => 403,
            ErrorKind::ValidationFailed => 422,
            ErrorKind::Conflict => 409,
            ErrorKind::PreconditionFailed => 412,
            ErrorKind::NoHandlerRegistered
            | ErrorKind::DuplicateHandlerRegistered
            | ErrorKind::UpstreamFailure => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The cause attached to errors raised by a cancelled or expired dispatch
/// context.
#[derive(Debug, Error)]
#[error("dispatch context cancelled or past its deadline")]
pub struct Cancelled;

/// An error produced by a handler or by the bus itself.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct BusError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl BusError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AccessDenied, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationFailed, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PreconditionFailed, message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamFailure, message)
    }

    /// The caller went away. Kept as an upstream failure for the status code;
    /// use [`BusError::is_cancelled`] to tell it apart from a storage error.
    pub fn cancelled() -> Self {
        Self::upstream("request cancelled").with_source(Cancelled)
    }

    /// Attaches the underlying cause, e.g. a storage driver error.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    pub fn is_cancelled(&self) -> bool {
        self.source
            .as_ref()
            .is_some_and(|source| source.is::<Cancelled>())
    }
}
