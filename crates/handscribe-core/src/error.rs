//! Common error type definitions.

use strum::{AsRefStr, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categories of errors produced by the recognition pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Input file is missing, empty or unreadable.
    FileAccess,
    /// Connection failure, timeout or proxy failure.
    Transport,
    /// Missing or rejected credentials, or invalid configuration.
    AuthOrConfig,
    /// The remote service answered with a non-success status or an error object.
    RemoteService,
    /// The response body could not be decoded.
    Parse,
    /// The remote service answered successfully but produced no text.
    EmptyResult,
    /// Caller supplied an unusable value.
    InvalidInput,
    /// The operation was cancelled by the caller.
    Cancelled,
}

/// A structured error type for handscribe operations.
#[derive(Debug, Error)]
#[error("{kind:?}{}", message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional error message.
    pub message: Option<String>,
    /// HTTP status code of the failed response, if any.
    pub status: Option<u16>,
    /// Optional source error.
    #[source]
    pub source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            status: None,
            source: None,
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attaches the HTTP status code of the failed response.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Adds a source error to this error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Creates a new file access error.
    pub fn file_access() -> Self {
        Self::new(ErrorKind::FileAccess)
    }

    /// Creates a new transport error.
    pub fn transport() -> Self {
        Self::new(ErrorKind::Transport)
    }

    /// Creates a new authentication or configuration error.
    pub fn auth_or_config() -> Self {
        Self::new(ErrorKind::AuthOrConfig)
    }

    /// Creates a new remote service error.
    pub fn remote_service() -> Self {
        Self::new(ErrorKind::RemoteService)
    }

    /// Creates a new parse error.
    pub fn parse() -> Self {
        Self::new(ErrorKind::Parse)
    }

    /// Creates a new empty result error.
    pub fn empty_result() -> Self {
        Self::new(ErrorKind::EmptyResult)
    }

    /// Creates a new invalid input error.
    pub fn invalid_input() -> Self {
        Self::new(ErrorKind::InvalidInput)
    }

    /// Creates a new cancellation error.
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled).with_message("operation cancelled")
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error kind as a string.
    pub fn kind_str(&self) -> &'static str {
        self.kind.into()
    }

    /// Returns the attached message, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the HTTP status code, if any.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns true if the error was caused by cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }
}
