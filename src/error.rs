//! Error types for the Phoenix chat client.
//!
//! Every failure in this crate is recoverable: network and reply errors are
//! reported inline by the session, persistence errors are logged, and
//! malformed persisted state is replaced by defaults.

use std::error;
use std::fmt;
use std::io;
use std::sync::Arc;

/// The main error type for the Phoenix chat client.
#[derive(Clone, Debug)]
pub enum Error {
    /// Transport-level failure or a non-success status from the send boundary.
    NetworkFailure {
        /// Human-readable error message.
        message: String,
        /// HTTP status code, when the server answered.
        status_code: Option<u16>,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// The reply parsed but carried no usable text.
    EmptyReply {
        /// Human-readable error message.
        message: String,
    },

    /// A persisted value could not be read back.
    MalformedPersistedState {
        /// The key-value key that held the value.
        key: String,
        /// Human-readable error message.
        message: String,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// A state-changing command was issued while a send is in flight.
    Busy {
        /// Human-readable error message.
        message: String,
    },

    /// No conversation with the requested id.
    NotFound {
        /// Human-readable error message.
        message: String,
        /// The id that was looked up.
        id: String,
    },

    /// Input rejected before anything was sent or stored.
    Validation {
        /// Human-readable error message.
        message: String,
        /// Parameter that failed validation.
        param: Option<String>,
    },

    /// I/O error.
    Io {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Arc<io::Error>,
    },

    /// Error during JSON serialization or deserialization.
    Serialization {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a new network failure.
    pub fn network(
        message: impl Into<String>,
        status_code: Option<u16>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::NetworkFailure {
            message: message.into(),
            status_code,
            source: source.map(Arc::from),
        }
    }

    /// Creates a new empty-reply error.
    pub fn empty_reply(message: impl Into<String>) -> Self {
        Error::EmptyReply {
            message: message.into(),
        }
    }

    /// Creates a new malformed-persisted-state error.
    pub fn malformed_state(
        key: impl Into<String>,
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::MalformedPersistedState {
            key: key.into(),
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new busy error.
    pub fn busy(message: impl Into<String>) -> Self {
        Error::Busy {
            message: message.into(),
        }
    }

    /// Creates a new not found error.
    pub fn not_found(message: impl Into<String>, id: impl Into<String>) -> Self {
        Error::NotFound {
            message: message.into(),
            id: id.into(),
        }
    }

    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    /// Creates a new I/O error.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Creates a new serialization error.
    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Returns true if this error is a network failure.
    pub fn is_network_failure(&self) -> bool {
        matches!(self, Error::NetworkFailure { .. })
    }

    /// Returns true if the reply carried no text.
    pub fn is_empty_reply(&self) -> bool {
        matches!(self, Error::EmptyReply { .. })
    }

    /// Returns true if this error describes unreadable persisted state.
    pub fn is_malformed_state(&self) -> bool {
        matches!(self, Error::MalformedPersistedState { .. })
    }

    /// Returns true if the session was busy.
    pub fn is_busy(&self) -> bool {
        matches!(self, Error::Busy { .. })
    }

    /// Returns true if this error is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Returns true if this error is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Returns the status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::NetworkFailure { status_code, .. } => *status_code,
            _ => None,
        }
    }

    /// Classifies this error for reporting a failed send.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NetworkFailure { .. } => ErrorKind::NetworkFailure,
            Error::EmptyReply { .. } => ErrorKind::EmptyReply,
            Error::MalformedPersistedState { .. } => ErrorKind::MalformedPersistedState,
            Error::Busy { .. } => ErrorKind::Busy,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::Io { .. } => ErrorKind::Io,
            Error::Serialization { .. } => ErrorKind::Serialization,
        }
    }
}

/// Field-less discriminant of [`Error`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::NetworkFailure`].
    NetworkFailure,
    /// See [`Error::EmptyReply`].
    EmptyReply,
    /// See [`Error::MalformedPersistedState`].
    MalformedPersistedState,
    /// See [`Error::Busy`].
    Busy,
    /// See [`Error::NotFound`].
    NotFound,
    /// See [`Error::Validation`].
    Validation,
    /// See [`Error::Io`].
    Io,
    /// See [`Error::Serialization`].
    Serialization,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NetworkFailure {
                message,
                status_code,
                ..
            } => {
                if let Some(status_code) = status_code {
                    write!(f, "Network failure: {message} (status {status_code})")
                } else {
                    write!(f, "Network failure: {message}")
                }
            }
            Error::EmptyReply { message } => {
                write!(f, "Empty reply: {message}")
            }
            Error::MalformedPersistedState { key, message, .. } => {
                write!(f, "Malformed persisted state ({key}): {message}")
            }
            Error::Busy { message } => {
                write!(f, "Busy: {message}")
            }
            Error::NotFound { message, id } => {
                write!(f, "Not found: {message} [ID: {id}]")
            }
            Error::Validation { message, param } => {
                if let Some(param) = param {
                    write!(f, "Validation error: {message} (parameter: {param})")
                } else {
                    write!(f, "Validation error: {message}")
                }
            }
            Error::Io { message, .. } => {
                write!(f, "I/O error: {message}")
            }
            Error::Serialization { message, .. } => {
                write!(f, "Serialization error: {message}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::NetworkFailure { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::MalformedPersistedState { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Io { source, .. } => Some(source),
            Error::Serialization { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let status_code = err.status().map(|status| status.as_u16());
        let message = if err.is_timeout() {
            format!("Request timed out: {err}")
        } else if err.is_connect() {
            format!("Connection error: {err}")
        } else {
            format!("Request failed: {err}")
        };
        Error::network(message, status_code, Some(Box::new(err)))
    }
}

/// A specialized Result type for Phoenix chat operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_network_failure_with_status() {
        let err = Error::network("bad gateway", Some(502), None);
        assert_eq!(err.to_string(), "Network failure: bad gateway (status 502)");
        assert_eq!(err.status_code(), Some(502));
        assert_eq!(err.kind(), ErrorKind::NetworkFailure);
    }

    #[test]
    fn predicates_match_variants() {
        assert!(Error::empty_reply("nothing").is_empty_reply());
        assert!(Error::busy("sending").is_busy());
        assert!(Error::not_found("no such chat", "abc").is_not_found());
        assert!(Error::malformed_state("conversations", "bad json", None).is_malformed_state());
        assert!(!Error::validation("too big", None).is_network_failure());
    }

    #[test]
    fn io_errors_keep_their_source() {
        let err: Error = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(error::Error::source(&err).is_some());
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
