//! Unified error type.

use std::fmt;

/// The error type returned by tsu-log's fallible operations.
///
/// Failures of a [`ResponseWriter`](crate::ResponseWriter) are plain
/// [`std::io::Error`]s and travel back to the caller untouched. This type
/// surfaces the rest: binding to a port, accepting a connection, or asking
/// for a log format that does not exist.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    UnknownFormat(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::UnknownFormat(name) => write!(f, "unknown access log format `{name}`"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::UnknownFormat(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
