use std::error::Error;
use std::fmt::{Display, Formatter};

/// Error kind that represents failures reported by the [`crate::Toggle`] and its collaborators.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ErrorKind {
    /// Fetching the configuration document failed (connection error, timeout, non-2xx status, or no source URL).
    Network = 1100,
    /// The configuration document could not be decoded.
    MalformedDocument = 1105,
    /// The configuration document was decoded but describes an invalid config (e.g. duplicate feature names).
    MalformedConfig = 1106,
    /// Reading from or writing to the persistent store failed.
    Storage = 2200,
    /// A request or builder argument was invalid.
    InvalidArgument = 3000,
}

impl ErrorKind {
    pub(crate) fn as_u16(&self) -> u16 {
        *self as u16
    }
}

/// Error struct that holds the [`ErrorKind`] and message of the reported failure.
#[derive(Debug, PartialEq, Clone)]
pub struct ClientError {
    /// Error kind that represents the reported failure.
    pub kind: ErrorKind,
    /// The text representation of the failure.
    pub message: String,
}

impl ClientError {
    /// Creates a new [`ClientError`].
    ///
    /// Custom [`crate::Transport`], [`crate::Decoder`] and [`crate::ConfigStore`]
    /// implementations use this to report their failures.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use toggle::{ClientError, ErrorKind};
    ///
    /// let err = ClientError::new(ErrorKind::Network, "connection refused".to_owned());
    /// assert_eq!(err.to_string(), "connection refused");
    /// ```
    pub fn new(kind: ErrorKind, message: String) -> Self {
        Self { message, kind }
    }
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message.as_str())
    }
}

impl Error for ClientError {}
