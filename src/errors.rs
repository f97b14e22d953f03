//! Definition of errors.

use std::error::Error;
use std::fmt::{self, Debug};

/// A specialized Result type for this crate.
pub type Result<T, E = ComugiError> = std::result::Result<T, E>;

/// The error type for tokenization and dictionary construction.
#[derive(Debug, thiserror::Error)]
pub enum ComugiError {
    /// The error variant for [`InvalidArgumentError`].
    #[error(transparent)]
    InvalidArgument(InvalidArgumentError),

    /// The error variant for [`InvalidFormatError`].
    #[error(transparent)]
    InvalidFormat(InvalidFormatError),

    /// The error variant for [`InvalidStateError`].
    #[error(transparent)]
    InvalidState(InvalidStateError),

    /// Emitted when a requested table (the double-array, a word-id range)
    /// has grown past what its fixed-width encoding can address.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The error variant for [`TryFromIntError`](std::num::TryFromIntError).
    #[error(transparent)]
    TryFromInt(std::num::TryFromIntError),

    /// The error variant for [`ParseFloatError`](std::num::ParseFloatError).
    #[error(transparent)]
    ParseFloat(std::num::ParseFloatError),

    /// The error variant for [`ParseIntError`](std::num::ParseIntError).
    #[error(transparent)]
    ParseInt(std::num::ParseIntError),

    /// The error variant for [`std::io::Error`].
    #[error(transparent)]
    StdIo(#[from] std::io::Error),

    /// The error variant for [`std::str::Utf8Error`].
    #[error(transparent)]
    Utf8(std::str::Utf8Error),

    /// The error variant for [`rkyv::rancor::Error`](rkyv::rancor::Error).
    #[error(transparent)]
    RkyvError(#[from] rkyv::rancor::Error),
}

impl ComugiError {
    pub(crate) fn invalid_argument<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument(InvalidArgumentError {
            arg,
            msg: msg.into(),
        })
    }

    pub(crate) fn invalid_format<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidFormat(InvalidFormatError {
            arg,
            msg: msg.into(),
        })
    }

    pub(crate) fn invalid_state<S, M>(msg: S, cause: M) -> Self
    where
        S: Into<String>,
        M: Into<String>,
    {
        Self::InvalidState(InvalidStateError {
            msg: msg.into(),
            cause: cause.into(),
        })
    }

    pub(crate) fn resource_exhausted<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::ResourceExhausted(msg.into())
    }
}

/// Error used when the argument is invalid.
#[derive(Debug)]
pub struct InvalidArgumentError {
    /// Name of the argument.
    pub(crate) arg: &'static str,

    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for InvalidArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidArgumentError: {}: {}", self.arg, self.msg)
    }
}

impl Error for InvalidArgumentError {}

/// Error used when the input format is invalid.
#[derive(Debug)]
pub struct InvalidFormatError {
    /// Name of the format.
    pub(crate) arg: &'static str,

    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for InvalidFormatError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidFormatError: {}: {}", self.arg, self.msg)
    }
}

impl Error for InvalidFormatError {}

/// Error used when the state is invalid.
#[derive(Debug)]
pub struct InvalidStateError {
    /// Error message.
    pub(crate) msg: String,

    /// Underlying cause of the error.
    pub(crate) cause: String,
}

impl fmt::Display for InvalidStateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidStateError: {}: {}", self.msg, self.cause)
    }
}

impl Error for InvalidStateError {}

impl From<std::num::TryFromIntError> for ComugiError {
    fn from(error: std::num::TryFromIntError) -> Self {
        Self::TryFromInt(error)
    }
}

impl From<std::num::ParseFloatError> for ComugiError {
    fn from(error: std::num::ParseFloatError) -> Self {
        Self::ParseFloat(error)
    }
}

impl From<std::num::ParseIntError> for ComugiError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::ParseInt(error)
    }
}

impl From<std::str::Utf8Error> for ComugiError {
    fn from(error: std::str::Utf8Error) -> Self {
        Self::Utf8(error)
    }
}
