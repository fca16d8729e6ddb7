//! Errors produced while parsing or rendering IRC protocol data.

use thiserror::Error;

/// Failures that can occur while turning wire bytes into a [`crate::Message`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The line was empty after trimming `\r\n`.
    #[error("cannot parse an empty line as a message")]
    Empty,
    /// The line was missing a command token.
    #[error("message is missing a command")]
    MissingCommand,
    /// A 3-digit numeric command did not consist solely of ASCII digits.
    #[error("invalid numeric command {0:?}")]
    InvalidNumeric(String),
    /// A `MODE` string referenced a flag the mode table does not know how to
    /// consume (e.g. a flag marked as taking an argument with none left).
    #[error("invalid mode string {0:?}")]
    InvalidModeString(String),
}

/// Errors raised by the protocol crate. Transport- and connection-level errors
/// live in the `ircengine` crate; this enum only covers wire-format concerns.
#[derive(Debug, Error)]
pub enum Error {
    /// A line failed to parse; see [`ParseError`] for the reason.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The underlying byte stream failed while framing lines.
    #[error("i/o error while framing a line: {0}")]
    Io(#[from] std::io::Error),
    /// An ISUPPORT- or config-supplied encoding label named an encoding this
    /// crate (via `encoding_rs`) does not recognize.
    #[error("unknown character encoding {0:?}")]
    UnknownEncoding(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
