//! Errors raised by the connection, buffer, and DCC layers.

use thiserror::Error;

/// Errors the engine can surface. Parse-level errors are wrapped from
/// `ircproto`; everything else is a transport, registration, or internal
/// channel failure.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying socket failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or configuration failed.
    #[error("tls error: {0}")]
    Tls(String),

    /// A line failed to parse or a message failed to encode.
    #[error(transparent)]
    Parse(#[from] ircproto::Error),

    /// DNS resolution failed for a server address.
    #[error("could not resolve {0}: {1}")]
    Resolve(String, std::io::Error),

    /// Every alternate nickname was rejected during registration and the
    /// embedding host declined to supply another.
    #[error("no nickname available for registration")]
    NoNickname,

    /// The server stopped responding to PINGs within the configured timeout.
    #[error("ping timed out")]
    PingTimeout,

    /// An internal channel to a buffer or collector closed unexpectedly,
    /// meaning the task on the other end has already stopped.
    #[error("internal channel closed")]
    ChannelClosed,

    /// A DCC transfer or chat connection failed.
    #[error(transparent)]
    Dcc(#[from] crate::dcc::DccError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
