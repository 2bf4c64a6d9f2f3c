//! Error types for srcpool

use thiserror::Error;

/// Core error type for srcpool operations
#[derive(Error, Debug)]
pub enum SrcpoolError {
    #[error("Source not found: {0}")]
    NotFound(String),

    #[error("Connect failure: {0}")]
    ConnectFailure(TransportError),

    #[error("Resource is not connected")]
    Disconnected,

    #[error("Transport error: {0}")]
    Transport(TransportError),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl SrcpoolError {
    /// Whether the error means the backend session can no longer be used.
    ///
    /// Connect failures, fatal transport errors and operations attempted on a
    /// disconnected resource all qualify.
    pub fn is_connection_lost(&self) -> bool {
        match self {
            SrcpoolError::ConnectFailure(_) | SrcpoolError::Disconnected => true,
            SrcpoolError::Transport(err) => err.is_fatal(),
            _ => false,
        }
    }
}

/// Error reported by a backend transport.
///
/// `code` follows the client error numbering of the MySQL family of
/// protocols; codes `2000..=2018` are client-side failures (lost connection,
/// server gone away, handshake errors) after which the session is unusable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[{code}] {message}")]
pub struct TransportError {
    pub code: i32,
    pub message: String,
}

/// First client-side error code.
pub const CLIENT_ERROR_FIRST: i32 = 2000;
/// Last client-side error code that invalidates the session.
pub const CLIENT_ERROR_LAST: i32 = 2018;
/// "MySQL server has gone away"; used when a connection could not be obtained at all.
pub const SERVER_GONE_ERROR: i32 = 2006;

impl TransportError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Check if the error leaves the session unusable
    pub fn is_fatal(&self) -> bool {
        (CLIENT_ERROR_FIRST..=CLIENT_ERROR_LAST).contains(&self.code)
    }
}

/// Result type alias for srcpool operations
pub type Result<T> = std::result::Result<T, SrcpoolError>;
