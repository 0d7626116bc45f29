use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Connection errors
    #[error("Scanner not connected")]
    NotConnected,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Transport error: {0}")]
    Transport(String),

    // Protocol errors
    /// Device reported a line starting with `ERROR:`; holds the line verbatim.
    #[error("{0}")]
    Protocol(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    // Session errors
    #[error("Enrollment already in progress")]
    Busy,

    #[error("Enrollment cancelled")]
    Cancelled,

    #[error("Invalid security level {level}, expected {min}-{max}")]
    InvalidSecurityLevel { level: u8, min: u8, max: u8 },

    #[error("Invalid template token: {0}")]
    InvalidTemplateToken(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a timeout error from a duration.
    pub fn timeout(duration: std::time::Duration) -> Self {
        Self::Timeout {
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// Returns `true` if the error means the link is gone.
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::NotConnected | Self::ConnectionFailed(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
