//! Error types for transport operations.
//!
//! This module defines error types specific to the serial link, covering
//! disconnection, write failures, and port open failures. At the
//! crate boundary these convert into [`votekey_core::Error`].

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during transport operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Link is not open or has been dropped.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Device communication error.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Opening the port failed.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new initialization failed error.
    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }
}

impl From<HardwareError> for votekey_core::Error {
    fn from(error: HardwareError) -> Self {
        match error {
            HardwareError::Disconnected { .. } => votekey_core::Error::NotConnected,
            HardwareError::InitializationFailed { message } => {
                votekey_core::Error::ConnectionFailed(message)
            }
            other => votekey_core::Error::Transport(other.to_string()),
        }
    }
}
