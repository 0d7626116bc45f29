//! Scanner configuration.
//!
//! All timings default to the values in [`votekey_core::constants`]. The
//! structs serialize with durations as integer milliseconds so a host
//! application can load them from JSON:
//!
//! ```
//! use votekey_biometric::ScannerConfig;
//!
//! let config: ScannerConfig = serde_json::from_str(
//!     r#"{"port_name": "COM7", "scan_timeout_ms": 5000}"#,
//! ).unwrap();
//!
//! assert_eq!(config.port_name, "COM7");
//! assert_eq!(config.scan_timeout.as_secs(), 5);
//! assert_eq!(config.baud_rate, 9600);
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use votekey_core::constants::*;
use votekey_core::{Error, Result, SecurityLevel};

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Readiness probe performed right after the port is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandshakeConfig {
    /// Wait before any I/O while the board reboots.
    #[serde(rename = "boot_delay_ms", with = "duration_ms")]
    pub boot_delay: Duration,

    /// Number of readiness polls.
    pub attempts: u32,

    /// Delay between readiness polls.
    #[serde(rename = "interval_ms", with = "duration_ms")]
    pub interval: Duration,

    /// Banner substrings that mean the device is ready (case-insensitive).
    pub ready_tokens: Vec<String>,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            boot_delay: Duration::from_millis(DEFAULT_BOOT_DELAY_MS),
            attempts: DEFAULT_HANDSHAKE_ATTEMPTS,
            interval: Duration::from_millis(DEFAULT_HANDSHAKE_INTERVAL_MS),
            ready_tokens: READY_TOKENS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Configuration for a [`FingerprintScanner`](crate::FingerprintScanner).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Serial port name.
    pub port_name: String,

    /// Serial baud rate.
    pub baud_rate: u32,

    /// Security level used when a caller does not pass one.
    pub security_level: SecurityLevel,

    /// Readiness probe settings.
    pub handshake: HandshakeConfig,

    /// Timeout of a single transport read.
    #[serde(rename = "read_timeout_ms", with = "duration_ms")]
    pub read_timeout: Duration,

    /// Sleep between empty reads in the enrollment listener.
    #[serde(rename = "listener_poll_ms", with = "duration_ms")]
    pub listener_poll: Duration,

    /// Sleep between empty reads during a scan.
    #[serde(rename = "scan_poll_ms", with = "duration_ms")]
    pub scan_poll: Duration,

    /// Wall-clock budget of a scan from the `SCAN` command.
    #[serde(rename = "scan_timeout_ms", with = "duration_ms")]
    pub scan_timeout: Duration,

    /// Wall-clock budget of an enrollment from the `ENROLL` command.
    #[serde(rename = "enroll_timeout_ms", with = "duration_ms")]
    pub enroll_timeout: Duration,

    /// Longest unterminated line kept before it is discarded.
    pub max_line_length: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            port_name: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            security_level: SecurityLevel::default(),
            handshake: HandshakeConfig::default(),
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            listener_poll: Duration::from_millis(DEFAULT_LISTENER_POLL_MS),
            scan_poll: Duration::from_millis(DEFAULT_SCAN_POLL_MS),
            scan_timeout: Duration::from_millis(DEFAULT_SCAN_TIMEOUT_MS),
            enroll_timeout: Duration::from_millis(DEFAULT_ENROLL_TIMEOUT_MS),
            max_line_length: MAX_LINE_LENGTH,
        }
    }
}

impl ScannerConfig {
    /// Set the serial port.
    pub fn with_port(mut self, port_name: impl Into<String>, baud_rate: u32) -> Self {
        self.port_name = port_name.into();
        self.baud_rate = baud_rate;
        self
    }

    /// Set the handshake settings.
    pub fn with_handshake(mut self, handshake: HandshakeConfig) -> Self {
        self.handshake = handshake;
        self
    }

    /// Set the scan budget.
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Set the enrollment budget.
    pub fn with_enroll_timeout(mut self, timeout: Duration) -> Self {
        self.enroll_timeout = timeout;
        self
    }

    /// Set the default security level.
    pub fn with_security_level(mut self, level: SecurityLevel) -> Self {
        self.security_level = level;
        self
    }

    /// Check the configuration for values that would stall or spin.
    ///
    /// # Errors
    /// Returns `Error::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.port_name.trim().is_empty() {
            return Err(Error::Config("port_name must not be empty".to_string()));
        }
        if self.baud_rate == 0 {
            return Err(Error::Config("baud_rate must be positive".to_string()));
        }
        if self.read_timeout.is_zero() {
            return Err(Error::Config("read_timeout must be positive".to_string()));
        }
        if self.listener_poll.is_zero() || self.scan_poll.is_zero() {
            return Err(Error::Config("poll intervals must be positive".to_string()));
        }
        if self.scan_timeout.is_zero() || self.enroll_timeout.is_zero() {
            return Err(Error::Config("session timeouts must be positive".to_string()));
        }
        if self.max_line_length == 0 {
            return Err(Error::Config("max_line_length must be positive".to_string()));
        }
        Ok(())
    }
}
