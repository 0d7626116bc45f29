//! Common types shared across transport implementations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared open/closed flag of a transport link.
///
/// Cloning yields another view of the same flag, so a caller can ask whether
/// the link is open without locking the transport that owns it. Transports
/// mark the link closed when they detect a dropped device.
///
/// # Examples
///
/// ```
/// use votekey_hardware::LinkState;
///
/// let link = LinkState::open();
/// let observer = link.clone();
///
/// link.mark_closed();
/// assert!(!observer.is_open());
/// ```
#[derive(Debug, Clone, Default)]
pub struct LinkState(Arc<AtomicBool>);

impl LinkState {
    /// Create a flag in the open state.
    pub fn open() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// Create a flag in the closed state.
    pub fn closed() -> Self {
        Self::default()
    }

    /// Returns `true` while the link is usable.
    pub fn is_open(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Mark the link as dropped.
    pub fn mark_closed(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Mark the link as usable again.
    pub fn mark_open(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Kind of transport behind a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Physical or USB-CDC serial port.
    Serial,
    /// In-memory emulated device.
    Mock,
}

/// Port identity reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    /// Port name (e.g., "COM4", "/dev/ttyUSB0").
    pub name: String,

    /// Configured baud rate.
    pub baud_rate: u32,

    /// Transport kind.
    pub kind: TransportKind,
}

impl PortInfo {
    /// Create port info.
    pub fn new(name: impl Into<String>, baud_rate: u32, kind: TransportKind) -> Self {
        Self {
            name: name.into(),
            baud_rate,
            kind,
        }
    }
}

impl fmt::Display for PortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.baud_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_state_shared() {
        let link = LinkState::open();
        let view = link.clone();
        assert!(view.is_open());

        link.mark_closed();
        assert!(!view.is_open());

        view.mark_open();
        assert!(link.is_open());
    }

    #[test]
    fn test_link_state_default_closed() {
        assert!(!LinkState::default().is_open());
        assert!(!LinkState::closed().is_open());
    }

    #[test]
    fn test_port_info_display() {
        let info = PortInfo::new("COM4", 9600, TransportKind::Serial);
        assert_eq!(info.to_string(), "COM4@9600");
    }

    #[test]
    fn test_port_info_serialization() {
        let info = PortInfo::new("mock", 9600, TransportKind::Mock);
        let json = serde_json::to_string(&info).unwrap();
        assert_eq!(json, r#"{"name":"mock","baud_rate":9600,"kind":"mock"}"#);
    }
}
