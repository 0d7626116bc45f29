//! Enum wrapper for transport dispatch.
//!
//! Native `async fn` in traits is not object-safe, so `Box<dyn SerialTransport>`
//! is not available. [`AnyTransport`] provides concrete dispatch instead and
//! keeps the connection type monomorphic.
//!
//! # Examples
//!
//! ```
//! use votekey_hardware::devices::AnyTransport;
//! use votekey_hardware::mock::MockSerial;
//! use votekey_hardware::traits::SerialTransport;
//!
//! let (serial, _handle) = MockSerial::new();
//! let transport = AnyTransport::from(serial);
//! assert!(transport.is_open());
//! ```

use crate::mock::MockSerial;
#[cfg(feature = "serial")]
use crate::serial::SerialPortTransport;
use crate::traits::SerialTransport;
use crate::types::{LinkState, PortInfo};
use crate::Result;
use std::time::Duration;

/// Enum wrapper for transport dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyTransport {
    /// Serial port.
    #[cfg(feature = "serial")]
    Serial(SerialPortTransport),

    /// Mock bridge for development and testing.
    Mock(MockSerial),
}

impl SerialTransport for AnyTransport {
    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        match self {
            #[cfg(feature = "serial")]
            Self::Serial(transport) => transport.read(buf, timeout).await,
            Self::Mock(transport) => transport.read(buf, timeout).await,
        }
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        match self {
            #[cfg(feature = "serial")]
            Self::Serial(transport) => transport.write_all(data).await,
            Self::Mock(transport) => transport.write_all(data).await,
        }
    }

    async fn flush(&mut self) -> Result<()> {
        match self {
            #[cfg(feature = "serial")]
            Self::Serial(transport) => transport.flush().await,
            Self::Mock(transport) => transport.flush().await,
        }
    }

    fn clear_buffers(&mut self) -> Result<()> {
        match self {
            #[cfg(feature = "serial")]
            Self::Serial(transport) => transport.clear_buffers(),
            Self::Mock(transport) => transport.clear_buffers(),
        }
    }

    fn link(&self) -> &LinkState {
        match self {
            #[cfg(feature = "serial")]
            Self::Serial(transport) => transport.link(),
            Self::Mock(transport) => transport.link(),
        }
    }

    fn port_info(&self) -> PortInfo {
        match self {
            #[cfg(feature = "serial")]
            Self::Serial(transport) => transport.port_info(),
            Self::Mock(transport) => transport.port_info(),
        }
    }
}

#[cfg(feature = "serial")]
impl From<SerialPortTransport> for AnyTransport {
    fn from(transport: SerialPortTransport) -> Self {
        Self::Serial(transport)
    }
}

impl From<MockSerial> for AnyTransport {
    fn from(transport: MockSerial) -> Self {
        Self::Mock(transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransportKind;

    #[tokio::test]
    async fn test_any_transport_dispatches_to_mock() {
        let (serial, handle) = MockSerial::new();
        let mut transport = AnyTransport::from(serial);

        handle.script_reply("SCAN", &["SCAN:MATCH:1"]);
        transport.write_all(b"SCAN\n").await.unwrap();
        transport.flush().await.unwrap();

        let mut buf = [0u8; 32];
        let n = transport
            .read(&mut buf, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"SCAN:MATCH:1\n");
        assert_eq!(transport.port_info().kind, TransportKind::Mock);
    }

    #[tokio::test]
    async fn test_any_transport_shares_link_state() {
        let (serial, handle) = MockSerial::new();
        let transport = AnyTransport::from(serial);
        let link = transport.link().clone();

        handle.disconnect();
        assert!(!link.is_open());
        assert!(!transport.is_open());
    }
}
