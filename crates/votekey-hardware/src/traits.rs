//! Transport trait for line-oriented serial devices.
//!
//! The trait uses native `async fn` (Edition 2024 RPITIT), so it is not
//! object-safe; see [`crate::devices::AnyTransport`] for concrete dispatch.

#![allow(async_fn_in_trait)]

use crate::Result;
use crate::types::{LinkState, PortInfo};
use std::time::Duration;

/// Byte-oriented link to a sensor bridge.
///
/// Implementations never block indefinitely: every read is bounded by the
/// timeout passed in, and an expired timeout is reported as zero bytes read,
/// not as an error.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use votekey_hardware::traits::SerialTransport;
/// use votekey_hardware::Result;
///
/// async fn send_scan<T: SerialTransport>(transport: &mut T) -> Result<usize> {
///     transport.clear_buffers()?;
///     transport.write_all(b"SCAN\n").await?;
///     transport.flush().await?;
///
///     let mut buf = [0u8; 64];
///     transport.read(&mut buf, Duration::from_millis(100)).await
/// }
/// ```
pub trait SerialTransport: Send {
    /// Read available bytes into `buf`, waiting at most `timeout`.
    ///
    /// Returns `Ok(0)` when nothing arrived in time.
    ///
    /// # Errors
    ///
    /// Returns an error if the link is closed or the device dropped.
    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Write the whole buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the link is closed or the write fails.
    async fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Flush pending output to the device.
    async fn flush(&mut self) -> Result<()>;

    /// Discard stale bytes in both directions.
    fn clear_buffers(&mut self) -> Result<()>;

    /// Shared open/closed flag of this link.
    fn link(&self) -> &LinkState;

    /// Port identity.
    fn port_info(&self) -> PortInfo;

    /// Returns `true` while the link is usable.
    fn is_open(&self) -> bool {
        self.link().is_open()
    }
}
