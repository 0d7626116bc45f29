//! Mock serial transport for testing and development.
//!
//! This module provides an in-memory sensor bridge. Tests drive it through
//! a [`MockSerialHandle`]: feeding device lines, scripting replies to
//! commands, inspecting what the host wrote, and simulating a dropped link.

use crate::traits::SerialTransport;
use crate::types::{LinkState, PortInfo, TransportKind};
use crate::{HardwareError, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use votekey_core::constants::{DEFAULT_BAUD_RATE, LINE_TERMINATOR};

/// Capacity of the device-to-host channel.
const CHANNEL_CAPACITY: usize = 64;

/// Mock sensor bridge.
///
/// Bytes fed through the handle are queued as if the device had sent them.
/// Whenever the host writes a complete command line, the next reply scripted
/// for that command is queued right away, which lets synchronous
/// request/response flows run without a helper task.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use votekey_hardware::mock::MockSerial;
/// use votekey_hardware::traits::SerialTransport;
///
/// #[tokio::main]
/// async fn main() -> votekey_hardware::Result<()> {
///     let (mut serial, handle) = MockSerial::new();
///     handle.script_reply("SCAN", &["SCAN:MATCH:3"]);
///
///     serial.write_all(b"SCAN\n").await?;
///
///     let mut buf = [0u8; 64];
///     let n = serial.read(&mut buf, Duration::from_millis(10)).await?;
///     assert_eq!(&buf[..n], b"SCAN:MATCH:3\n");
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockSerial {
    /// Channel receiver for bytes fed by the handle
    inbound_rx: mpsc::Receiver<Vec<u8>>,

    /// Bytes received but not yet read by the host
    pending: VecDeque<u8>,

    /// Partial command line written by the host
    command_buf: Vec<u8>,

    /// State shared with the handle
    shared: Arc<Mutex<MockState>>,

    link: LinkState,

    /// Port name
    name: String,
}

#[derive(Debug, Default)]
struct MockState {
    /// Every byte the host wrote, in order
    written: Vec<u8>,

    /// Queued replies per command
    replies: HashMap<String, VecDeque<Vec<String>>>,

    /// Number of buffer clears performed by the host
    clears: usize,

    /// Fail writes with a communication error
    fail_writes: bool,
}

fn lock(shared: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockSerial {
    /// Create a new mock bridge with the default name.
    ///
    /// Returns a tuple of (MockSerial, MockSerialHandle) where the handle
    /// is used to play the device side.
    pub fn new() -> (Self, MockSerialHandle) {
        Self::with_name("mock-r307".to_string())
    }

    /// Create a new mock bridge with a custom port name.
    pub fn with_name(name: String) -> (Self, MockSerialHandle) {
        let (inbound_tx, inbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let shared = Arc::new(Mutex::new(MockState::default()));
        let link = LinkState::open();

        let serial = Self {
            inbound_rx,
            pending: VecDeque::new(),
            command_buf: Vec::new(),
            shared: Arc::clone(&shared),
            link: link.clone(),
            name: name.clone(),
        };

        let handle = MockSerialHandle {
            inbound_tx,
            shared,
            link,
            name,
        };

        (serial, handle)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.link.is_open() {
            Ok(())
        } else {
            Err(HardwareError::disconnected(&self.name))
        }
    }

    fn drain_pending(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        n
    }

    /// Queue scripted replies for every complete command line written so far.
    fn dispatch_commands(&mut self) {
        while let Some(pos) = self.command_buf.iter().position(|&b| b == LINE_TERMINATOR) {
            let line: Vec<u8> = self.command_buf.drain(..=pos).collect();
            let command = String::from_utf8_lossy(&line).trim().to_string();

            let reply = lock(&self.shared)
                .replies
                .get_mut(&command)
                .and_then(VecDeque::pop_front);

            for reply_line in reply.into_iter().flatten() {
                self.pending.extend(reply_line.into_bytes());
                self.pending.push_back(LINE_TERMINATOR);
            }
        }
    }
}

impl SerialTransport for MockSerial {
    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        self.ensure_open()?;

        if self.pending.is_empty() {
            match tokio::time::timeout(timeout, self.inbound_rx.recv()).await {
                Ok(Some(bytes)) => self.pending.extend(bytes),
                Ok(None) => {
                    // Handle dropped: behave like a silent device
                    tokio::time::sleep(timeout).await;
                    return Ok(0);
                }
                Err(_) => return Ok(0),
            }
        }

        Ok(self.drain_pending(buf))
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_open()?;

        {
            let mut state = lock(&self.shared);
            if state.fail_writes {
                return Err(HardwareError::communication("write rejected by device"));
            }
            state.written.extend_from_slice(data);
        }

        self.command_buf.extend_from_slice(data);
        self.dispatch_commands();
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.ensure_open()
    }

    fn clear_buffers(&mut self) -> Result<()> {
        self.ensure_open()?;

        self.pending.clear();
        self.command_buf.clear();
        while self.inbound_rx.try_recv().is_ok() {}
        lock(&self.shared).clears += 1;
        Ok(())
    }

    fn link(&self) -> &LinkState {
        &self.link
    }

    fn port_info(&self) -> PortInfo {
        PortInfo::new(self.name.clone(), DEFAULT_BAUD_RATE, TransportKind::Mock)
    }
}

/// Handle for playing the device side of a [`MockSerial`].
///
/// # Examples
///
/// ```
/// use votekey_hardware::mock::MockSerial;
///
/// #[tokio::main]
/// async fn main() -> votekey_hardware::Result<()> {
///     let (_serial, handle) = MockSerial::new();
///
///     handle.script_reply("ENROLL", &["Place finger on sensor", "ENROLL:SUCCESS:7"]);
///     handle.feed_line("READY").await?;
///
///     assert!(handle.is_open());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MockSerialHandle {
    /// Channel sender for device-to-host bytes
    inbound_tx: mpsc::Sender<Vec<u8>>,

    shared: Arc<Mutex<MockState>>,

    link: LinkState,

    /// Port name
    name: String,
}

impl MockSerialHandle {
    /// Send one newline-terminated line from the device.
    ///
    /// # Errors
    ///
    /// Returns an error if the mock transport has been dropped.
    pub async fn feed_line(&self, line: &str) -> Result<()> {
        let mut bytes = line.as_bytes().to_vec();
        bytes.push(LINE_TERMINATOR);
        self.feed_bytes(bytes).await
    }

    /// Send raw bytes from the device, terminated or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the mock transport has been dropped.
    pub async fn feed_bytes(&self, bytes: Vec<u8>) -> Result<()> {
        self.inbound_tx
            .send(bytes)
            .await
            .map_err(|_| HardwareError::disconnected(&self.name))
    }

    /// Queue the lines the device answers with the next time `command` is
    /// written. Each call scripts one reply; replies are consumed in order.
    pub fn script_reply(&self, command: &str, lines: &[&str]) {
        lock(&self.shared)
            .replies
            .entry(command.to_string())
            .or_default()
            .push_back(lines.iter().map(|l| l.to_string()).collect());
    }

    /// Every byte the host has written.
    pub fn written(&self) -> Vec<u8> {
        lock(&self.shared).written.clone()
    }

    /// Host writes split into trimmed lines.
    pub fn written_lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.written())
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect()
    }

    /// Number of times the host cleared the buffers.
    pub fn clear_count(&self) -> usize {
        lock(&self.shared).clears
    }

    /// Make subsequent writes fail with a communication error.
    pub fn fail_writes(&self, fail: bool) {
        lock(&self.shared).fail_writes = fail;
    }

    /// Simulate the device being unplugged.
    pub fn disconnect(&self) {
        self.link.mark_closed();
    }

    /// Returns `true` while the simulated link is up.
    pub fn is_open(&self) -> bool {
        self.link.is_open()
    }

    /// Get the port name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: Duration = Duration::from_millis(20);

    #[tokio::test]
    async fn test_mock_serial_feed_and_read() {
        let (mut serial, handle) = MockSerial::new();

        handle.feed_line("READY").await.unwrap();

        let mut buf = [0u8; 32];
        let n = serial.read(&mut buf, SHORT).await.unwrap();
        assert_eq!(&buf[..n], b"READY\n");
    }

    #[tokio::test]
    async fn test_mock_serial_read_timeout_is_empty() {
        let (mut serial, _handle) = MockSerial::new();

        let mut buf = [0u8; 32];
        let n = serial.read(&mut buf, SHORT).await.unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_mock_serial_small_buffer_keeps_remainder() {
        let (mut serial, handle) = MockSerial::new();
        handle.feed_line("ABCDEF").await.unwrap();

        let mut buf = [0u8; 4];
        let n = serial.read(&mut buf, SHORT).await.unwrap();
        assert_eq!(&buf[..n], b"ABCD");

        let n = serial.read(&mut buf, SHORT).await.unwrap();
        assert_eq!(&buf[..n], b"EF\n");
    }

    #[tokio::test]
    async fn test_mock_serial_scripted_reply() {
        let (mut serial, handle) = MockSerial::new();
        handle.script_reply("SCAN", &["SCAN:NO_MATCH"]);

        // Partial writes only dispatch once the line is complete
        serial.write_all(b"SC").await.unwrap();
        let mut buf = [0u8; 32];
        assert_eq!(serial.read(&mut buf, SHORT).await.unwrap(), 0);

        serial.write_all(b"AN\n").await.unwrap();
        let n = serial.read(&mut buf, SHORT).await.unwrap();
        assert_eq!(&buf[..n], b"SCAN:NO_MATCH\n");

        // Script consumed
        serial.write_all(b"SCAN\n").await.unwrap();
        assert_eq!(serial.read(&mut buf, SHORT).await.unwrap(), 0);

        assert_eq!(handle.written_lines(), vec!["SCAN", "SCAN"]);
    }

    #[tokio::test]
    async fn test_mock_serial_clear_discards_stale_bytes() {
        let (mut serial, handle) = MockSerial::new();
        handle.feed_line("stale").await.unwrap();

        serial.clear_buffers().unwrap();
        assert_eq!(handle.clear_count(), 1);

        let mut buf = [0u8; 32];
        assert_eq!(serial.read(&mut buf, SHORT).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mock_serial_disconnect() {
        let (mut serial, handle) = MockSerial::new();
        assert!(serial.is_open());

        handle.disconnect();
        assert!(!serial.is_open());

        let mut buf = [0u8; 8];
        assert!(matches!(
            serial.read(&mut buf, SHORT).await,
            Err(HardwareError::Disconnected { .. })
        ));
        assert!(serial.write_all(b"SCAN\n").await.is_err());
        assert!(serial.clear_buffers().is_err());
    }

    #[tokio::test]
    async fn test_mock_serial_fail_writes() {
        let (mut serial, handle) = MockSerial::new();
        handle.fail_writes(true);

        let result = serial.write_all(b"ENROLL\n").await;
        assert!(matches!(
            result,
            Err(HardwareError::CommunicationError { .. })
        ));
        assert!(handle.written().is_empty());
    }

    #[tokio::test]
    async fn test_mock_serial_port_info() {
        let (serial, handle) = MockSerial::with_name("bench".to_string());
        let info = serial.port_info();
        assert_eq!(info.name, "bench");
        assert_eq!(info.kind, TransportKind::Mock);
        assert_eq!(handle.name(), "bench");
    }
}
