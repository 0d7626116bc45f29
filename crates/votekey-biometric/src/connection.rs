//! Line-level connection to the sensor bridge.
//!
//! A [`Connection`] pairs a transport with the [`LineCodec`] and the bytes
//! received but not yet framed. Every operation checks the link first and
//! fails fast with `Error::NotConnected` instead of blocking on a dead port.

use crate::codec::{LineCodec, SensorCommand};
use crate::config::ScannerConfig;
use crate::handshake::{self, HandshakeOutcome};
use bytes::BytesMut;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, info, trace};
use votekey_core::{Error, Result};
use votekey_hardware::{AnyTransport, LinkState, PortInfo, SerialTransport};

/// Size of a single transport read.
const READ_CHUNK: usize = 256;

/// Connection shared between the caller tasks and the enrollment listener.
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Open line-level connection.
#[derive(Debug)]
pub struct Connection {
    transport: AnyTransport,
    codec: LineCodec,

    /// Bytes received but not yet returned as a line
    read_buf: BytesMut,

    read_timeout: Duration,
}

impl Connection {
    /// Open the configured serial port and run the readiness handshake.
    ///
    /// # Errors
    /// Returns `Error::ConnectionFailed` if the port cannot be opened.
    pub async fn open(config: &ScannerConfig) -> Result<(Self, HandshakeOutcome)> {
        let transport = votekey_hardware::serial::SerialPortTransport::open(
            &config.port_name,
            config.baud_rate,
        )
        .map_err(Error::from)?;

        Self::establish(transport, config).await
    }

    /// Wrap an already open transport and run the readiness handshake.
    ///
    /// # Errors
    /// Returns an error if the link drops during the handshake.
    pub async fn establish(
        transport: impl Into<AnyTransport>,
        config: &ScannerConfig,
    ) -> Result<(Self, HandshakeOutcome)> {
        let mut connection = Self {
            transport: transport.into(),
            codec: LineCodec::with_max_line_length(config.max_line_length),
            read_buf: BytesMut::with_capacity(READ_CHUNK),
            read_timeout: config.read_timeout,
        };

        let info = connection.port_info();
        let outcome = handshake::perform(&mut connection, &config.handshake).await?;
        info!(
            port = %info.name,
            baud_rate = info.baud_rate,
            ready = outcome.is_ready(),
            "Scanner connected"
        );

        Ok((connection, outcome))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.transport.is_open() {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }

    /// Discard everything buffered in both directions.
    ///
    /// # Errors
    /// Returns `Error::NotConnected` if the link is down.
    pub fn clear_input(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.read_buf.clear();
        self.codec.reset();
        self.transport.clear_buffers()?;
        Ok(())
    }

    /// Reset buffers, then write and flush one command.
    ///
    /// # Errors
    /// Returns `Error::NotConnected` if the link is down, or a transport
    /// error if the write fails.
    pub async fn send(&mut self, command: SensorCommand) -> Result<()> {
        self.clear_input()?;

        let mut frame = BytesMut::new();
        self.codec.encode(command, &mut frame)?;

        debug!(command = %command, "Sending command");
        self.transport.write_all(&frame).await?;
        self.transport.flush().await?;
        Ok(())
    }

    /// Return the next non-blank line, performing at most one transport read.
    ///
    /// Returns `Ok(None)` if no complete line arrived within the read timeout.
    ///
    /// # Errors
    /// Returns `Error::NotConnected` if the link is down, or a transport
    /// error if the read fails.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.codec.decode(&mut self.read_buf)? {
            trace!(line = %line, "Received line");
            return Ok(Some(line));
        }

        self.ensure_open()?;

        let mut chunk = [0u8; READ_CHUNK];
        let n = self.transport.read(&mut chunk, self.read_timeout).await?;
        if n == 0 {
            return Ok(None);
        }
        self.read_buf.extend_from_slice(&chunk[..n]);

        let line = self.codec.decode(&mut self.read_buf)?;
        if let Some(line) = &line {
            trace!(line = %line, "Received line");
        }
        Ok(line)
    }

    /// Returns `true` while the link is up.
    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// Shared link flag, readable without locking the connection.
    pub fn link(&self) -> LinkState {
        self.transport.link().clone()
    }

    /// Port description.
    pub fn port_info(&self) -> PortInfo {
        self.transport.port_info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HandshakeConfig;
    use votekey_hardware::mock::MockSerial;

    fn quick_config() -> ScannerConfig {
        ScannerConfig::default().with_handshake(HandshakeConfig {
            boot_delay: Duration::ZERO,
            attempts: 1,
            interval: Duration::ZERO,
            ..HandshakeConfig::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_clears_then_writes() {
        let (serial, handle) = MockSerial::new();
        let (mut connection, _) = Connection::establish(serial, &quick_config())
            .await
            .unwrap();
        let clears = handle.clear_count();

        handle.feed_line("stale").await.unwrap();
        connection.send(SensorCommand::Scan).await.unwrap();

        assert_eq!(handle.clear_count(), clears + 1);
        assert_eq!(handle.written_lines(), vec!["SCAN"]);
        assert_eq!(connection.read_line().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_line_reassembles_chunks() {
        let (serial, handle) = MockSerial::new();
        let (mut connection, _) = Connection::establish(serial, &quick_config())
            .await
            .unwrap();

        handle.feed_bytes(b"SCAN:MA".to_vec()).await.unwrap();
        handle.feed_bytes(b"TCH:4\nREADY\n".to_vec()).await.unwrap();

        assert_eq!(connection.read_line().await.unwrap(), None);
        assert_eq!(
            connection.read_line().await.unwrap().as_deref(),
            Some("SCAN:MATCH:4")
        );
        // Second line is already buffered
        assert_eq!(connection.read_line().await.unwrap().as_deref(), Some("READY"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_link_fails_fast() {
        let (serial, handle) = MockSerial::new();
        let (mut connection, _) = Connection::establish(serial, &quick_config())
            .await
            .unwrap();
        let link = connection.link();

        handle.disconnect();

        assert!(!connection.is_open());
        assert!(!link.is_open());
        assert!(matches!(
            connection.send(SensorCommand::Enroll).await,
            Err(Error::NotConnected)
        ));
        assert!(matches!(connection.read_line().await, Err(Error::NotConnected)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failure_is_transport_error() {
        let (serial, handle) = MockSerial::new();
        let (mut connection, _) = Connection::establish(serial, &quick_config())
            .await
            .unwrap();

        handle.fail_writes(true);
        assert!(matches!(
            connection.send(SensorCommand::Enroll).await,
            Err(Error::Transport(_))
        ));
    }
}
