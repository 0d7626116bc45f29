//! Serial port transport backed by `tokio-serial`.

use crate::traits::SerialTransport;
use crate::types::{LinkState, PortInfo, TransportKind};
use crate::{HardwareError, Result};
use serialport::{ClearBuffer, DataBits, Parity, SerialPort, StopBits};
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, error, warn};

/// Driver-level timeout for blocking fallbacks inside the port.
const PORT_TIMEOUT: Duration = Duration::from_secs(2);

/// A serial port opened in async mode.
///
/// The port is configured 8N1, matching the sensor bridge firmware.
pub struct SerialPortTransport {
    stream: SerialStream,
    info: PortInfo,
    link: LinkState,
}

impl SerialPortTransport {
    /// Open `port_name` at `baud_rate`.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InitializationFailed` if the port cannot be
    /// opened (missing device, permission denied, port busy).
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self> {
        debug!(port = %port_name, baud_rate, "Opening serial port");

        let stream = tokio_serial::new(port_name, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(PORT_TIMEOUT)
            .open_native_async()
            .map_err(|e| {
                error!(port = %port_name, "Failed to open serial port: {}", e);
                HardwareError::initialization_failed(format!("{port_name}: {e}"))
            })?;

        Ok(Self {
            stream,
            info: PortInfo::new(port_name, baud_rate, TransportKind::Serial),
            link: LinkState::open(),
        })
    }

    /// List serial port names present on this machine.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform enumeration fails.
    pub fn available_ports() -> Result<Vec<String>> {
        let ports = serialport::available_ports()
            .map_err(|e| HardwareError::communication(format!("port enumeration: {e}")))?;
        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.link.is_open() {
            Ok(())
        } else {
            Err(HardwareError::disconnected(&self.info.name))
        }
    }

    /// Map an I/O failure, closing the link for errors that mean the device
    /// is gone.
    fn io_failure(&self, e: std::io::Error) -> HardwareError {
        if is_link_loss(&e) {
            warn!(port = %self.info.name, "Serial link dropped: {}", e);
            self.lost()
        } else {
            HardwareError::Io(e)
        }
    }

    fn lost(&self) -> HardwareError {
        self.link.mark_closed();
        HardwareError::disconnected(&self.info.name)
    }
}

/// POSIX `EIO`, reported by USB serial drivers when the adapter is unplugged.
const EIO: i32 = 5;

/// Returns `true` if `e` means the device behind the port is gone.
fn is_link_loss(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::BrokenPipe
            | ErrorKind::NotConnected
            | ErrorKind::UnexpectedEof
            | ErrorKind::PermissionDenied
            | ErrorKind::NotFound
    ) || (cfg!(unix) && e.raw_os_error() == Some(EIO))
}

impl SerialTransport for SerialPortTransport {
    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        self.ensure_open()?;

        match tokio::time::timeout(timeout, self.stream.read(buf)).await {
            // A zero-byte read into a non-empty buffer is end of stream
            Ok(Ok(0)) if !buf.is_empty() => {
                warn!(port = %self.info.name, "Serial port reached end of stream");
                Err(self.lost())
            }
            Ok(Ok(n)) => Ok(n),
            Ok(Err(e)) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => Ok(0),
            Ok(Err(e)) => Err(self.io_failure(e)),
            Err(_) => Ok(0),
        }
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_open()?;
        if let Err(e) = self.stream.write_all(data).await {
            return Err(self.io_failure(e));
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.ensure_open()?;
        if let Err(e) = self.stream.flush().await {
            return Err(self.io_failure(e));
        }
        Ok(())
    }

    fn clear_buffers(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.stream
            .clear(ClearBuffer::All)
            .map_err(|e| HardwareError::communication(format!("clear buffers: {e}")))
    }

    fn link(&self) -> &LinkState {
        &self.link
    }

    fn port_info(&self) -> PortInfo {
        self.info.clone()
    }
}

impl std::fmt::Debug for SerialPortTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPortTransport")
            .field("info", &self.info)
            .field("open", &self.link.is_open())
            .finish()
    }
}
