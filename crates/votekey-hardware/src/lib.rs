//! Transport abstraction layer for the votekey fingerprint sensor bridge.
//!
//! This crate provides the byte-level link between the host and the
//! microcontroller that fronts an R307-class fingerprint sensor. Everything
//! above bytes (line framing, commands, sessions) lives in
//! `votekey-biometric`.
//!
//! # Design Philosophy
//!
//! - **Async-first**: All I/O operations are asynchronous using native `async fn`
//!   in traits (Rust 1.90 + Edition 2024 RPITIT).
//! - **Bounded**: Every read takes a timeout and reports an expired timeout
//!   as zero bytes, so no caller can hang on a silent device.
//! - **Observable link**: Each transport exposes a shared [`LinkState`] flag
//!   that other tasks can check without locking the transport.
//! - **Error-aware**: All operations return `Result<T>` with [`HardwareError`].
//!
//! # Transports
//!
//! - [`serial::SerialPortTransport`]: a real serial port via `tokio-serial`
//!   (feature `serial`, on by default).
//! - [`mock::MockSerial`]: an in-memory bridge driven by a
//!   [`mock::MockSerialHandle`], with scripted replies per command.
//!
//! Both are wrapped by [`devices::AnyTransport`] for concrete dispatch.
//!
//! ```
//! use std::time::Duration;
//! use votekey_hardware::{AnyTransport, SerialTransport};
//! use votekey_hardware::mock::MockSerial;
//!
//! #[tokio::main]
//! async fn main() -> votekey_hardware::Result<()> {
//!     let (serial, handle) = MockSerial::new();
//!     let mut transport = AnyTransport::from(serial);
//!
//!     handle.feed_line("Waiting for command").await?;
//!
//!     let mut buf = [0u8; 64];
//!     let n = transport.read(&mut buf, Duration::from_millis(50)).await?;
//!     assert!(n > 0);
//!     Ok(())
//! }
//! ```

pub mod devices;
pub mod error;
pub mod mock;
#[cfg(feature = "serial")]
pub mod serial;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use devices::AnyTransport;
pub use error::{HardwareError, Result};
pub use traits::SerialTransport;
pub use types::{LinkState, PortInfo, TransportKind};
