//! Device-session layer for an R307-class fingerprint sensor behind a
//! microcontroller serial bridge.
//!
//! # Layers
//!
//! ```text
//! FingerprintScanner (records for collaborators)
//!   ├── EnrollmentSession ── listener task ──┐
//!   ├── ScanSession                          ├── SessionStatusStore
//!   └── Connection (LineCodec + handshake)   │
//!         └── votekey_hardware::AnyTransport ┘
//! ```
//!
//! Enrollment is asynchronous: a start returns as soon as `ENROLL` is on the
//! wire and callers poll status while a background listener interprets the
//! device prompts. A scan runs on the caller's task and returns its final
//! classification.

pub mod classify;
pub mod codec;
pub mod config;
pub mod connection;
pub mod enrollment;
pub mod handshake;
pub mod response;
pub mod scan;
pub mod scanner;
pub mod status;

pub use codec::{LineCodec, SensorCommand};
pub use config::{HandshakeConfig, ScannerConfig};
pub use connection::{Connection, SharedConnection};
pub use enrollment::EnrollmentSession;
pub use handshake::HandshakeOutcome;
pub use response::{AckResponse, DeviceStatus, ScanResponse, StartResponse, StatusResponse};
pub use scan::{ScanOutcome, ScanSession};
pub use scanner::FingerprintScanner;
pub use status::{EnrollmentPhase, EnrollmentResult, EnrollmentStatus, LastMatch, SessionStatusStore};
