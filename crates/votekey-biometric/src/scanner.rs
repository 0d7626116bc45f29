//! Collaborator-facing facade.
//!
//! [`FingerprintScanner`] owns the connection, the status store and both
//! sessions. Every operation returns a record from [`crate::response`];
//! faults are folded into those records and never propagate.

use crate::config::ScannerConfig;
use crate::connection::{Connection, SharedConnection};
use crate::enrollment::EnrollmentSession;
use crate::handshake::HandshakeOutcome;
use crate::response::{AckResponse, DeviceStatus, ScanResponse, StartResponse, StatusResponse};
use crate::scan::{ScanOutcome, ScanSession};
use crate::status::{LastMatch, SessionStatusStore};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, info};
use votekey_core::{Error, Result, SecurityLevel};
use votekey_hardware::{AnyTransport, LinkState};

#[derive(Debug, Clone)]
struct Attached {
    connection: SharedConnection,
    link: LinkState,
}

/// Fingerprint sensor session layer.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use votekey_biometric::{FingerprintScanner, HandshakeConfig, ScannerConfig};
/// use votekey_hardware::mock::MockSerial;
///
/// #[tokio::main(flavor = "current_thread", start_paused = true)]
/// async fn main() -> votekey_core::Result<()> {
///     let config = ScannerConfig::default().with_handshake(HandshakeConfig {
///         boot_delay: Duration::ZERO,
///         ..HandshakeConfig::default()
///     });
///     let scanner = FingerprintScanner::new(config);
///
///     let (serial, device) = MockSerial::new();
///     scanner.attach(serial).await?;
///     assert!(scanner.is_connected());
///
///     device.script_reply("SCAN", &["SCAN:MATCH:3"]);
///     let record = scanner.scan_fingerprint().await;
///     assert!(record.scanned);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FingerprintScanner {
    config: ScannerConfig,
    attached: Mutex<Option<Attached>>,
    store: Arc<SessionStatusStore>,
    enrollment: EnrollmentSession,
    scan: ScanSession,
}

impl FingerprintScanner {
    pub fn new(config: ScannerConfig) -> Self {
        let store = Arc::new(SessionStatusStore::new());
        Self {
            enrollment: EnrollmentSession::new(Arc::clone(&store), &config),
            scan: ScanSession::new(Arc::clone(&store), &config),
            store,
            attached: Mutex::new(None),
            config,
        }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    fn attached(&self) -> MutexGuard<'_, Option<Attached>> {
        self.attached.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open connection, or `None` if absent or closed.
    fn live_connection(&self) -> Option<SharedConnection> {
        self.attached()
            .as_ref()
            .filter(|a| a.link.is_open())
            .map(|a| Arc::clone(&a.connection))
    }

    fn install(&self, connection: Connection) {
        let attached = Attached {
            link: connection.link(),
            connection: Arc::new(tokio::sync::Mutex::new(connection)),
        };
        *self.attached() = Some(attached);
    }

    fn detach(&self) {
        self.enrollment.cancel();
        *self.attached() = None;
    }

    /// Open `port` and run the handshake, replacing any previous connection.
    ///
    /// Returns `false` only if the port could not be opened; a device that
    /// sends no banner still counts as connected.
    pub async fn connect(&self, port: &str, baud_rate: u32) -> bool {
        self.detach();

        let config = self.config.clone().with_port(port, baud_rate);
        let opened = match config.validate() {
            Ok(()) => Connection::open(&config).await,
            Err(e) => Err(e),
        };

        match opened {
            Ok((connection, _)) => {
                self.install(connection);
                true
            }
            Err(e) => {
                error!(port, baud_rate, error = %e, "Failed to connect to scanner");
                false
            }
        }
    }

    /// Run the handshake on an already open transport and use it.
    ///
    /// # Errors
    /// Returns an error if the link drops during the handshake.
    pub async fn attach(&self, transport: impl Into<AnyTransport>) -> Result<HandshakeOutcome> {
        self.detach();

        let (connection, outcome) = Connection::establish(transport, &self.config).await?;
        self.install(connection);
        Ok(outcome)
    }

    /// Returns `true` if a connection exists and its link is up.
    pub fn is_connected(&self) -> bool {
        self.attached()
            .as_ref()
            .is_some_and(|a| a.link.is_open())
    }

    /// Start an enrollment at `security_level` (1-5).
    pub async fn start_enrollment(&self, security_level: u8) -> StartResponse {
        let level = match SecurityLevel::new(security_level) {
            Ok(level) => level,
            Err(e) => return StartResponse::rejected(e.to_string()),
        };
        let Some(connection) = self.live_connection() else {
            return StartResponse::rejected(Error::NotConnected.to_string());
        };

        match self.enrollment.start(&connection, level).await {
            Ok(()) => StartResponse::started(),
            Err(e) => StartResponse::rejected(e.to_string()),
        }
    }

    /// Start an enrollment at the configured security level.
    pub async fn start_default_enrollment(&self) -> StartResponse {
        self.start_enrollment(self.config.security_level.as_u8())
            .await
    }

    /// Poll the enrollment. A terminal outcome is reported once.
    pub fn get_enrollment_status(&self) -> StatusResponse {
        self.enrollment.status().into()
    }

    /// Drop any enrollment. Always succeeds.
    pub fn cancel_enrollment(&self) -> AckResponse {
        self.enrollment.cancel();
        AckResponse::ok()
    }

    /// Run one scan and return its typed outcome.
    pub async fn scan(&self) -> ScanOutcome {
        match self.live_connection() {
            Some(connection) => self.scan.scan(&connection).await,
            None => ScanOutcome::Error(Error::NotConnected.to_string()),
        }
    }

    /// Run one scan and return the collaborator record.
    pub async fn scan_fingerprint(&self) -> ScanResponse {
        self.scan().await.into()
    }

    /// Forget the last matched scan. Always succeeds.
    pub fn clear_last_scan(&self) -> AckResponse {
        self.store.clear_last_match();
        AckResponse::ok()
    }

    pub fn device_status(&self) -> DeviceStatus {
        DeviceStatus::from_connected(self.is_connected())
    }

    pub fn last_match(&self) -> Option<LastMatch> {
        self.store.last_match()
    }

    /// Cancel any enrollment, wait for its listener and drop the connection.
    pub async fn shutdown(&self) {
        self.enrollment.shutdown().await;
        *self.attached() = None;
        info!("Scanner shut down");
    }
}

impl Default for FingerprintScanner {
    fn default() -> Self {
        Self::new(ScannerConfig::default())
    }
}
