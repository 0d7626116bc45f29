//! Multi-step enrollment with a supervised background listener.
//!
//! [`EnrollmentSession::start`] sends `ENROLL` and spawns one listener task
//! bound to the new generation. The listener reads one line at a time,
//! holding the connection lock only for that read, and writes what it learns
//! into the [`SessionStatusStore`]. Callers observe progress by polling
//! [`EnrollmentSession::status`].

use crate::classify::{EnrollmentLine, classify_enrollment_line};
use crate::codec::SensorCommand;
use crate::config::ScannerConfig;
use crate::connection::SharedConnection;
use crate::status::{EnrollmentResult, EnrollmentStatus, SessionStatusStore};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use votekey_core::{Error, Result, SecurityLevel};

/// Enrollment session owning the listener handle.
#[derive(Debug)]
pub struct EnrollmentSession {
    store: Arc<SessionStatusStore>,
    listener: Mutex<Option<JoinHandle<()>>>,
    poll_interval: Duration,
    timeout: Duration,
}

impl EnrollmentSession {
    pub fn new(store: Arc<SessionStatusStore>, config: &ScannerConfig) -> Self {
        Self {
            store,
            listener: Mutex::new(None),
            poll_interval: config.listener_poll,
            timeout: config.enroll_timeout,
        }
    }

    /// Send `ENROLL` and spawn the listener.
    ///
    /// The security level is validated by its type and logged; the sensor
    /// bridge has no command to change it.
    ///
    /// # Errors
    /// Returns `Error::Busy` if a session is active, `Error::Cancelled` if
    /// the session was cancelled before it started listening, or the send
    /// error if the command could not be written. No listener is spawned in
    /// any of these cases.
    pub async fn start(&self, connection: &SharedConnection, level: SecurityLevel) -> Result<()> {
        let generation = self.store.try_begin()?;

        let mut guard = connection.lock().await;
        // A cancel may have landed while waiting for the connection
        if !self.store.is_starting(generation) {
            debug!(generation, "Enrollment cancelled before the command was sent");
            return Err(Error::Cancelled);
        }
        let sent = guard.send(SensorCommand::Enroll).await;
        drop(guard);

        if let Err(e) = sent {
            warn!(generation, error = %e, "Failed to send enrollment command");
            self.store.abort(generation);
            return Err(e);
        }

        let deadline = Instant::now() + self.timeout;
        if !self.store.mark_listening(generation) {
            warn!(generation, "Enrollment cancelled while the command was sent");
            return Err(Error::Cancelled);
        }
        info!(generation, security_level = %level, "Enrollment started");

        let listener = Listener {
            connection: Arc::clone(connection),
            store: Arc::clone(&self.store),
            generation,
            deadline,
            timeout: self.timeout,
            poll_interval: self.poll_interval,
        };
        let handle = tokio::spawn(listener.run());

        // A previous listener was orphaned by cancel and exits on its own
        let _ = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        Ok(())
    }

    /// Read the session, consuming a terminal outcome.
    pub fn status(&self) -> EnrollmentStatus {
        self.store.take_status()
    }

    /// Drop the session. The listener stops at its next iteration.
    pub fn cancel(&self) {
        if self.store.phase().is_active() {
            debug!(generation = self.store.generation(), "Enrollment cancelled");
        }
        self.store.cancel();
    }

    /// Returns `true` while the listener is collecting lines.
    pub fn is_active(&self) -> bool {
        self.store.phase().is_active()
    }

    /// Cancel and wait for the listener to exit.
    pub async fn shutdown(&self) {
        self.cancel();

        let handle = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Enrollment listener ended abnormally");
            }
        }
    }
}

struct Listener {
    connection: SharedConnection,
    store: Arc<SessionStatusStore>,
    generation: u64,
    deadline: Instant,
    timeout: Duration,
    poll_interval: Duration,
}

impl Listener {
    async fn run(self) {
        let generation = self.generation;

        loop {
            if !self.store.is_listening(generation) {
                debug!(generation, "Enrollment listener stopping");
                return;
            }

            if Instant::now() >= self.deadline {
                let error = Error::timeout(self.timeout);
                warn!(generation, error = %error, "Enrollment timed out");
                self.store.fail(generation, error.to_string());
                return;
            }

            let read = self.connection.lock().await.read_line().await;
            match read {
                Ok(Some(line)) => {
                    if self.handle_line(&line) {
                        return;
                    }
                }
                Ok(None) => tokio::time::sleep(self.poll_interval).await,
                Err(e) if e.is_disconnect() => {
                    warn!(generation, error = %e, "Scanner link lost during enrollment");
                    self.store.fail(generation, e.to_string());
                    return;
                }
                Err(e) => {
                    error!(generation, error = %e, "Enrollment listener transport failure");
                    self.store.fail(generation, e.to_string());
                    return;
                }
            }
        }
    }

    /// Apply one line to the store. Returns `true` if the session ended.
    fn handle_line(&self, line: &str) -> bool {
        let generation = self.generation;
        let classified = classify_enrollment_line(line);

        match &classified {
            EnrollmentLine::Success(slot_id) => {
                if self
                    .store
                    .complete(generation, EnrollmentResult::new(*slot_id))
                {
                    info!(generation, slot_id = %slot_id, "Enrollment completed");
                }
            }
            EnrollmentLine::Malformed(reason) => {
                warn!(generation, line = %line, "Malformed enrollment result");
                self.store.fail(generation, reason.clone());
            }
            EnrollmentLine::Failure(error_line) => {
                warn!(generation, line = %line, "Device reported enrollment error");
                let error = Error::Protocol(error_line.clone());
                self.store.fail(generation, error.to_string());
            }
            EnrollmentLine::Prompt(step) => {
                debug!(generation, step = ?step, "Enrollment prompt");
                self.store.record_progress(generation, step.message());
            }
            EnrollmentLine::Progress(text) => {
                self.store.record_progress(generation, text.clone());
            }
        }

        classified.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HandshakeConfig;
    use crate::connection::Connection;
    use crate::status::EnrollmentPhase;
    use tokio::sync::Mutex as AsyncMutex;
    use votekey_hardware::mock::{MockSerial, MockSerialHandle};

    async fn setup() -> (EnrollmentSession, SharedConnection, MockSerialHandle) {
        let config = ScannerConfig::default().with_handshake(HandshakeConfig {
            boot_delay: Duration::ZERO,
            attempts: 1,
            ..HandshakeConfig::default()
        });
        let (serial, handle) = MockSerial::new();
        let (connection, _) = Connection::establish(serial, &config).await.unwrap();
        let session = EnrollmentSession::new(Arc::new(SessionStatusStore::new()), &config);
        (session, Arc::new(AsyncMutex::new(connection)), handle)
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_writes_enroll_and_waits() {
        let (session, connection, handle) = setup().await;

        session
            .start(&connection, SecurityLevel::default())
            .await
            .unwrap();

        assert_eq!(handle.written_lines(), vec!["ENROLL"]);
        assert!(session.is_active());
        assert!(matches!(session.status(), EnrollmentStatus::Waiting { .. }));
        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failure_spawns_nothing() {
        let (session, connection, handle) = setup().await;
        handle.fail_writes(true);

        let result = session.start(&connection, SecurityLevel::default()).await;

        assert!(matches!(result, Err(Error::Transport(_))));
        assert!(!session.is_active());
        assert!(session.listener.lock().unwrap().is_none());
        assert_eq!(session.status(), EnrollmentStatus::NotEnrolling);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fails_session() {
        let (session, connection, _handle) = setup().await;

        session
            .start(&connection, SecurityLevel::default())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(61)).await;

        match session.status() {
            EnrollmentStatus::Failed { error } => {
                assert_eq!(error, "Timeout after 60000ms");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_joins_listener() {
        let (session, connection, _handle) = setup().await;

        session
            .start(&connection, SecurityLevel::default())
            .await
            .unwrap();
        session.shutdown().await;

        assert!(!session.is_active());
        assert!(session.listener.lock().unwrap().is_none());
    }

    /// A cancel while start waits for the connection wins over the start
    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_waiting_for_connection() {
        let (session, connection, handle) = setup().await;
        let session = Arc::new(session);

        let held = connection.lock().await;
        let start = tokio::spawn({
            let session = Arc::clone(&session);
            let connection = Arc::clone(&connection);
            async move { session.start(&connection, SecurityLevel::default()).await }
        });
        while session.store.phase() != EnrollmentPhase::Starting {
            tokio::task::yield_now().await;
        }

        session.cancel();
        drop(held);
        let result = start.await.unwrap();

        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(handle.written_lines().is_empty());
        assert!(session.listener.lock().unwrap().is_none());
        assert_eq!(session.status(), EnrollmentStatus::NotEnrolling);

        session
            .start(&connection, SecurityLevel::default())
            .await
            .unwrap();
        assert_eq!(handle.written_lines(), vec!["ENROLL"]);
        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_device_error_line_fails_verbatim() {
        let (session, connection, handle) = setup().await;
        handle.script_reply("ENROLL", &["ERROR:sensor timeout"]);

        session
            .start(&connection, SecurityLevel::default())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(
            session.status(),
            EnrollmentStatus::Failed {
                error: "ERROR:sensor timeout".to_string()
            }
        );
        session.shutdown().await;
    }
}
