//! One-shot scan bounded by a wall-clock budget.

use crate::classify::{ScanLine, classify_scan_line};
use crate::codec::SensorCommand;
use crate::config::ScannerConfig;
use crate::connection::SharedConnection;
use crate::status::SessionStatusStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use votekey_core::{Error, SlotId, TemplateToken};

/// Final classification of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The sensor matched an enrolled template.
    Matched {
        slot_id: SlotId,
        template_token: TemplateToken,
    },
    /// A finger was read but matched nothing.
    NoMatch,
    /// Device error line, malformed result or transport fault.
    Error(String),
    /// No outcome within the budget.
    Timeout,
}

impl ScanOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }
}

/// Scan runner sharing the last-match cache with the enrollment session.
#[derive(Debug)]
pub struct ScanSession {
    store: Arc<SessionStatusStore>,
    poll_interval: Duration,
    timeout: Duration,
}

impl ScanSession {
    pub fn new(store: Arc<SessionStatusStore>, config: &ScannerConfig) -> Self {
        Self {
            store,
            poll_interval: config.scan_poll,
            timeout: config.scan_timeout,
        }
    }

    /// Send `SCAN` and poll until an outcome line arrives or the budget runs out.
    ///
    /// Never fails: every fault is folded into [`ScanOutcome::Error`].
    /// A match refreshes the last-match cache; any other outcome clears it,
    /// so a cached match is always the most recent scan's.
    pub async fn scan(&self, connection: &SharedConnection) -> ScanOutcome {
        let outcome = self.poll(connection).await;

        match &outcome {
            ScanOutcome::Matched { slot_id, .. } => self.store.record_match(*slot_id),
            _ => self.store.clear_last_match(),
        }
        outcome
    }

    async fn poll(&self, connection: &SharedConnection) -> ScanOutcome {
        if let Err(e) = connection.lock().await.send(SensorCommand::Scan).await {
            warn!(error = %e, "Failed to send scan command");
            return ScanOutcome::Error(e.to_string());
        }
        let deadline = Instant::now() + self.timeout;

        loop {
            if Instant::now() >= deadline {
                info!(error = %Error::timeout(self.timeout), "Scan timed out");
                return ScanOutcome::Timeout;
            }

            let read = connection.lock().await.read_line().await;
            match read {
                Ok(Some(line)) => match classify_scan_line(&line) {
                    Some(classified) => return Self::resolve(classified),
                    None => debug!(line = %line, "Ignoring line during scan"),
                },
                Ok(None) => tokio::time::sleep(self.poll_interval).await,
                Err(e) => {
                    warn!(error = %e, disconnect = e.is_disconnect(), "Scan transport failure");
                    return ScanOutcome::Error(e.to_string());
                }
            }
        }
    }

    fn resolve(classified: ScanLine) -> ScanOutcome {
        match classified {
            ScanLine::Match(slot_id) => {
                info!(slot_id = %slot_id, "Fingerprint matched");
                ScanOutcome::Matched {
                    slot_id,
                    template_token: TemplateToken::now(slot_id),
                }
            }
            ScanLine::Malformed(reason) => {
                warn!(reason = %reason, "Malformed scan result");
                ScanOutcome::Error(reason)
            }
            ScanLine::NoMatch => {
                info!("No fingerprint match");
                ScanOutcome::NoMatch
            }
            ScanLine::Error(line) => {
                warn!(line = %line, "Device reported scan error");
                ScanOutcome::Error(Error::Protocol(line).to_string())
            }
        }
    }
}
