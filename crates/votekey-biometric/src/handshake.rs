//! Readiness probe run right after a port is opened.
//!
//! Opening a USB serial port resets most microcontroller boards, so the
//! probe first waits out the boot, then drops whatever the bootloader
//! printed, then polls for a banner. A silent device is still usable.

use crate::config::HandshakeConfig;
use crate::connection::Connection;
use tracing::{debug, trace, warn};
use votekey_core::Result;

/// How the handshake ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// A banner containing a readiness token arrived; holds the line.
    Ready(String),
    /// No banner within the attempt budget. The connection is kept.
    NoBanner,
}

impl HandshakeOutcome {
    /// Returns `true` if the device announced itself.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

fn is_ready_line(line: &str, tokens: &[String]) -> bool {
    let line = line.to_lowercase();
    tokens.iter().any(|t| line.contains(&t.to_lowercase()))
}

pub(crate) async fn perform(
    connection: &mut Connection,
    config: &HandshakeConfig,
) -> Result<HandshakeOutcome> {
    tokio::time::sleep(config.boot_delay).await;
    connection.clear_input()?;

    for attempt in 1..=config.attempts {
        debug!(attempt, attempts = config.attempts, "Waiting for readiness banner");

        while let Some(line) = connection.read_line().await? {
            if is_ready_line(&line, &config.ready_tokens) {
                debug!(banner = %line, attempt, "Scanner reported ready");
                return Ok(HandshakeOutcome::Ready(line));
            }
            trace!(line = %line, "Ignoring line during handshake");
        }

        if attempt < config.attempts {
            tokio::time::sleep(config.interval).await;
        }
    }

    warn!(
        attempts = config.attempts,
        "No readiness banner; continuing with connection"
    );
    Ok(HandshakeOutcome::NoBanner)
}
