//! Simulated sensor for `--mock` runs.

use anyhow::Result;
use std::time::Duration;
use tracing::warn;
use votekey_biometric::{FingerprintScanner, HandshakeOutcome};
use votekey_core::constants::{COMMAND_ENROLL, COMMAND_SCAN};
use votekey_hardware::mock::{MockSerial, MockSerialHandle};

/// Slot the simulated sensor assigns and matches.
const DEMO_SLOT: &str = "1";

/// Scan replies queued up front.
const DEMO_SCANS: usize = 16;

/// Attach a scripted mock device that enrolls into slot 1 and then matches it.
pub async fn attach(scanner: &FingerprintScanner) -> Result<(HandshakeOutcome, MockSerialHandle)> {
    let (serial, device) = MockSerial::new();

    let success = format!("ENROLL:SUCCESS:{DEMO_SLOT}");
    device.script_reply(
        COMMAND_ENROLL,
        &[
            "Place finger on sensor",
            "Remove finger",
            "Place same finger again",
            success.as_str(),
        ],
    );

    let matched = format!("SCAN:MATCH:{DEMO_SLOT}");
    for _ in 0..DEMO_SCANS {
        device.script_reply(COMMAND_SCAN, &[matched.as_str()]);
    }

    let banner = device.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if let Err(e) = banner.feed_line("Waiting for command").await {
            warn!(error = %e, "Simulated device could not send its banner");
        }
    });

    let outcome = scanner.attach(serial).await?;
    Ok((outcome, device))
}
