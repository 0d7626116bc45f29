//! Shared helpers for the scanner integration tests.
//!
//! Every test runs on a paused tokio clock, so `settle` advances virtual
//! time only and the listener gets to drain whatever the mock device sent.

#![allow(dead_code)]

use std::time::Duration;
use votekey_biometric::{FingerprintScanner, HandshakeConfig, ScannerConfig, StatusResponse};
use votekey_hardware::mock::{MockSerial, MockSerialHandle};

/// Config with the boot wait and banner polling cut to the minimum.
pub fn fast_config() -> ScannerConfig {
    ScannerConfig::default().with_handshake(HandshakeConfig {
        boot_delay: Duration::ZERO,
        attempts: 1,
        ..HandshakeConfig::default()
    })
}

/// Scanner attached to a fresh mock device.
pub async fn attached_scanner() -> (FingerprintScanner, MockSerialHandle) {
    let scanner = FingerprintScanner::new(fast_config());
    let (serial, device) = MockSerial::new();
    scanner.attach(serial).await.unwrap();
    (scanner, device)
}

/// Let background tasks run for a few poll intervals.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(300)).await;
}

/// Poll status until it stops waiting, the way the web layer does.
pub async fn poll_until_terminal(scanner: &FingerprintScanner) -> StatusResponse {
    loop {
        let status = scanner.get_enrollment_status();
        if status.is_terminal() {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}
