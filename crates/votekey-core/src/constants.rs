//! Core constants for the fingerprint sensor line protocol.
//!
//! This module defines the wire tokens, delimiters, and default timings used
//! throughout the votekey device-session layer. The sensor sits behind a
//! microcontroller that speaks a newline-delimited text protocol over a
//! serial link.
//!
//! # Protocol Structure
//!
//! Commands sent to the device are single words terminated by a newline:
//!
//! ```text
//! ENROLL\n
//! SCAN\n
//! ```
//!
//! Responses are free-text lines. Terminal responses are colon-delimited:
//!
//! ```text
//! ENROLL:SUCCESS:7
//! SCAN:MATCH:OK:3
//! SCAN:NO_MATCH
//! ERROR:sensor timeout
//! ```
//!
//! # Usage
//!
//! ```
//! use votekey_core::constants::*;
//! use std::time::Duration;
//!
//! assert_eq!(COMMAND_ENROLL, "ENROLL");
//! let budget = Duration::from_millis(DEFAULT_SCAN_TIMEOUT_MS);
//! assert_eq!(budget.as_secs(), 8);
//! ```

// ============================================================================
// Commands
// ============================================================================

/// Command that starts the multi-step enrollment dialogue.
pub const COMMAND_ENROLL: &str = "ENROLL";

/// Command that requests a one-shot scan.
pub const COMMAND_SCAN: &str = "SCAN";

/// Line terminator for both directions.
pub const LINE_TERMINATOR: u8 = b'\n';

// ============================================================================
// Response Tokens
// ============================================================================

/// Prefix of the enrollment success line.
///
/// ```
/// use votekey_core::constants::PREFIX_ENROLL_SUCCESS;
///
/// assert!("ENROLL:SUCCESS:7".starts_with(PREFIX_ENROLL_SUCCESS));
/// ```
pub const PREFIX_ENROLL_SUCCESS: &str = "ENROLL:SUCCESS:";

/// Prefix of the scan match line.
pub const PREFIX_SCAN_MATCH: &str = "SCAN:MATCH:";

/// Case-sensitive token reported when a scanned finger is not enrolled.
pub const TOKEN_SCAN_NO_MATCH: &str = "SCAN:NO_MATCH";

/// Case-insensitive phrase some firmware builds print instead of the token.
pub const PHRASE_NO_MATCH: &str = "no match";

/// Prefix of any device-reported error line.
pub const PREFIX_ERROR: &str = "ERROR:";

/// Field separator inside terminal response lines.
pub const DELIMITER_FIELD: char = ':';

/// Minimum number of fields in a well-formed success or match line.
///
/// `ENROLL:SUCCESS:7` has three fields; the slot id is the last one.
pub const MIN_TERMINAL_FIELDS: usize = 3;

/// Readiness banners printed by the sensor firmware after boot.
///
/// Matched case-insensitively as substrings.
pub const READY_TOKENS: [&str; 2] = ["READY", "Waiting"];

// ============================================================================
// Template Tokens
// ============================================================================

/// Leading marker of a template token.
///
/// ```text
/// FP_TEMPLATE_12_1700000000
/// ^^^^^^^^^^^
/// ```
pub const TEMPLATE_TOKEN_PREFIX: &str = "FP_TEMPLATE";

/// Separator between template token fields.
pub const DELIMITER_TEMPLATE: char = '_';

/// Index of the slot id after splitting a template token on
/// [`DELIMITER_TEMPLATE`].
///
/// ```
/// use votekey_core::constants::{DELIMITER_TEMPLATE, TEMPLATE_SLOT_FIELD};
///
/// let fields: Vec<&str> = "FP_TEMPLATE_12_1700000000".split(DELIMITER_TEMPLATE).collect();
/// assert_eq!(fields[TEMPLATE_SLOT_FIELD], "12");
/// ```
pub const TEMPLATE_SLOT_FIELD: usize = 2;

// ============================================================================
// Connection Defaults
// ============================================================================

/// Default serial port.
#[cfg(windows)]
pub const DEFAULT_PORT: &str = "COM4";

/// Default serial port.
#[cfg(not(windows))]
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Default baud rate of the sensor bridge.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Lowest sensor security level.
pub const MIN_SECURITY_LEVEL: u8 = 1;

/// Highest sensor security level.
pub const MAX_SECURITY_LEVEL: u8 = 5;

/// Security level used when the caller does not pick one.
pub const DEFAULT_SECURITY_LEVEL: u8 = 5;

// ============================================================================
// Timings (milliseconds)
// ============================================================================

/// Time the microcontroller needs to reboot after the port is opened.
///
/// Opening the port toggles DTR on most USB bridges, which resets the board.
pub const DEFAULT_BOOT_DELAY_MS: u64 = 3000;

/// Number of readiness polls after the boot delay.
pub const DEFAULT_HANDSHAKE_ATTEMPTS: u32 = 10;

/// Delay between readiness polls.
pub const DEFAULT_HANDSHAKE_INTERVAL_MS: u64 = 300;

/// Timeout of a single transport read.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 50;

/// Delay between empty reads in the enrollment listener.
pub const DEFAULT_LISTENER_POLL_MS: u64 = 50;

/// Delay between empty reads while waiting for a scan result.
pub const DEFAULT_SCAN_POLL_MS: u64 = 100;

/// Wall-clock budget of one scan, measured from the `SCAN` command.
pub const DEFAULT_SCAN_TIMEOUT_MS: u64 = 8000;

/// Wall-clock budget of one enrollment, measured from the `ENROLL` command.
pub const DEFAULT_ENROLL_TIMEOUT_MS: u64 = 60_000;

/// Longest line accepted from the device before the buffer is discarded.
pub const MAX_LINE_LENGTH: usize = 1024;

// ============================================================================
// Progress Messages
// ============================================================================

/// Message shown between `start` and the first device line.
pub const MSG_STARTING: &str = "Starting...";

/// Message shown while listening and no message has been recorded.
pub const MSG_PROCESSING: &str = "Processing...";

/// Error reported by a status read with no session in progress.
pub const MSG_NOT_ENROLLING: &str = "not enrolling";

/// First enrollment prompt.
pub const MSG_STEP_PLACE: &str = "Step 1/3: Place finger on sensor...";

/// Second enrollment prompt.
pub const MSG_STEP_REMOVE: &str = "Step 2/3: Remove finger...";

/// Third enrollment prompt.
pub const MSG_STEP_PLACE_AGAIN: &str = "Step 3/3: Place same finger again...";

/// Status message after a consumed enrollment result.
pub const MSG_COMPLETE: &str = "Complete!";

/// Message returned by an accepted enrollment start.
pub const MSG_ENROLLMENT_STARTED: &str = "Enrollment started";

/// Message returned when a scan finds no enrolled finger.
pub const MSG_NO_MATCH: &str = "No match";

/// Message returned when a scan budget elapses.
pub const MSG_SCAN_TIMEOUT: &str = "Timeout - no finger detected";

/// Device status when the link is open.
pub const MSG_SCANNER_READY: &str = "Scanner ready";

/// Device status when no link is open.
pub const MSG_SCANNER_NOT_CONNECTED: &str = "Scanner not connected";
