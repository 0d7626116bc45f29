//! Tokio codec for the sensor bridge line protocol.
//!
//! The bridge speaks newline-delimited text. [`LineCodec`] implements:
//! - [`Decoder`]: extracts trimmed, UTF-8-decoded lines from raw bytes
//! - [`Encoder<SensorCommand>`]: writes the fixed command tokens
//!
//! # Wire Format
//!
//! ```text
//! host   -> device   ENROLL\n | SCAN\n
//! device -> host     <free text>\n
//! ```
//!
//! Decoding never fails on content. Invalid UTF-8 is replaced with
//! `U+FFFD` and blank lines are skipped. A line longer than the configured
//! limit is dropped whole with a warning: once an unterminated line passes
//! the limit the codec discards input up to and including the next
//! terminator, so no fragment of it is ever yielded as a line.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use tokio_util::codec::{Decoder, Encoder};
//! use votekey_biometric::codec::{LineCodec, SensorCommand};
//!
//! let mut codec = LineCodec::new();
//!
//! let mut out = BytesMut::new();
//! codec.encode(SensorCommand::Scan, &mut out).unwrap();
//! assert_eq!(&out[..], b"SCAN\n");
//!
//! let mut src = BytesMut::from(&b"SCAN:MATCH:3\r\nSCAN"[..]);
//! assert_eq!(codec.decode(&mut src).unwrap().as_deref(), Some("SCAN:MATCH:3"));
//! assert_eq!(codec.decode(&mut src).unwrap(), None);
//! ```

use bytes::{Buf, BytesMut};
use std::fmt;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;
use votekey_core::constants::{COMMAND_ENROLL, COMMAND_SCAN, LINE_TERMINATOR, MAX_LINE_LENGTH};
use votekey_core::{Error, Result};

/// Commands the host can send to the sensor bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorCommand {
    /// Begin the multi-step enrollment dialogue.
    Enroll,
    /// One-shot scan against the enrolled templates.
    Scan,
}

impl SensorCommand {
    /// Wire token without the terminator.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enroll => COMMAND_ENROLL,
            Self::Scan => COMMAND_SCAN,
        }
    }
}

impl fmt::Display for SensorCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Newline framing codec.
#[derive(Debug, Clone)]
pub struct LineCodec {
    /// Longest line accepted, terminator excluded.
    max_line_length: usize,
    /// Skipping the rest of an over-long line.
    is_discarding: bool,
}

impl LineCodec {
    /// Create a codec with the default line limit.
    pub fn new() -> Self {
        Self::with_max_line_length(MAX_LINE_LENGTH)
    }

    /// Create a codec with a custom line limit.
    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            max_line_length,
            is_discarding: false,
        }
    }

    /// Get the current line limit.
    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    /// Forget a partially discarded line. Called when the input is flushed.
    pub fn reset(&mut self) {
        self.is_discarding = false;
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = Error;

    /// Decode the next non-blank line.
    ///
    /// Returns `Ok(None)` when no complete line is buffered. Bytes after the
    /// last terminator stay in `src` for the next call.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            let terminator = src.iter().position(|&b| b == LINE_TERMINATOR);

            match (self.is_discarding, terminator) {
                (true, Some(pos)) => {
                    src.advance(pos + 1);
                    self.is_discarding = false;
                }
                (true, None) => {
                    src.clear();
                    return Ok(None);
                }
                (false, Some(pos)) if pos > self.max_line_length => {
                    warn!(
                        discarded = pos,
                        max_line_length = self.max_line_length,
                        "Discarding over-long line"
                    );
                    src.advance(pos + 1);
                }
                (false, Some(pos)) => {
                    let raw = src.split_to(pos);
                    src.advance(1);

                    let line = String::from_utf8_lossy(&raw).trim().to_string();
                    if !line.is_empty() {
                        return Ok(Some(line));
                    }
                }
                (false, None) if src.len() > self.max_line_length => {
                    warn!(
                        discarded = src.len(),
                        max_line_length = self.max_line_length,
                        "Discarding over-long unterminated line"
                    );
                    src.clear();
                    self.is_discarding = true;
                    return Ok(None);
                }
                (false, None) => return Ok(None),
            }
        }
    }
}

impl Encoder<SensorCommand> for LineCodec {
    type Error = Error;

    fn encode(&mut self, item: SensorCommand, dst: &mut BytesMut) -> Result<()> {
        let token = item.as_str().as_bytes();
        dst.reserve(token.len() + 1);
        dst.extend_from_slice(token);
        dst.extend_from_slice(&[LINE_TERMINATOR]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn decode_all(codec: &mut LineCodec, src: &mut BytesMut) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = codec.decode(src).unwrap() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn test_encode_commands() {
        let mut codec = LineCodec::new();
        let mut dst = BytesMut::new();

        codec.encode(SensorCommand::Enroll, &mut dst).unwrap();
        codec.encode(SensorCommand::Scan, &mut dst).unwrap();

        assert_eq!(&dst[..], b"ENROLL\nSCAN\n");
    }

    #[test]
    fn test_decode_partial_then_complete() {
        let mut codec = LineCodec::new();
        let mut src = BytesMut::from(&b"ENROLL:SUC"[..]);

        assert_eq!(codec.decode(&mut src).unwrap(), None);
        assert_eq!(src.len(), 10);

        src.extend_from_slice(b"CESS:7\n");
        assert_eq!(
            codec.decode(&mut src).unwrap().as_deref(),
            Some("ENROLL:SUCCESS:7")
        );
        assert!(src.is_empty());
    }

    #[test]
    fn test_decode_skips_blank_lines_and_trims() {
        let mut codec = LineCodec::new();
        let mut src = BytesMut::from(&b"\r\n   \n  Waiting for command \r\nREADY\n"[..]);

        assert_eq!(
            decode_all(&mut codec, &mut src),
            vec!["Waiting for command", "READY"]
        );
    }

    #[test]
    fn test_decode_invalid_utf8_is_replaced() {
        let mut codec = LineCodec::new();
        let mut src = BytesMut::from(&b"Place \xff finger\n"[..]);

        let line = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(line, "Place \u{fffd} finger");
    }

    #[test]
    fn test_decode_discards_over_long_line() {
        let mut codec = LineCodec::with_max_line_length(16);
        let mut src = BytesMut::from(&b"debug dump 0123456789abcdef "[..]);

        assert_eq!(codec.decode(&mut src).unwrap(), None);
        assert!(src.is_empty());

        // The tail of the dropped line never surfaces as a line of its own
        src.extend_from_slice(b"ERROR:blob");
        assert_eq!(codec.decode(&mut src).unwrap(), None);
        src.extend_from_slice(b"
READY
");
        assert_eq!(decode_all(&mut codec, &mut src), vec!["READY"]);
    }

    #[test]
    fn test_decode_drops_terminated_over_long_line() {
        let mut codec = LineCodec::with_max_line_length(8);
        let mut src = BytesMut::from(&b"0123456789
SCAN:NO_MATCH
"[..]);

        assert_eq!(decode_all(&mut codec, &mut src), vec!["SCAN:NO_MATCH"]);
    }

    #[test]
    fn test_reset_stops_discarding() {
        let mut codec = LineCodec::with_max_line_length(8);
        let mut src = BytesMut::from(&b"0123456789"[..]);
        codec.decode(&mut src).unwrap();

        codec.reset();
        src.extend_from_slice(b"READY
");
        assert_eq!(codec.decode(&mut src).unwrap().as_deref(), Some("READY"));
    }

    #[test]
    fn test_sensor_command_display() {
        assert_eq!(SensorCommand::Enroll.to_string(), "ENROLL");
        assert_eq!(SensorCommand::Scan.as_str(), "SCAN");
    }

    proptest! {
        #[test]
        fn prop_chunking_does_not_change_lines(
            lines in prop::collection::vec("[A-Za-z0-9:_ ]{1,40}", 1..8),
            split in 0usize..400,
        ) {
            let wire: Vec<u8> = lines
                .iter()
                .flat_map(|l| l.bytes().chain(std::iter::once(b'\n')))
                .collect();
            let split = split.min(wire.len());

            let mut codec = LineCodec::new();
            let mut src = BytesMut::from(&wire[..split]);
            let mut decoded = decode_all(&mut codec, &mut src);
            src.extend_from_slice(&wire[split..]);
            decoded.extend(decode_all(&mut codec, &mut src));

            let expected: Vec<String> = lines
                .iter()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect();
            prop_assert_eq!(decoded, expected);
        }

        #[test]
        fn prop_decode_never_fails(bytes in prop::collection::vec(any::<u8>(), 0..2048)) {
            let mut codec = LineCodec::with_max_line_length(256);
            let mut src = BytesMut::from(&bytes[..]);
            while codec.decode(&mut src).unwrap().is_some() {}
            prop_assert!(src.len() <= 256);
        }
    }
}
