//! Line classifiers for enrollment and scan responses.
//!
//! Each classifier checks its rules in a fixed order and the first match
//! wins. Terminal prefixes are case-sensitive; prompt keywords are not.

use votekey_core::SlotId;
use votekey_core::constants::{
    MSG_STEP_PLACE, MSG_STEP_PLACE_AGAIN, MSG_STEP_REMOVE, PHRASE_NO_MATCH, PREFIX_ENROLL_SUCCESS,
    PREFIX_ERROR, PREFIX_SCAN_MATCH, TOKEN_SCAN_NO_MATCH,
};

/// Prompt steps of the three-step enrollment dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentStep {
    PlaceFinger,
    RemoveFinger,
    PlaceAgain,
}

impl EnrollmentStep {
    /// Progress message shown to the operator.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::PlaceFinger => MSG_STEP_PLACE,
            Self::RemoveFinger => MSG_STEP_REMOVE,
            Self::PlaceAgain => MSG_STEP_PLACE_AGAIN,
        }
    }
}

/// Meaning of one line received while enrolling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentLine {
    /// `ENROLL:SUCCESS:...` with a valid slot id.
    Success(SlotId),
    /// Success prefix with a missing or non-integer slot; holds the reason.
    Malformed(String),
    /// `ERROR:...`; holds the line verbatim.
    Failure(String),
    /// Recognized operator prompt.
    Prompt(EnrollmentStep),
    /// Anything else; holds the line.
    Progress(String),
}

impl EnrollmentLine {
    /// Returns `true` if the line ends the enrollment.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Success(_) | Self::Malformed(_) | Self::Failure(_)
        )
    }
}

/// Classify a line received during enrollment.
///
/// # Examples
///
/// ```
/// use votekey_biometric::classify::{classify_enrollment_line, EnrollmentLine, EnrollmentStep};
/// use votekey_core::SlotId;
///
/// assert_eq!(
///     classify_enrollment_line("ENROLL:SUCCESS:OK:7"),
///     EnrollmentLine::Success(SlotId::new(7))
/// );
/// assert_eq!(
///     classify_enrollment_line("Place same finger again"),
///     EnrollmentLine::Prompt(EnrollmentStep::PlaceAgain)
/// );
/// ```
pub fn classify_enrollment_line(line: &str) -> EnrollmentLine {
    if line.starts_with(PREFIX_ENROLL_SUCCESS) {
        return match SlotId::from_terminal_line(line) {
            Ok(slot) => EnrollmentLine::Success(slot),
            Err(e) => EnrollmentLine::Malformed(e.to_string()),
        };
    }

    if line.starts_with(PREFIX_ERROR) {
        return EnrollmentLine::Failure(line.to_string());
    }

    let lower = line.to_lowercase();
    if lower.contains("place") && lower.contains("again") {
        EnrollmentLine::Prompt(EnrollmentStep::PlaceAgain)
    } else if lower.contains("remove") {
        EnrollmentLine::Prompt(EnrollmentStep::RemoveFinger)
    } else if lower.contains("place") {
        EnrollmentLine::Prompt(EnrollmentStep::PlaceFinger)
    } else {
        EnrollmentLine::Progress(line.to_string())
    }
}

/// Meaning of one line received while scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanLine {
    Match(SlotId),
    /// Match prefix with a missing or non-integer slot; holds the reason.
    Malformed(String),
    NoMatch,
    /// `ERROR:...`; holds the line verbatim.
    Error(String),
}

/// Classify a line received during a scan.
///
/// Returns `None` for lines that carry no outcome (firmware chatter).
pub fn classify_scan_line(line: &str) -> Option<ScanLine> {
    if line.starts_with(PREFIX_SCAN_MATCH) {
        return Some(match SlotId::from_terminal_line(line) {
            Ok(slot) => ScanLine::Match(slot),
            Err(e) => ScanLine::Malformed(e.to_string()),
        });
    }

    if line.contains(TOKEN_SCAN_NO_MATCH) || line.to_lowercase().contains(PHRASE_NO_MATCH) {
        return Some(ScanLine::NoMatch);
    }

    if line.starts_with(PREFIX_ERROR) {
        return Some(ScanLine::Error(line.to_string()));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ENROLL:SUCCESS:7", EnrollmentLine::Success(SlotId::new(7)))]
    #[case("ENROLL:SUCCESS:OK:7", EnrollmentLine::Success(SlotId::new(7)))]
    #[case("ERROR:sensor timeout", EnrollmentLine::Failure("ERROR:sensor timeout".into()))]
    #[case("Place finger on sensor", EnrollmentLine::Prompt(EnrollmentStep::PlaceFinger))]
    #[case("PLACE FINGER", EnrollmentLine::Prompt(EnrollmentStep::PlaceFinger))]
    #[case("Remove finger", EnrollmentLine::Prompt(EnrollmentStep::RemoveFinger))]
    #[case("Place same finger again", EnrollmentLine::Prompt(EnrollmentStep::PlaceAgain))]
    #[case("Image converted", EnrollmentLine::Progress("Image converted".into()))]
    fn test_classify_enrollment_line(#[case] line: &str, #[case] expected: EnrollmentLine) {
        assert_eq!(classify_enrollment_line(line), expected);
    }

    #[rstest]
    #[case("ENROLL:SUCCESS:")]
    #[case("ENROLL:SUCCESS:abc")]
    #[case("ENROLL:SUCCESS:OK:x")]
    fn test_classify_enrollment_malformed(#[case] line: &str) {
        let classified = classify_enrollment_line(line);
        assert!(matches!(classified, EnrollmentLine::Malformed(ref m) if m.starts_with("Malformed response")));
        assert!(classified.is_terminal());
    }

    #[test]
    fn test_enrollment_success_prefix_wins_over_keywords() {
        // Prefix rules are checked before keyword rules
        assert!(matches!(
            classify_enrollment_line("ERROR:remove finger and place again"),
            EnrollmentLine::Failure(_)
        ));
        assert!(!classify_enrollment_line("Remove finger").is_terminal());
    }

    #[test]
    fn test_enrollment_step_messages() {
        assert_eq!(
            EnrollmentStep::PlaceFinger.message(),
            "Step 1/3: Place finger on sensor..."
        );
        assert_eq!(EnrollmentStep::RemoveFinger.message(), "Step 2/3: Remove finger...");
        assert_eq!(
            EnrollmentStep::PlaceAgain.message(),
            "Step 3/3: Place same finger again..."
        );
    }

    #[rstest]
    #[case("SCAN:MATCH:3", Some(ScanLine::Match(SlotId::new(3))))]
    #[case("SCAN:MATCH:OK:3", Some(ScanLine::Match(SlotId::new(3))))]
    #[case("SCAN:NO_MATCH", Some(ScanLine::NoMatch))]
    #[case("Result: No Match found", Some(ScanLine::NoMatch))]
    #[case("ERROR:bad image", Some(ScanLine::Error("ERROR:bad image".into())))]
    #[case("Waiting for finger", None)]
    #[case("scan:no_match", None)]
    fn test_classify_scan_line(#[case] line: &str, #[case] expected: Option<ScanLine>) {
        assert_eq!(classify_scan_line(line), expected);
    }

    #[test]
    fn test_classify_scan_malformed_match() {
        assert!(matches!(
            classify_scan_line("SCAN:MATCH:"),
            Some(ScanLine::Malformed(_))
        ));
    }
}
