use crate::{
    Result,
    constants::{
        DEFAULT_SECURITY_LEVEL, DELIMITER_FIELD, DELIMITER_TEMPLATE, MAX_SECURITY_LEVEL,
        MIN_SECURITY_LEVEL, MIN_TERMINAL_FIELDS, TEMPLATE_SLOT_FIELD, TEMPLATE_TOKEN_PREFIX,
    },
    error::Error,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sensor slot holding one enrolled fingerprint template.
///
/// Slots are assigned by the sensor firmware. On the collaborator interface
/// they travel as decimal strings (`"7"`), so serde uses the string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SlotId(u16);

impl SlotId {
    /// Create a slot id from its raw number.
    #[must_use]
    pub const fn new(slot: u16) -> Self {
        SlotId(slot)
    }

    /// Get the raw slot number.
    #[must_use]
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Extract the slot id from a colon-delimited terminal line.
    ///
    /// The line must have at least three fields; the slot is the final one.
    /// That is field index 2 for `ENROLL:SUCCESS:7` and index 3 for
    /// `ENROLL:SUCCESS:OK:7`.
    ///
    /// # Errors
    /// Returns `Error::MalformedResponse` if the line has too few fields or
    /// the final field is not an integer.
    ///
    /// # Examples
    ///
    /// ```
    /// use votekey_core::SlotId;
    ///
    /// let slot = SlotId::from_terminal_line("SCAN:MATCH:OK:3").unwrap();
    /// assert_eq!(slot.as_u16(), 3);
    /// assert!(SlotId::from_terminal_line("SCAN:MATCH").is_err());
    /// ```
    pub fn from_terminal_line(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split(DELIMITER_FIELD).collect();
        if fields.len() < MIN_TERMINAL_FIELDS {
            return Err(Error::MalformedResponse(format!(
                "expected at least {MIN_TERMINAL_FIELDS} fields in {line:?}"
            )));
        }

        let raw = fields[fields.len() - 1];
        raw.parse().map_err(|_| {
            Error::MalformedResponse(format!("slot id {raw:?} is not an integer in {line:?}"))
        })
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SlotId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u16>()
            .map(SlotId)
            .map_err(|_| Error::MalformedResponse(format!("Invalid slot id: {s}")))
    }
}

impl From<SlotId> for String {
    fn from(slot: SlotId) -> Self {
        slot.to_string()
    }
}

impl TryFrom<String> for SlotId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Opaque stand-in for one enrollment or scan event.
///
/// The token carries no biometric payload. It is rendered as
/// `FP_TEMPLATE_<slot>_<unix seconds>` so a collaborator that stored it can
/// recover the slot by splitting on `_` and taking the third field.
///
/// Equality compares the slot only; the timestamp portion never takes part.
///
/// # Examples
///
/// ```
/// use votekey_core::{SlotId, TemplateToken};
///
/// let token = TemplateToken::now(SlotId::new(12));
/// let rendered = token.to_string();
/// assert_eq!(rendered.split('_').nth(2), Some("12"));
///
/// let parsed: TemplateToken = rendered.parse().unwrap();
/// assert_eq!(parsed, token);
/// ```
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TemplateToken {
    slot_id: SlotId,
    issued_at: i64,
}

impl TemplateToken {
    /// Build a token for `slot_id` acquired at `at`.
    #[must_use]
    pub fn new(slot_id: SlotId, at: DateTime<Utc>) -> Self {
        Self {
            slot_id,
            issued_at: at.timestamp(),
        }
    }

    /// Build a token for `slot_id` stamped with the current time.
    #[must_use]
    pub fn now(slot_id: SlotId) -> Self {
        Self::new(slot_id, Utc::now())
    }

    /// Slot the token refers to.
    #[must_use]
    pub fn slot_id(&self) -> SlotId {
        self.slot_id
    }

    /// Acquisition time as unix seconds.
    #[must_use]
    pub fn issued_at(&self) -> i64 {
        self.issued_at
    }
}

impl PartialEq for TemplateToken {
    fn eq(&self, other: &Self) -> bool {
        self.slot_id == other.slot_id
    }
}

impl fmt::Display for TemplateToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{TEMPLATE_TOKEN_PREFIX}{DELIMITER_TEMPLATE}{}{DELIMITER_TEMPLATE}{}",
            self.slot_id, self.issued_at
        )
    }
}

impl std::str::FromStr for TemplateToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidTemplateToken(s.to_string());

        let fields: Vec<&str> = s.split(DELIMITER_TEMPLATE).collect();
        if fields.len() != TEMPLATE_SLOT_FIELD + 2
            || fields[..TEMPLATE_SLOT_FIELD].join("_") != TEMPLATE_TOKEN_PREFIX
        {
            return Err(invalid());
        }

        let slot_id = fields[TEMPLATE_SLOT_FIELD]
            .parse::<u16>()
            .map(SlotId)
            .map_err(|_| invalid())?;
        let issued_at = fields[TEMPLATE_SLOT_FIELD + 1]
            .parse::<i64>()
            .map_err(|_| invalid())?;

        Ok(Self { slot_id, issued_at })
    }
}

impl From<TemplateToken> for String {
    fn from(token: TemplateToken) -> Self {
        token.to_string()
    }
}

impl TryFrom<String> for TemplateToken {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Sensor matching strictness (1 = lenient, 5 = strict).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SecurityLevel(u8);

impl SecurityLevel {
    /// Create a security level with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidSecurityLevel` outside the range 1-5.
    pub fn new(level: u8) -> Result<Self> {
        if !(MIN_SECURITY_LEVEL..=MAX_SECURITY_LEVEL).contains(&level) {
            return Err(Error::InvalidSecurityLevel {
                level,
                min: MIN_SECURITY_LEVEL,
                max: MAX_SECURITY_LEVEL,
            });
        }
        Ok(SecurityLevel(level))
    }

    /// Get the raw level.
    #[must_use]
    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

impl Default for SecurityLevel {
    fn default() -> Self {
        SecurityLevel(DEFAULT_SECURITY_LEVEL)
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for SecurityLevel {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        SecurityLevel::new(value)
    }
}

impl From<SecurityLevel> for u8 {
    fn from(level: SecurityLevel) -> Self {
        level.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    #[case("ENROLL:SUCCESS:7", 7)]
    #[case("ENROLL:SUCCESS:OK:7", 7)]
    #[case("SCAN:MATCH:3", 3)]
    #[case("SCAN:MATCH:OK:127", 127)]
    fn test_slot_from_terminal_line(#[case] line: &str, #[case] expected: u16) {
        let slot = SlotId::from_terminal_line(line).unwrap();
        assert_eq!(slot.as_u16(), expected);
    }

    #[rstest]
    #[case("ENROLL:SUCCESS")] // too few fields
    #[case("ENROLL:SUCCESS:")] // empty slot
    #[case("SCAN:MATCH:OK")] // slot not numeric
    #[case("SCAN:MATCH:-1")] // negative
    fn test_slot_from_terminal_line_malformed(#[case] line: &str) {
        let result = SlotId::from_terminal_line(line);
        assert!(matches!(result, Err(Error::MalformedResponse(_))));
    }

    #[test]
    fn test_slot_id_serializes_as_string() {
        let json = serde_json::to_string(&SlotId::new(7)).unwrap();
        assert_eq!(json, "\"7\"");

        let slot: SlotId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(slot, SlotId::new(42));
    }

    #[test]
    fn test_template_token_format() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let token = TemplateToken::new(SlotId::new(12), at);
        assert_eq!(token.to_string(), "FP_TEMPLATE_12_1700000000");
    }

    #[test]
    fn test_template_token_third_field_is_slot() {
        let token = TemplateToken::now(SlotId::new(12));
        let rendered = token.to_string();
        let fields: Vec<&str> = rendered.split('_').collect();
        assert_eq!(fields[2], "12");
    }

    #[test]
    fn test_template_token_equality_ignores_timestamp() {
        let early = TemplateToken::new(SlotId::new(4), Utc.timestamp_opt(10, 0).unwrap());
        let late = TemplateToken::new(SlotId::new(4), Utc.timestamp_opt(99_999, 0).unwrap());
        let other = TemplateToken::new(SlotId::new(5), Utc.timestamp_opt(10, 0).unwrap());

        assert_eq!(early, late);
        assert_ne!(early, other);
    }

    #[rstest]
    #[case("FP_TEMPLATE_12")]
    #[case("FP_TEMPLATE_x_1700000000")]
    #[case("FP_TEMPLATE_12_abc")]
    #[case("TEMPLATE_12_1700000000")]
    #[case("FP_TEMPLATE_12_1700000000_extra")]
    #[case("")]
    fn test_template_token_invalid(#[case] input: &str) {
        let result: Result<TemplateToken> = input.parse();
        assert!(matches!(result, Err(Error::InvalidTemplateToken(_))));
    }

    #[test]
    fn test_template_token_serde_round_trip() {
        let token = TemplateToken::new(SlotId::new(9), Utc.timestamp_opt(1_234, 0).unwrap());
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, "\"FP_TEMPLATE_9_1234\"");

        let back: TemplateToken = serde_json::from_str(&json).unwrap();
        assert_eq!(back.issued_at(), 1_234);
        assert_eq!(back.slot_id(), SlotId::new(9));
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(5)]
    fn test_security_level_valid(#[case] level: u8) {
        assert_eq!(SecurityLevel::new(level).unwrap().as_u8(), level);
    }

    #[rstest]
    #[case(0)]
    #[case(6)]
    #[case(255)]
    fn test_security_level_invalid(#[case] level: u8) {
        assert!(matches!(
            SecurityLevel::new(level),
            Err(Error::InvalidSecurityLevel { .. })
        ));
    }

    #[test]
    fn test_security_level_default() {
        assert_eq!(SecurityLevel::default().as_u8(), DEFAULT_SECURITY_LEVEL);
    }
}
