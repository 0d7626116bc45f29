//! Serializable records returned to collaborators.
//!
//! Field names and optional fields follow the JSON the web layer consumes,
//! so fields absent in a given shape are skipped rather than nulled. The one
//! exception is `fingerprint_id` on a no-match scan, which is an explicit
//! `null`.

use crate::scan::ScanOutcome;
use crate::status::EnrollmentStatus;
use serde::Serialize;
use votekey_core::constants::{
    MSG_COMPLETE, MSG_ENROLLMENT_STARTED, MSG_NO_MATCH, MSG_NOT_ENROLLING, MSG_SCAN_TIMEOUT,
    MSG_SCANNER_NOT_CONNECTED, MSG_SCANNER_READY,
};
use votekey_core::{SlotId, TemplateToken};

/// Answer to a start request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StartResponse {
    pub fn started() -> Self {
        Self {
            success: true,
            message: Some(MSG_ENROLLMENT_STARTED.to_string()),
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

/// Answer to a status poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub enrolled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waiting: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint_id: Option<SlotId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_data: Option<TemplateToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusResponse {
    fn failed(error: String) -> Self {
        Self {
            success: false,
            enrolled: false,
            waiting: Some(false),
            fingerprint_id: None,
            template_data: None,
            message: None,
            error: Some(error),
        }
    }

    /// Returns `true` if polling can stop.
    pub fn is_terminal(&self) -> bool {
        self.waiting != Some(true)
    }
}

impl From<EnrollmentStatus> for StatusResponse {
    fn from(status: EnrollmentStatus) -> Self {
        match status {
            EnrollmentStatus::Enrolled(result) => Self {
                success: true,
                enrolled: true,
                waiting: None,
                fingerprint_id: Some(result.slot_id),
                template_data: Some(result.template_token),
                message: Some(MSG_COMPLETE.to_string()),
                error: None,
            },
            EnrollmentStatus::Waiting { message } => Self {
                success: true,
                enrolled: false,
                waiting: Some(true),
                fingerprint_id: None,
                template_data: None,
                message: Some(message),
                error: None,
            },
            EnrollmentStatus::Failed { error } => Self::failed(error),
            EnrollmentStatus::NotEnrolling => Self::failed(MSG_NOT_ENROLLING.to_string()),
        }
    }
}

/// Answer to a scan request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResponse {
    pub scanned: bool,
    /// Outer `None` skips the field; `Some(None)` writes `null`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint_id: Option<Option<SlotId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_data: Option<TemplateToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ScanOutcome> for ScanResponse {
    fn from(outcome: ScanOutcome) -> Self {
        let empty = Self {
            scanned: false,
            fingerprint_id: None,
            template_data: None,
            message: None,
            error: None,
        };

        match outcome {
            ScanOutcome::Matched {
                slot_id,
                template_token,
            } => Self {
                scanned: true,
                fingerprint_id: Some(Some(slot_id)),
                template_data: Some(template_token),
                ..empty
            },
            ScanOutcome::NoMatch => Self {
                scanned: true,
                fingerprint_id: Some(None),
                message: Some(MSG_NO_MATCH.to_string()),
                ..empty
            },
            ScanOutcome::Error(error) => Self {
                error: Some(error),
                ..empty
            },
            ScanOutcome::Timeout => Self {
                message: Some(MSG_SCAN_TIMEOUT.to_string()),
                ..empty
            },
        }
    }
}

/// Plain acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AckResponse {
    pub success: bool,
}

impl AckResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Device health summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceStatus {
    pub connected: bool,
    pub message: String,
}

impl DeviceStatus {
    pub fn from_connected(connected: bool) -> Self {
        let message = if connected {
            MSG_SCANNER_READY
        } else {
            MSG_SCANNER_NOT_CONNECTED
        };
        Self {
            connected,
            message: message.to_string(),
        }
    }
}
