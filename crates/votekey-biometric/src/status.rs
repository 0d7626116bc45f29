//! Shared session state written by the enrollment listener and read by
//! status callers.
//!
//! # Phases
//!
//! ```text
//! Idle -> Starting -> Listening -> Success | Failed
//!            |            |
//!            +-> Idle     +-> Idle (cancel)
//! ```
//!
//! `Success` and `Failed` are reported once by [`SessionStatusStore::take_status`]
//! and then fall back to `Idle`.
//!
//! # Generations
//!
//! Every accepted start bumps the generation. Listener writes carry the
//! generation they were spawned with and are dropped once it is stale, so a
//! listener orphaned by `cancel` cannot touch a newer session.
//!
//! Critical sections are plain `std::sync::Mutex` sections that never span
//! an `.await`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use votekey_core::constants::{MSG_PROCESSING, MSG_STARTING};
use votekey_core::{Error, Result, SlotId, TemplateToken};

/// Phase of the enrollment session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentPhase {
    #[default]
    Idle,
    Starting,
    Listening,
    Success,
    Failed,
}

impl EnrollmentPhase {
    /// Returns `true` while a session owns the device.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Starting | Self::Listening)
    }
}

/// Completed enrollment awaiting its first status read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentResult {
    pub slot_id: SlotId,
    pub template_token: TemplateToken,
}

impl EnrollmentResult {
    /// Build a result with a fresh token for `slot_id`.
    pub fn new(slot_id: SlotId) -> Self {
        Self {
            slot_id,
            template_token: TemplateToken::now(slot_id),
        }
    }
}

/// Most recent successful scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastMatch {
    pub slot_id: SlotId,
    pub matched_at: DateTime<Utc>,
}

/// What a status read observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentStatus {
    /// Enrollment finished; the result has now been consumed.
    Enrolled(EnrollmentResult),
    /// Enrollment in progress.
    Waiting { message: String },
    /// Enrollment ended without a result; reported once.
    Failed { error: String },
    /// Nothing to report.
    NotEnrolling,
}

#[derive(Debug, Default)]
struct SessionState {
    phase: EnrollmentPhase,
    generation: u64,
    message: String,
    result: Option<EnrollmentResult>,
    last_match: Option<LastMatch>,
}

impl SessionState {
    /// Listener writes are accepted only from the current, listening generation.
    fn owned_by(&self, generation: u64) -> bool {
        self.generation == generation && self.phase == EnrollmentPhase::Listening
    }

    fn reset(&mut self) {
        self.phase = EnrollmentPhase::Idle;
        self.message.clear();
        self.result = None;
    }
}

/// Lock-protected session state.
#[derive(Debug, Default)]
pub struct SessionStatusStore {
    state: Mutex<SessionState>,
}

impl SessionStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the session for a new enrollment.
    ///
    /// Clears any previous result and returns the new generation.
    ///
    /// # Errors
    /// Returns `Error::Busy` if a session is already starting or listening.
    pub fn try_begin(&self) -> Result<u64> {
        let mut state = self.lock();
        if state.phase.is_active() {
            return Err(Error::Busy);
        }

        state.generation += 1;
        state.phase = EnrollmentPhase::Starting;
        state.message = MSG_STARTING.to_string();
        state.result = None;
        Ok(state.generation)
    }

    /// Move a started session to `Listening` once its command is on the wire.
    pub fn mark_listening(&self, generation: u64) -> bool {
        let mut state = self.lock();
        if state.generation == generation && state.phase == EnrollmentPhase::Starting {
            state.phase = EnrollmentPhase::Listening;
            true
        } else {
            false
        }
    }

    /// Returns `true` while `generation` is started but not yet listening.
    pub fn is_starting(&self, generation: u64) -> bool {
        let state = self.lock();
        state.generation == generation && state.phase == EnrollmentPhase::Starting
    }

    /// Return a session whose command could not be sent to `Idle`.
    pub fn abort(&self, generation: u64) {
        let mut state = self.lock();
        if state.generation == generation && state.phase == EnrollmentPhase::Starting {
            state.reset();
        }
    }

    /// Returns `true` while the listener of `generation` should keep running.
    pub fn is_listening(&self, generation: u64) -> bool {
        self.lock().owned_by(generation)
    }

    /// Replace the progress message.
    pub fn record_progress(&self, generation: u64, message: impl Into<String>) -> bool {
        let mut state = self.lock();
        if !state.owned_by(generation) {
            return false;
        }
        state.message = message.into();
        true
    }

    /// Store the result and move to `Success`.
    pub fn complete(&self, generation: u64, result: EnrollmentResult) -> bool {
        let mut state = self.lock();
        if !state.owned_by(generation) {
            return false;
        }
        state.message = format!("Enrollment complete! ID: {}", result.slot_id);
        state.result = Some(result);
        state.phase = EnrollmentPhase::Success;
        true
    }

    /// Move to `Failed` with `error` as the message.
    pub fn fail(&self, generation: u64, error: impl Into<String>) -> bool {
        let mut state = self.lock();
        if !state.owned_by(generation) {
            return false;
        }
        state.message = error.into();
        state.result = None;
        state.phase = EnrollmentPhase::Failed;
        true
    }

    /// Report the session, consuming a terminal outcome.
    ///
    /// The result is taken under the lock, so of two concurrent readers
    /// exactly one sees `Enrolled`.
    pub fn take_status(&self) -> EnrollmentStatus {
        let mut state = self.lock();
        match state.phase {
            EnrollmentPhase::Success => match state.result.take() {
                Some(result) => {
                    state.reset();
                    EnrollmentStatus::Enrolled(result)
                }
                None => {
                    state.reset();
                    EnrollmentStatus::NotEnrolling
                }
            },
            EnrollmentPhase::Starting | EnrollmentPhase::Listening => {
                let message = if state.message.is_empty() {
                    MSG_PROCESSING.to_string()
                } else {
                    state.message.clone()
                };
                EnrollmentStatus::Waiting { message }
            }
            EnrollmentPhase::Failed => {
                let error = std::mem::take(&mut state.message);
                state.reset();
                EnrollmentStatus::Failed { error }
            }
            EnrollmentPhase::Idle => EnrollmentStatus::NotEnrolling,
        }
    }

    /// Drop any session. Always succeeds.
    pub fn cancel(&self) {
        self.lock().reset();
    }

    pub fn phase(&self) -> EnrollmentPhase {
        self.lock().phase
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Current progress message, without consuming anything.
    pub fn message(&self) -> String {
        self.lock().message.clone()
    }

    /// Cache a successful scan.
    pub fn record_match(&self, slot_id: SlotId) {
        self.lock().last_match = Some(LastMatch {
            slot_id,
            matched_at: Utc::now(),
        });
    }

    pub fn clear_last_match(&self) {
        self.lock().last_match = None;
    }

    pub fn last_match(&self) -> Option<LastMatch> {
        self.lock().last_match.clone()
    }
}
