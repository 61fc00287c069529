//! Retune workflow state machine
//!
//! A retune session progresses through 5 working states:
//! EXTRACTING → ANALYZING → CLASSIFYING → RETUNING → MUXING → COMPLETED

use akira_common::events::RetunePhase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Retune workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RetuneState {
    /// Audio track extraction from the uploaded video
    Extracting,
    /// STFT, MFCC, and loudness feature computation
    Analyzing,
    /// Per-segment overstimulation verdicts
    Classifying,
    /// Filtering, attenuation, and compression of flagged segments
    Retuning,
    /// Retuned audio muxed back under the original video track
    Muxing,
    /// Retune finished successfully
    Completed,
    /// Retune cancelled by user
    Cancelled,
    /// Retune failed with critical error
    Failed,
}

impl RetuneState {
    /// Equivalent event phase for SSE emission
    pub fn as_phase(&self) -> RetunePhase {
        match self {
            RetuneState::Extracting => RetunePhase::Extracting,
            RetuneState::Analyzing => RetunePhase::Analyzing,
            RetuneState::Classifying => RetunePhase::Classifying,
            RetuneState::Retuning => RetunePhase::Retuning,
            RetuneState::Muxing => RetunePhase::Muxing,
            RetuneState::Completed => RetunePhase::Completed,
            RetuneState::Cancelled => RetunePhase::Cancelled,
            RetuneState::Failed => RetunePhase::Failed,
        }
    }
}

/// State transition event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub session_id: Uuid,
    pub old_state: RetuneState,
    pub new_state: RetuneState,
    pub transitioned_at: DateTime<Utc>,
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ErrorSeverity {
    /// Warning: segment skipped, retune continues
    Warning,
    /// Critical: retune cannot continue
    Critical,
}

/// Retune error details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetuneSessionError {
    /// Stage or file that caused the error
    pub context: String,

    /// Error code (e.g., "FFMPEG_ERROR", "DECODE_ERROR")
    pub error_code: String,

    /// Human-readable error message
    pub error_message: String,

    /// Error severity
    pub severity: ErrorSeverity,

    /// When the error occurred
    pub occurred_at: DateTime<Utc>,
}

impl RetuneSessionError {
    /// Create new warning
    pub fn warning(context: String, error_code: String, error_message: String) -> Self {
        Self {
            context,
            error_code,
            error_message,
            severity: ErrorSeverity::Warning,
            occurred_at: Utc::now(),
        }
    }

    /// Create new critical error
    pub fn critical(context: String, error_code: String, error_message: String) -> Self {
        Self {
            context,
            error_code,
            error_message,
            severity: ErrorSeverity::Critical,
            occurred_at: Utc::now(),
        }
    }
}

/// Retune session (in-memory state)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetuneSession {
    /// Unique session identifier
    pub session_id: Uuid,

    /// Current workflow state
    pub state: RetuneState,

    /// Original filename of the uploaded video
    pub source_filename: String,

    /// SHA-256 of the uploaded video (upload deduplication)
    pub source_hash: String,

    /// Retune parameters
    pub parameters: crate::models::RetuneParameters,

    /// Progress tracking
    pub progress: RetuneProgress,

    /// Accumulated errors
    pub errors: Vec<RetuneSessionError>,

    /// Segments flagged as overstimulating
    pub flagged_segments: usize,

    /// Total segments classified
    pub total_segments: usize,

    /// Whole-track repetition verdict from autocorrelation
    pub repetition_detected: bool,

    /// Session start time
    pub started_at: DateTime<Utc>,

    /// Session end time (if completed/cancelled/failed)
    pub ended_at: Option<DateTime<Utc>>,
}

/// Progress tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetuneProgress {
    /// Work items processed in the current state
    pub current: usize,

    /// Total work items in the current state
    pub total: usize,

    /// Percentage complete (0.0 - 100.0)
    pub percentage: f64,

    /// Current operation description
    pub current_operation: String,

    /// Elapsed time (seconds)
    pub elapsed_seconds: u64,

    /// Estimated remaining time (seconds), None if unknown
    pub estimated_remaining_seconds: Option<u64>,
}

impl RetuneSession {
    /// Create new retune session
    pub fn new(
        source_filename: String,
        source_hash: String,
        parameters: crate::models::RetuneParameters,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            state: RetuneState::Extracting,
            source_filename,
            source_hash,
            parameters,
            progress: RetuneProgress::default(),
            errors: Vec::new(),
            flagged_segments: 0,
            total_segments: 0,
            repetition_detected: false,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to new state
    pub fn transition_to(&mut self, new_state: RetuneState) -> StateTransition {
        let transition = StateTransition {
            session_id: self.session_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        // Set end time for terminal states
        match new_state {
            RetuneState::Completed | RetuneState::Cancelled | RetuneState::Failed => {
                self.ended_at = Some(Utc::now());
            }
            _ => {}
        }

        transition
    }

    /// Update progress
    pub fn update_progress(&mut self, current: usize, total: usize, operation: String) {
        self.progress.current = current;
        self.progress.total = total;
        self.progress.percentage = if total > 0 {
            (current as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        self.progress.current_operation = operation;

        let elapsed = (Utc::now() - self.started_at).num_seconds() as u64;
        self.progress.elapsed_seconds = elapsed;

        // Estimate remaining time
        if current > 0 && total > current {
            let rate = elapsed as f64 / current as f64;
            let remaining = ((total - current) as f64 * rate) as u64;
            self.progress.estimated_remaining_seconds = Some(remaining);
        } else {
            self.progress.estimated_remaining_seconds = None;
        }
    }

    /// Add error to session
    pub fn add_error(&mut self, error: RetuneSessionError) {
        self.errors.push(error);
    }

    /// Check if session is terminal (finished)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            RetuneState::Completed | RetuneState::Cancelled | RetuneState::Failed
        )
    }

    /// Elapsed wall-clock time in seconds, frozen once the session ends
    pub fn duration_seconds(&self) -> u64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_seconds().max(0) as u64
    }
}

impl Default for RetuneProgress {
    fn default() -> Self {
        Self {
            current: 0,
            total: 0,
            percentage: 0.0,
            current_operation: String::from("Initializing..."),
            elapsed_seconds: 0,
            estimated_remaining_seconds: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RetuneParameters;

    fn session() -> RetuneSession {
        RetuneSession::new(
            "cartoon.mp4".to_string(),
            "deadbeef".to_string(),
            RetuneParameters::default(),
        )
    }

    // TC-SM-001: Given a new session, When created, Then state is EXTRACTING
    #[test]
    fn tc_sm_001_new_session_starts_extracting() {
        let session = session();
        assert_eq!(session.state, RetuneState::Extracting);
        assert!(session.ended_at.is_none());
        assert!(!session.is_terminal());
    }

    // TC-SM-002: Given a session, When transitioned through the pipeline,
    // Then each transition records old and new states
    #[test]
    fn tc_sm_002_transitions_record_states() {
        let mut session = session();
        let t = session.transition_to(RetuneState::Analyzing);
        assert_eq!(t.old_state, RetuneState::Extracting);
        assert_eq!(t.new_state, RetuneState::Analyzing);
        assert_eq!(session.state, RetuneState::Analyzing);
    }

    // TC-SM-003: Given a session, When transitioned to COMPLETED,
    // Then ended_at is set and the session is terminal
    #[test]
    fn tc_sm_003_terminal_states_set_end_time() {
        for terminal in [
            RetuneState::Completed,
            RetuneState::Cancelled,
            RetuneState::Failed,
        ] {
            let mut session = session();
            session.transition_to(terminal);
            assert!(session.ended_at.is_some());
            assert!(session.is_terminal());
        }
    }

    // TC-SM-004: Given progress updates, When total > 0,
    // Then percentage is derived from current/total
    #[test]
    fn tc_sm_004_progress_percentage() {
        let mut session = session();
        session.update_progress(25, 100, "Retuning segment 25".to_string());
        assert!((session.progress.percentage - 25.0).abs() < f64::EPSILON);
        assert_eq!(session.progress.current_operation, "Retuning segment 25");

        session.update_progress(0, 0, "Waiting".to_string());
        assert_eq!(session.progress.percentage, 0.0);
        assert!(session.progress.estimated_remaining_seconds.is_none());
    }

    // TC-SM-005: Given states, When converted to event phases,
    // Then the mapping is one-to-one on names
    #[test]
    fn tc_sm_005_state_serializes_uppercase() {
        let json = serde_json::to_string(&RetuneState::Classifying).unwrap();
        assert_eq!(json, "\"CLASSIFYING\"");
        assert_eq!(
            serde_json::to_string(&RetuneState::Classifying.as_phase()).unwrap(),
            json
        );
    }
}
