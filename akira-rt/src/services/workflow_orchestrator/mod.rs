//! Retune workflow orchestrator
//!
//! Coordinates a retune session through all states:
//! EXTRACTING → ANALYZING → CLASSIFYING → RETUNING → MUXING → COMPLETED
//!
//! Each state is handled by a dedicated `phase_*` method in its own
//! module. Phases hand the decoded track and analysis results forward
//! through [`PipelineData`]; the session itself is persisted after every
//! state change so a status poll or page reload always sees current
//! progress.

use crate::models::{RetuneSession, RetuneState};
use crate::services::ffmpeg_client::FfmpegClient;
use crate::services::intake::SessionPaths;
use akira_common::events::{AkiraEvent, EventBus};
use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use std::path::PathBuf;

mod phase_analyzing;
mod phase_classifying;
mod phase_extracting;
mod phase_muxing;
mod phase_retuning;

use crate::dsp::{FlaggedInterval, OverstimDetector};

/// Decoded audio and analysis results carried between phases
#[derive(Debug, Default)]
pub(super) struct PipelineData {
    /// Mono samples at the analysis sample rate
    pub samples: Vec<f32>,
    /// Sample rate of `samples`
    pub sample_rate: u32,
    /// Track duration in seconds
    pub duration_seconds: f32,
    /// Frame-aligned feature envelopes from the analysis phase
    pub features: Option<crate::dsp::detector::FrameFeatures>,
    /// Merged flagged intervals from the detector
    pub intervals: Vec<FlaggedInterval>,
    /// Whole-track repetition verdict
    pub repetition_detected: bool,
    /// Per-segment verdicts awaiting retuning
    pub segments: Vec<crate::models::FlaggedSegment>,
}

/// Workflow orchestrator service
pub struct WorkflowOrchestrator {
    db: SqlitePool,
    event_bus: EventBus,
    root_folder: PathBuf,
    ffmpeg: FfmpegClient,
}

impl WorkflowOrchestrator {
    /// Create new workflow orchestrator
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        root_folder: PathBuf,
        ffmpeg: FfmpegClient,
    ) -> Self {
        Self {
            db,
            event_bus,
            root_folder,
            ffmpeg,
        }
    }

    /// Execute complete retune workflow
    ///
    /// Progresses through all states, respecting the cancellation token
    /// between phases. On cancellation the session is returned in the
    /// CANCELLED state; errors bubble up for [`handle_failure`].
    ///
    /// [`handle_failure`]: WorkflowOrchestrator::handle_failure
    pub async fn execute_retune(
        &self,
        mut session: RetuneSession,
        cancel_token: tokio_util::sync::CancellationToken,
    ) -> Result<RetuneSession> {
        let start_time = std::time::Instant::now();
        let paths = SessionPaths::locate(&self.root_folder, session.session_id);

        tracing::info!(
            session_id = %session.session_id,
            source = %session.source_filename,
            "Starting retune workflow"
        );

        self.event_bus.emit_lossy(AkiraEvent::RetuneSessionStarted {
            session_id: session.session_id,
            source_file: session.source_filename.clone(),
            timestamp: Utc::now(),
        });

        let mut data = PipelineData::default();

        // Phase 1: EXTRACTING - pull the audio track out of the video
        session = self
            .phase_extracting(session, &paths, &mut data)
            .await?;
        if self.check_cancelled(&mut session, &cancel_token).await? {
            return Ok(session);
        }

        // Phase 2: ANALYZING - STFT, MFCC, and loudness envelopes
        session = self
            .phase_analyzing(session, &mut data)
            .await?;
        if self.check_cancelled(&mut session, &cancel_token).await? {
            return Ok(session);
        }

        // Phase 3: CLASSIFYING - per-segment overstimulation verdicts
        session = self
            .phase_classifying(session, &mut data)
            .await?;
        if self.check_cancelled(&mut session, &cancel_token).await? {
            return Ok(session);
        }

        // Phase 4: RETUNING - soften flagged segments, write the new track
        session = self
            .phase_retuning(session, &paths, &mut data, &cancel_token)
            .await?;
        if self.check_cancelled(&mut session, &cancel_token).await? {
            return Ok(session);
        }

        // Phase 5: MUXING - recombine with the original video
        session = self
            .phase_muxing(session, &paths)
            .await?;

        // Phase 6: COMPLETED
        let duration_seconds = start_time.elapsed().as_secs();
        session.transition_to(RetuneState::Completed);
        session.update_progress(
            session.progress.total,
            session.progress.total,
            format!(
                "Retune completed in {}",
                akira_common::time::format_hms(duration_seconds)
            ),
        );
        crate::db::sessions::save_session(&self.db, &session).await?;

        tracing::info!(
            session_id = %session.session_id,
            flagged = session.flagged_segments,
            total = session.total_segments,
            duration_seconds,
            "Retune workflow completed successfully"
        );

        self.event_bus
            .emit_lossy(AkiraEvent::RetuneSessionCompleted {
                session_id: session.session_id,
                flagged_segments: session.flagged_segments,
                total_segments: session.total_segments,
                duration_seconds,
                timestamp: Utc::now(),
            });

        Ok(session)
    }

    /// Mark a failed session and broadcast the failure
    pub async fn handle_failure(
        &self,
        mut session: RetuneSession,
        error: &anyhow::Error,
    ) -> Result<RetuneSession> {
        tracing::error!(
            session_id = %session.session_id,
            error = ?error,
            "Retune workflow failed"
        );

        session.transition_to(RetuneState::Failed);
        session.update_progress(
            session.progress.current,
            session.progress.total,
            format!("Retune failed: {}", error),
        );

        crate::db::sessions::save_session(&self.db, &session).await?;

        self.event_bus.emit_lossy(AkiraEvent::RetuneSessionFailed {
            session_id: session.session_id,
            error: error.to_string(),
            timestamp: Utc::now(),
        });

        Ok(session)
    }

    /// Finish a cancelled session between phases
    ///
    /// Returns `true` when the token fired, which ends the workflow
    /// early; `false` lets the next phase run.
    async fn check_cancelled(
        &self,
        session: &mut RetuneSession,
        cancel_token: &tokio_util::sync::CancellationToken,
    ) -> Result<bool> {
        if !cancel_token.is_cancelled() {
            return Ok(false);
        }

        session.transition_to(RetuneState::Cancelled);
        session.update_progress(
            session.progress.current,
            session.progress.total,
            "Retune cancelled by user".to_string(),
        );
        crate::db::sessions::save_session(&self.db, session).await?;

        tracing::info!(session_id = %session.session_id, "Retune workflow cancelled");

        self.event_bus
            .emit_lossy(AkiraEvent::RetuneSessionCancelled {
                session_id: session.session_id,
                timestamp: Utc::now(),
            });

        Ok(true)
    }

    /// Transition a session and broadcast the state change
    pub(super) async fn enter_state(
        &self,
        session: &mut RetuneSession,
        new_state: RetuneState,
        operation: &str,
    ) -> Result<()> {
        let transition = session.transition_to(new_state);
        session.update_progress(0, session.progress.total, operation.to_string());
        crate::db::sessions::save_session(&self.db, session).await?;

        self.event_bus.emit_lossy(AkiraEvent::RetuneStateChanged {
            session_id: session.session_id,
            old_state: transition.old_state.as_phase(),
            new_state: transition.new_state.as_phase(),
            timestamp: Utc::now(),
        });

        Ok(())
    }

    /// Broadcast progress update event
    pub(super) fn broadcast_progress(&self, session: &RetuneSession) {
        self.event_bus
            .emit_lossy(AkiraEvent::RetuneProgressUpdate {
                session_id: session.session_id,
                state: session.state.as_phase(),
                current: session.progress.current,
                total: session.progress.total,
                percentage: session.progress.percentage,
                operation: session.progress.current_operation.clone(),
                timestamp: Utc::now(),
            });
    }

    /// Detector configured from the session's thresholds
    pub(super) fn detector(&self, session: &RetuneSession) -> OverstimDetector {
        OverstimDetector::new(session.parameters.thresholds.clone())
    }

    pub(super) fn db(&self) -> &SqlitePool {
        &self.db
    }

    pub(super) fn ffmpeg(&self) -> &FfmpegClient {
        &self.ffmpeg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FlaggedSegment, RetuneParameters};
    use tokio_util::sync::CancellationToken;

    async fn orchestrator(root: &std::path::Path) -> WorkflowOrchestrator {
        WorkflowOrchestrator::new(
            crate::db::test_pool().await,
            EventBus::new(16),
            root.to_path_buf(),
            FfmpegClient::unchecked("ffmpeg"),
        )
    }

    fn test_session() -> RetuneSession {
        RetuneSession::new(
            "cartoon.mp4".to_string(),
            "deadbeef".to_string(),
            RetuneParameters::default(),
        )
    }

    // TC-ORCH-001: Given an uncancelled token, When checked between phases,
    // Then the session is untouched and the workflow continues
    #[tokio::test]
    async fn tc_orch_001_uncancelled_token_continues() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path()).await;
        let mut session = test_session();
        let token = CancellationToken::new();

        let cancelled = orch.check_cancelled(&mut session, &token).await.unwrap();

        assert!(!cancelled);
        assert_eq!(session.state, RetuneState::Extracting);
        assert!(session.ended_at.is_none());
    }

    // TC-ORCH-002: Given a cancelled token, When checked between phases,
    // Then the session finishes CANCELLED and is persisted
    #[tokio::test]
    async fn tc_orch_002_cancelled_token_finishes_session() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path()).await;
        let mut session = test_session();
        let token = CancellationToken::new();
        token.cancel();

        let cancelled = orch.check_cancelled(&mut session, &token).await.unwrap();

        assert!(cancelled);
        assert_eq!(session.state, RetuneState::Cancelled);
        assert!(session.ended_at.is_some());

        let stored = crate::db::sessions::load_session(&orch.db, session.session_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.state, RetuneState::Cancelled);
    }

    // TC-ORCH-003: Given cancellation before the first flagged segment,
    // When the retune phase runs, Then no audio is touched and no
    // retuned track is written
    #[tokio::test]
    async fn tc_orch_003_retune_loop_observes_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path()).await;
        let session = test_session();
        let paths = SessionPaths::create(dir.path(), session.session_id).unwrap();

        let mut data = PipelineData {
            samples: vec![0.5; 44_100],
            sample_rate: 44_100,
            duration_seconds: 1.0,
            segments: vec![FlaggedSegment {
                segment_index: 0,
                start_seconds: 0.0,
                end_seconds: 1.0,
                coverage: 1.0,
                overstimulating: true,
                retuned: false,
            }],
            ..PipelineData::default()
        };

        let token = CancellationToken::new();
        token.cancel();

        let session = orch
            .phase_retuning(session, &paths, &mut data, &token)
            .await
            .unwrap();

        assert_eq!(session.state, RetuneState::Retuning);
        assert!(data.samples.iter().all(|&s| s == 0.5));
        assert!(!paths.retuned_wav().exists());
        assert!(!data.segments[0].retuned);
    }
}
