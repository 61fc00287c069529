//! Phase 5: MUXING
//!
//! ffmpeg stream-copies the original video track and lays the retuned
//! audio under it. Intermediate WAVs are removed once the output exists.

use super::WorkflowOrchestrator;
use crate::models::{RetuneSession, RetuneState};
use crate::services::intake::SessionPaths;
use anyhow::Result;

impl WorkflowOrchestrator {
    /// Phase 5: MUXING - recombine retuned audio with the video
    pub(super) async fn phase_muxing(
        &self,
        mut session: RetuneSession,
        paths: &SessionPaths,
    ) -> Result<RetuneSession> {
        self.enter_state(
            &mut session,
            RetuneState::Muxing,
            "Muxing retuned audio into video...",
        )
        .await?;
        self.broadcast_progress(&session);

        tracing::info!(
            session_id = %session.session_id,
            "Phase 5: MUXING"
        );

        self.ffmpeg()
            .mux_audio(
                &paths.source_video(),
                &paths.retuned_wav(),
                &paths.output_video(),
            )
            .await?;

        if !paths.output_video().exists() {
            anyhow::bail!(
                "ffmpeg reported success but output is missing: {}",
                paths.output_video().display()
            );
        }

        // Work files are only needed between phases
        if let Err(e) = paths.cleanup_work_files() {
            tracing::warn!(
                session_id = %session.session_id,
                error = %e,
                "Failed to remove work files"
            );
        }

        session.update_progress(1, 1, "Retuned video written".to_string());
        crate::db::sessions::save_session(self.db(), &session).await?;
        self.broadcast_progress(&session);

        tracing::info!(
            session_id = %session.session_id,
            output = %paths.output_video().display(),
            "Muxing completed"
        );

        Ok(session)
    }
}
