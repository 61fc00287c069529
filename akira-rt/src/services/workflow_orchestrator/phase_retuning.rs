//! Phase 4: RETUNING
//!
//! Flagged segments are softened in place: Butterworth band shaping,
//! amplitude reduction, edge fades, then tanh compression. Non-flagged
//! segments pass through untouched. The processed track lands in
//! `work/retuned.wav` for the mux phase.

use super::{PipelineData, WorkflowOrchestrator};
use crate::dsp::retune::retune_segment;
use crate::models::{RetuneSession, RetuneState};
use crate::services::intake::SessionPaths;
use crate::utils::write_mono_wav;
use anyhow::Result;

impl WorkflowOrchestrator {
    /// Phase 4: RETUNING - soften flagged segments
    ///
    /// The cancellation token is observed between segments; on
    /// cancellation the phase returns early and the caller finishes the
    /// session in the CANCELLED state.
    pub(super) async fn phase_retuning(
        &self,
        mut session: RetuneSession,
        paths: &SessionPaths,
        data: &mut PipelineData,
        cancel_token: &tokio_util::sync::CancellationToken,
    ) -> Result<RetuneSession> {
        let flagged: Vec<(usize, f32, f32)> = data
            .segments
            .iter()
            .filter(|s| s.overstimulating)
            .map(|s| (s.segment_index, s.start_seconds, s.end_seconds))
            .collect();

        self.enter_state(
            &mut session,
            RetuneState::Retuning,
            &format!("Retuning {} flagged segments...", flagged.len()),
        )
        .await?;
        session.progress.total = flagged.len().max(1);
        self.broadcast_progress(&session);

        tracing::info!(
            session_id = %session.session_id,
            flagged = flagged.len(),
            "Phase 4: RETUNING"
        );

        let settings = session.parameters.retune.clone();
        let sample_rate = data.sample_rate;
        let mut samples = std::mem::take(&mut data.samples);

        let total = flagged.len().max(1);
        let mut processed = 0usize;
        for (index, start_seconds, end_seconds) in &flagged {
            if cancel_token.is_cancelled() {
                tracing::info!(
                    session_id = %session.session_id,
                    retuned = processed,
                    "Retuning interrupted by cancellation"
                );
                data.samples = samples;
                return Ok(session);
            }

            let start = (*start_seconds * sample_rate as f32) as usize;
            let end = ((*end_seconds * sample_rate as f32) as usize).min(samples.len());
            if start >= end {
                tracing::warn!(
                    session_id = %session.session_id,
                    segment_index = index,
                    "Skipping empty flagged segment"
                );
                continue;
            }

            // Filtering an individual segment is short; run it inline
            retune_segment(&mut samples[start..end], sample_rate, &settings);

            processed += 1;
            session.update_progress(
                processed,
                total,
                format!("Retuned segment {} of {}", processed, flagged.len()),
            );
            crate::db::sessions::save_session(self.db(), &session).await?;
            self.broadcast_progress(&session);
        }

        // Write the processed track for the mux phase
        let wav_path = paths.retuned_wav();
        let write_samples = samples.clone();
        tokio::task::spawn_blocking(move || {
            write_mono_wav(&wav_path, &write_samples, sample_rate)
        })
        .await??;

        data.samples = samples;

        crate::db::segments::mark_segments_retuned(self.db(), session.session_id).await?;
        for segment in data.segments.iter_mut().filter(|s| s.overstimulating) {
            segment.retuned = true;
        }

        session.update_progress(
            total,
            total,
            format!("Retuned {} segments", processed),
        );
        crate::db::sessions::save_session(self.db(), &session).await?;
        self.broadcast_progress(&session);

        tracing::info!(
            session_id = %session.session_id,
            retuned = processed,
            "Retuning completed"
        );

        Ok(session)
    }
}
