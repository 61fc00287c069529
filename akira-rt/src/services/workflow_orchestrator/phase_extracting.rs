//! Phase 1: EXTRACTING
//!
//! ffmpeg pulls the audio track out of the uploaded video; the WAV is
//! decoded, downmixed to mono, resampled to the analysis rate, and
//! boosted so quiet cartoon mixes sit in the detector's working range.

use super::{PipelineData, WorkflowOrchestrator};
use crate::dsp::loudness::apply_gain_db;
use crate::dsp::resample::{resample_to_target, TARGET_SAMPLE_RATE};
use crate::models::{RetuneSession, RetuneState};
use crate::services::intake::SessionPaths;
use crate::utils::decode_audio_file;
use anyhow::Result;

impl WorkflowOrchestrator {
    /// Phase 1: EXTRACTING - audio track extraction and decode
    pub(super) async fn phase_extracting(
        &self,
        mut session: RetuneSession,
        paths: &SessionPaths,
        data: &mut PipelineData,
    ) -> Result<RetuneSession> {
        self.enter_state(
            &mut session,
            RetuneState::Extracting,
            "Extracting audio track...",
        )
        .await?;
        self.broadcast_progress(&session);

        tracing::info!(
            session_id = %session.session_id,
            "Phase 1: EXTRACTING"
        );

        self.ffmpeg()
            .extract_audio(&paths.source_video(), &paths.extracted_wav())
            .await?;

        session.update_progress(1, 2, "Decoding extracted audio...".to_string());
        crate::db::sessions::save_session(self.db(), &session).await?;
        self.broadcast_progress(&session);

        // Decode and condition on a blocking thread; tracks can be long
        let wav_path = paths.extracted_wav();
        let boost_db = session.parameters.boost_db;
        let (samples, sample_rate) =
            tokio::task::spawn_blocking(move || -> Result<(Vec<f32>, u32)> {
                let decoded = decode_audio_file(&wav_path)?;
                let mut samples = resample_to_target(decoded.samples, decoded.sample_rate)?;
                apply_gain_db(&mut samples, boost_db);
                Ok((samples, TARGET_SAMPLE_RATE))
            })
            .await??;

        data.duration_seconds = samples.len() as f32 / sample_rate as f32;
        data.samples = samples;
        data.sample_rate = sample_rate;

        if data.samples.is_empty() {
            anyhow::bail!("Extracted audio track contains no samples");
        }

        session.update_progress(2, 2, "Audio track ready for analysis".to_string());
        crate::db::sessions::save_session(self.db(), &session).await?;
        self.broadcast_progress(&session);

        tracing::info!(
            session_id = %session.session_id,
            samples = data.samples.len(),
            sample_rate = data.sample_rate,
            duration_seconds = data.duration_seconds,
            "Audio extraction completed"
        );

        Ok(session)
    }
}
