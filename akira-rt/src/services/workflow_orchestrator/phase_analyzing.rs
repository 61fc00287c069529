//! Phase 2: ANALYZING
//!
//! Frame-aligned feature extraction: STFT energy envelope, MFCC delta
//! variance, and RMS loudness, all on the same hop grid so the detector
//! can compare them frame by frame.

use super::{PipelineData, WorkflowOrchestrator};
use crate::dsp::detector::FrameFeatures;
use crate::dsp::loudness::loudness_dbfs;
use crate::dsp::mel::MfccExtractor;
use crate::dsp::Stft;
use crate::models::{RetuneSession, RetuneState};
use anyhow::Result;

impl WorkflowOrchestrator {
    /// Phase 2: ANALYZING - feature envelope computation
    pub(super) async fn phase_analyzing(
        &self,
        mut session: RetuneSession,
        data: &mut PipelineData,
    ) -> Result<RetuneSession> {
        self.enter_state(
            &mut session,
            RetuneState::Analyzing,
            "Computing audio features...",
        )
        .await?;
        self.broadcast_progress(&session);

        tracing::info!(
            session_id = %session.session_id,
            "Phase 2: ANALYZING"
        );

        let params = session.parameters.clone();
        let samples = std::mem::take(&mut data.samples);
        let sample_rate = data.sample_rate;
        let duration_seconds = data.duration_seconds;

        // STFT + MFCC over a long track is pure CPU; keep it off the runtime
        let (samples, features) = tokio::task::spawn_blocking(move || {
            let stft = Stft::new(params.n_fft, params.hop_length);
            let energy = stft.energy_envelope(&samples);

            let extractor =
                MfccExtractor::new(sample_rate, params.n_fft, params.n_mels, params.n_mfcc);
            let mfccs = extractor.mfccs(&stft, &samples);
            let deltas = MfccExtractor::delta(&mfccs);
            let mfcc_delta_variance = MfccExtractor::delta_variance(&deltas);

            let loudness = loudness_dbfs(&samples, params.n_fft, params.hop_length);

            let features = FrameFeatures {
                energy,
                mfcc_delta_variance,
                loudness_dbfs: loudness,
                frame_seconds: params.hop_length as f32 / sample_rate as f32,
                duration_seconds,
            };
            (samples, features)
        })
        .await?;

        tracing::info!(
            session_id = %session.session_id,
            frames = features.energy.len(),
            frame_seconds = features.frame_seconds,
            "Feature extraction completed"
        );

        data.samples = samples;
        data.features = Some(features);

        session.update_progress(1, 1, "Audio features computed".to_string());
        crate::db::sessions::save_session(self.db(), &session).await?;
        self.broadcast_progress(&session);

        Ok(session)
    }
}
