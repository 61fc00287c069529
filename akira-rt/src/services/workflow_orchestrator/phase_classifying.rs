//! Phase 3: CLASSIFYING
//!
//! The detector turns feature envelopes into flagged intervals, the
//! whole track gets a repetition verdict, and intervals are projected
//! onto fixed-length segments whose verdicts are persisted for the
//! report endpoint.

use super::{PipelineData, WorkflowOrchestrator};
use crate::dsp::detector::segment_verdicts;
use crate::models::{FlaggedSegment, RetuneSession, RetuneState};
use akira_common::events::AkiraEvent;
use anyhow::Result;
use chrono::Utc;

impl WorkflowOrchestrator {
    /// Phase 3: CLASSIFYING - segment verdicts
    pub(super) async fn phase_classifying(
        &self,
        mut session: RetuneSession,
        data: &mut PipelineData,
    ) -> Result<RetuneSession> {
        self.enter_state(
            &mut session,
            RetuneState::Classifying,
            "Classifying segments...",
        )
        .await?;
        self.broadcast_progress(&session);

        tracing::info!(
            session_id = %session.session_id,
            "Phase 3: CLASSIFYING"
        );

        let features = data
            .features
            .take()
            .ok_or_else(|| anyhow::anyhow!("Classification reached without analysis features"))?;

        let detector = self.detector(&session);
        let samples = std::mem::take(&mut data.samples);
        let sample_rate = data.sample_rate;

        let (samples, intervals, repetition) = tokio::task::spawn_blocking(move || {
            let intervals = detector.detect(&features);
            let repetition = detector.detect_repetition(&samples, sample_rate);
            (samples, intervals, repetition)
        })
        .await?;

        data.samples = samples;
        data.repetition_detected = repetition;
        session.repetition_detected = repetition;

        let verdicts = segment_verdicts(
            &intervals,
            data.duration_seconds,
            session.parameters.segment_seconds,
            session.parameters.segment_flag_ratio,
        );

        let segments: Vec<FlaggedSegment> = verdicts
            .iter()
            .map(|v| FlaggedSegment {
                segment_index: v.index,
                start_seconds: v.start_seconds,
                end_seconds: v.end_seconds,
                coverage: v.coverage,
                overstimulating: v.overstimulating,
                retuned: false,
            })
            .collect();

        for segment in segments.iter().filter(|s| s.overstimulating) {
            tracing::info!(
                session_id = %session.session_id,
                segment = segment.segment_index,
                "Flagged {} - {} (coverage {:.0}%)",
                akira_common::time::format_position(segment.start_seconds),
                akira_common::time::format_position(segment.end_seconds),
                segment.coverage * 100.0
            );
            self.event_bus.emit_lossy(AkiraEvent::SegmentFlagged {
                session_id: session.session_id,
                segment_index: segment.segment_index,
                start_seconds: segment.start_seconds,
                end_seconds: segment.end_seconds,
                timestamp: Utc::now(),
            });
        }

        session.total_segments = segments.len();
        session.flagged_segments = segments.iter().filter(|s| s.overstimulating).count();

        crate::db::segments::replace_segments(self.db(), session.session_id, &segments).await?;

        tracing::info!(
            session_id = %session.session_id,
            intervals = intervals.len(),
            flagged = session.flagged_segments,
            total = session.total_segments,
            repetition,
            "Classification completed"
        );

        data.intervals = intervals;
        data.segments = segments;

        session.update_progress(
            session.total_segments,
            session.total_segments,
            format!(
                "Flagged {} of {} segments",
                session.flagged_segments, session.total_segments
            ),
        );
        crate::db::sessions::save_session(self.db(), &session).await?;
        self.broadcast_progress(&session);

        Ok(session)
    }
}
