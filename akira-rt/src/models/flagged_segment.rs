//! Per-segment classification results and the session report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One classified segment of the analyzed track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlaggedSegment {
    /// Zero-based segment index
    pub segment_index: usize,

    /// Segment start within the track, seconds
    pub start_seconds: f32,

    /// Segment end within the track, seconds
    pub end_seconds: f32,

    /// Fraction of the segment covered by flagged intervals (0.0 - 1.0)
    pub coverage: f32,

    /// True if the segment was classified overstimulating
    pub overstimulating: bool,

    /// True once the segment has been retuned in the output
    pub retuned: bool,
}

/// Full per-session analysis report returned by the report endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentReport {
    pub session_id: Uuid,
    pub source_filename: String,

    /// Track duration in seconds
    pub duration_seconds: f32,

    /// Whole-track repetition verdict from autocorrelation
    pub repetition_detected: bool,

    /// All segments, flagged or not
    pub segments: Vec<FlaggedSegment>,

    /// Count of overstimulating segments
    pub flagged_count: usize,

    pub generated_at: DateTime<Utc>,
}

impl SegmentReport {
    pub fn new(
        session_id: Uuid,
        source_filename: String,
        duration_seconds: f32,
        repetition_detected: bool,
        segments: Vec<FlaggedSegment>,
    ) -> Self {
        let flagged_count = segments.iter().filter(|s| s.overstimulating).count();
        Self {
            session_id,
            source_filename,
            duration_seconds,
            repetition_detected,
            segments,
            flagged_count,
            generated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(index: usize, overstim: bool) -> FlaggedSegment {
        FlaggedSegment {
            segment_index: index,
            start_seconds: index as f32 * 4.0,
            end_seconds: (index + 1) as f32 * 4.0,
            coverage: if overstim { 0.8 } else { 0.0 },
            overstimulating: overstim,
            retuned: overstim,
        }
    }

    // TC-RPT-001: Given mixed segments, When a report is built,
    // Then flagged_count counts only overstimulating segments
    #[test]
    fn tc_rpt_001_flagged_count() {
        let report = SegmentReport::new(
            Uuid::new_v4(),
            "cartoon.mp4".to_string(),
            16.0,
            false,
            vec![
                segment(0, false),
                segment(1, true),
                segment(2, true),
                segment(3, false),
            ],
        );
        assert_eq!(report.flagged_count, 2);
        assert_eq!(report.segments.len(), 4);
    }
}
