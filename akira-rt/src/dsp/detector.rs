//! Overstimulation detector
//!
//! Feature-threshold classifier over the frame-aligned STFT energy, MFCC
//! delta variance, and loudness envelopes. Frames are flagged as chaotic
//! when energy and loudness spike together above dynamic (mean-relative)
//! thresholds, or as monotonous when spectral motion collapses. Flagged
//! frames become margin-extended, merged time intervals, which are then
//! projected onto fixed-length segments for retuning.

use serde::{Deserialize, Serialize};

use super::stft::autocorrelate;

/// Detection thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorThresholds {
    /// Multiplier on mean STFT energy for the spike threshold
    pub stft_thresh_factor: f32,
    /// Absolute threshold below which MFCC delta variance means monotony
    pub mfcc_delta_thresh: f32,
    /// Offset in dB added to mean loudness for the spike threshold
    pub loudness_thresh_db: f32,
    /// Normalized autocorrelation peak for whole-file repetition
    pub repetition_thresh: f32,
    /// Minimum repetition period in seconds to count as repetitive
    pub min_repetition_seconds: f32,
    /// Moving-average window (frames) applied to all envelopes
    pub smoothing_window: usize,
    /// Margin in seconds added around each flagged frame
    pub flag_margin_seconds: f32,
}

impl Default for DetectorThresholds {
    fn default() -> Self {
        Self {
            stft_thresh_factor: 2.0,
            mfcc_delta_thresh: 0.1,
            loudness_thresh_db: -10.0,
            repetition_thresh: 0.5,
            min_repetition_seconds: 0.5,
            smoothing_window: 3,
            flag_margin_seconds: 0.1,
        }
    }
}

/// Frame-aligned feature envelopes produced by the analysis phase
#[derive(Debug, Clone)]
pub struct FrameFeatures {
    /// Per-frame mean STFT magnitude, normalized to peak 1.0
    pub energy: Vec<f32>,
    /// Per-frame variance of the MFCC delta coefficients
    pub mfcc_delta_variance: Vec<f32>,
    /// Per-frame loudness in dBFS
    pub loudness_dbfs: Vec<f32>,
    /// Seconds between consecutive frames (hop / sample rate)
    pub frame_seconds: f32,
    /// Total signal duration in seconds
    pub duration_seconds: f32,
}

/// A flagged time interval (seconds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlaggedInterval {
    pub start_seconds: f32,
    pub end_seconds: f32,
}

impl FlaggedInterval {
    pub fn duration(&self) -> f32 {
        self.end_seconds - self.start_seconds
    }
}

/// Fixed-length segment verdict after interval projection
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentVerdict {
    pub index: usize,
    pub start_seconds: f32,
    pub end_seconds: f32,
    /// Fraction of the segment covered by flagged intervals (0.0 - 1.0)
    pub coverage: f32,
    pub overstimulating: bool,
}

/// Overstimulation detector
pub struct OverstimDetector {
    thresholds: DetectorThresholds,
}

impl OverstimDetector {
    pub fn new(thresholds: DetectorThresholds) -> Self {
        Self { thresholds }
    }

    /// Flag chaotic/monotonous intervals from frame features
    ///
    /// Returns merged intervals sorted by start time. Empty input yields no
    /// intervals.
    pub fn detect(&self, features: &FrameFeatures) -> Vec<FlaggedInterval> {
        use super::loudness::smooth;

        let t = &self.thresholds;
        let energy = smooth(&features.energy, t.smoothing_window);
        let delta_var = smooth(&features.mfcc_delta_variance, t.smoothing_window);
        let loudness = smooth(&features.loudness_dbfs, t.smoothing_window);

        let frames = energy.len().min(delta_var.len()).min(loudness.len());
        if frames == 0 {
            return Vec::new();
        }

        let mean_energy = energy[..frames].iter().sum::<f32>() / frames as f32;
        let mean_loudness = loudness[..frames].iter().sum::<f32>() / frames as f32;
        let energy_thresh = mean_energy * t.stft_thresh_factor;
        let loudness_thresh = mean_loudness + t.loudness_thresh_db;

        let mut intervals = Vec::new();
        for i in 0..frames {
            let chaotic = energy[i] > energy_thresh && loudness[i] > loudness_thresh;
            let monotonous = delta_var[i] < t.mfcc_delta_thresh;

            if chaotic || monotonous {
                let start = (i as f32 * features.frame_seconds - t.flag_margin_seconds).max(0.0);
                let end = ((i + 1) as f32 * features.frame_seconds + t.flag_margin_seconds)
                    .min(features.duration_seconds);
                intervals.push(FlaggedInterval {
                    start_seconds: start,
                    end_seconds: end,
                });
            }
        }

        merge_intervals(intervals)
    }

    /// Whole-file repetition check via normalized autocorrelation
    ///
    /// True when the dominant autocorrelation lag corresponds to a period of
    /// at least `min_repetition_seconds` and its peak exceeds
    /// `repetition_thresh`.
    pub fn detect_repetition(&self, samples: &[f32], sample_rate: u32) -> bool {
        if samples.len() < 2 {
            return false;
        }

        let ac = autocorrelate(samples);
        let peak_lag = match ac
            .iter()
            .enumerate()
            .skip(1)
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        {
            Some((lag, _)) => lag,
            None => return false,
        };

        let period_seconds = peak_lag as f32 / sample_rate as f32;
        period_seconds >= self.thresholds.min_repetition_seconds
            && ac[peak_lag] > self.thresholds.repetition_thresh
    }

    pub fn thresholds(&self) -> &DetectorThresholds {
        &self.thresholds
    }
}

impl Default for OverstimDetector {
    fn default() -> Self {
        Self::new(DetectorThresholds::default())
    }
}

/// Merge overlapping or touching intervals
pub fn merge_intervals(mut intervals: Vec<FlaggedInterval>) -> Vec<FlaggedInterval> {
    if intervals.is_empty() {
        return intervals;
    }

    intervals.sort_by(|a, b| {
        a.start_seconds
            .partial_cmp(&b.start_seconds)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut merged: Vec<FlaggedInterval> = vec![intervals[0]];
    for interval in intervals.into_iter().skip(1) {
        let last = merged.last_mut().unwrap();
        if interval.start_seconds <= last.end_seconds {
            last.end_seconds = last.end_seconds.max(interval.end_seconds);
        } else {
            merged.push(interval);
        }
    }

    merged
}

/// Project flagged intervals onto fixed-length segments
///
/// Segments tile `[0, duration)` in `segment_seconds` steps, including the
/// trailing partial segment. A segment is overstimulating when flagged
/// intervals cover at least `flag_ratio` of its length.
pub fn segment_verdicts(
    intervals: &[FlaggedInterval],
    duration_seconds: f32,
    segment_seconds: f32,
    flag_ratio: f32,
) -> Vec<SegmentVerdict> {
    if duration_seconds <= 0.0 || segment_seconds <= 0.0 {
        return Vec::new();
    }

    let mut verdicts = Vec::new();
    let mut index = 0;
    let mut start = 0.0f32;

    while start < duration_seconds {
        let end = (start + segment_seconds).min(duration_seconds);
        let seg_len = end - start;

        let covered: f32 = intervals
            .iter()
            .map(|iv| {
                let lo = iv.start_seconds.max(start);
                let hi = iv.end_seconds.min(end);
                (hi - lo).max(0.0)
            })
            .sum();

        let coverage = (covered / seg_len).min(1.0);
        verdicts.push(SegmentVerdict {
            index,
            start_seconds: start,
            end_seconds: end,
            coverage,
            overstimulating: coverage >= flag_ratio,
        });

        index += 1;
        start += segment_seconds;
    }

    verdicts
}
