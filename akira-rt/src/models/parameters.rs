//! Retune workflow parameters
//!
//! Analysis, classification, and retuning knobs in one serializable
//! bundle. All fields have defaults so a bare `{}` request body works.

use crate::dsp::detector::DetectorThresholds;
use crate::dsp::retune::RetuneSettings;
use serde::{Deserialize, Serialize};

/// Retune workflow parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetuneParameters {
    /// Pre-analysis gain applied to the extracted track in dB (default: 30.0)
    #[serde(default = "default_boost_db")]
    pub boost_db: f32,

    /// STFT window size in samples (default: 2048)
    #[serde(default = "default_n_fft")]
    pub n_fft: usize,

    /// STFT hop length in samples (default: 512)
    #[serde(default = "default_hop_length")]
    pub hop_length: usize,

    /// Mel filterbank size (default: 26)
    #[serde(default = "default_n_mels")]
    pub n_mels: usize,

    /// MFCC coefficients kept per frame (default: 13)
    #[serde(default = "default_n_mfcc")]
    pub n_mfcc: usize,

    /// Classification segment length in seconds (default: 4.0)
    #[serde(default = "default_segment_seconds")]
    pub segment_seconds: f32,

    /// Fraction of a segment that must be flagged to mark it
    /// overstimulating (default: 0.25)
    #[serde(default = "default_segment_flag_ratio")]
    pub segment_flag_ratio: f32,

    /// Frame-level detector thresholds
    #[serde(default)]
    pub thresholds: DetectorThresholds,

    /// Retuning filter and fade settings
    #[serde(default)]
    pub retune: RetuneSettings,
}

// Default value functions
fn default_boost_db() -> f32 {
    30.0
}

fn default_n_fft() -> usize {
    2048
}

fn default_hop_length() -> usize {
    512
}

fn default_n_mels() -> usize {
    26
}

fn default_n_mfcc() -> usize {
    13
}

fn default_segment_seconds() -> f32 {
    4.0
}

fn default_segment_flag_ratio() -> f32 {
    0.25
}

impl Default for RetuneParameters {
    fn default() -> Self {
        Self {
            boost_db: default_boost_db(),
            n_fft: default_n_fft(),
            hop_length: default_hop_length(),
            n_mels: default_n_mels(),
            n_mfcc: default_n_mfcc(),
            segment_seconds: default_segment_seconds(),
            segment_flag_ratio: default_segment_flag_ratio(),
            thresholds: DetectorThresholds::default(),
            retune: RetuneSettings::default(),
        }
    }
}
