//! Retuning of overstimulating audio segments
//!
//! Flagged segments are softened in place: band-limit to the 400-1500 Hz
//! speech-comfort band (8th-order Butterworth low-pass then high-pass),
//! scale amplitude down, ramp the edges, and apply soft tanh compression.

use serde::{Deserialize, Serialize};

/// Per-segment retune parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetuneSettings {
    /// Low-pass cutoff in Hz
    pub lowpass_hz: f32,
    /// High-pass cutoff in Hz
    pub highpass_hz: f32,
    /// Butterworth filter order (cascaded biquads, must be even)
    pub filter_order: usize,
    /// Amplitude scale applied to flagged segments
    pub loudness_factor: f32,
    /// Fade-in/fade-out length in seconds
    pub fade_seconds: f32,
    /// Pre-gain of the tanh compressor
    pub compressor_drive: f32,
}

impl Default for RetuneSettings {
    fn default() -> Self {
        Self {
            lowpass_hz: 1500.0,
            highpass_hz: 400.0,
            filter_order: 8,
            loudness_factor: 0.1,
            fade_seconds: 0.75,
            compressor_drive: 2.5,
        }
    }
}

/// Single biquad section (transposed direct form II)
struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
}

impl Biquad {
    /// Low-pass section (RBJ cookbook)
    fn lowpass(sample_rate: f32, cutoff: f32, q: f32) -> Self {
        let omega = 2.0 * std::f32::consts::PI * cutoff / sample_rate;
        let alpha = omega.sin() / (2.0 * q);
        let cos_w = omega.cos();

        let a0 = 1.0 + alpha;
        Self {
            b0: ((1.0 - cos_w) / 2.0) / a0,
            b1: (1.0 - cos_w) / a0,
            b2: ((1.0 - cos_w) / 2.0) / a0,
            a1: (-2.0 * cos_w) / a0,
            a2: (1.0 - alpha) / a0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// High-pass section (RBJ cookbook)
    fn highpass(sample_rate: f32, cutoff: f32, q: f32) -> Self {
        let omega = 2.0 * std::f32::consts::PI * cutoff / sample_rate;
        let alpha = omega.sin() / (2.0 * q);
        let cos_w = omega.cos();

        let a0 = 1.0 + alpha;
        Self {
            b0: ((1.0 + cos_w) / 2.0) / a0,
            b1: (-(1.0 + cos_w)) / a0,
            b2: ((1.0 + cos_w) / 2.0) / a0,
            a1: (-2.0 * cos_w) / a0,
            a2: (1.0 - alpha) / a0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    fn process(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.z1;
        self.z1 = self.b1 * x - self.a1 * y + self.z2;
        self.z2 = self.b2 * x - self.a2 * y;
        y
    }
}

/// Q values for a cascaded Butterworth filter of the given (even) order
///
/// Q_k = 1 / (2 cos((2k + 1) pi / (2 order))) for each second-order section.
fn butterworth_qs(order: usize) -> Vec<f32> {
    let sections = order / 2;
    (0..sections)
        .map(|k| {
            let angle = (2 * k + 1) as f32 * std::f32::consts::PI / (2 * order) as f32;
            1.0 / (2.0 * angle.cos())
        })
        .collect()
}

/// In-place Butterworth low-pass
pub fn lowpass_filter(samples: &mut [f32], cutoff_hz: f32, sample_rate: u32, order: usize) {
    let mut sections: Vec<Biquad> = butterworth_qs(order.max(2))
        .into_iter()
        .map(|q| Biquad::lowpass(sample_rate as f32, cutoff_hz, q))
        .collect();

    for s in samples.iter_mut() {
        let mut x = *s;
        for section in &mut sections {
            x = section.process(x);
        }
        *s = x;
    }
}

/// In-place Butterworth high-pass
pub fn highpass_filter(samples: &mut [f32], cutoff_hz: f32, sample_rate: u32, order: usize) {
    let mut sections: Vec<Biquad> = butterworth_qs(order.max(2))
        .into_iter()
        .map(|q| Biquad::highpass(sample_rate as f32, cutoff_hz, q))
        .collect();

    for s in samples.iter_mut() {
        let mut x = *s;
        for section in &mut sections {
            x = section.process(x);
        }
        *s = x;
    }
}

/// Scale amplitude down by a constant factor
pub fn reduce_loudness(samples: &mut [f32], factor: f32) {
    for s in samples.iter_mut() {
        *s *= factor;
    }
}

/// Linear fade-in over the first `fade_len` samples and fade-out over the
/// last `fade_len`; `fade_len` is clamped to half the segment
pub fn fade_edges(samples: &mut [f32], fade_len: usize) {
    let fade_len = fade_len.min(samples.len() / 2);
    if fade_len == 0 {
        return;
    }

    let len = samples.len();
    for i in 0..fade_len {
        let ramp = i as f32 / fade_len as f32;
        samples[i] *= ramp;
        samples[len - 1 - i] *= ramp;
    }
}

/// Soft dynamic range compression: y = tanh(drive * x)
pub fn compress(samples: &mut [f32], drive: f32) {
    for s in samples.iter_mut() {
        *s = (*s * drive).tanh();
    }
}

/// Apply the full retune chain to one flagged segment
pub fn retune_segment(samples: &mut [f32], sample_rate: u32, settings: &RetuneSettings) {
    if samples.is_empty() {
        return;
    }

    lowpass_filter(samples, settings.lowpass_hz, sample_rate, settings.filter_order);
    highpass_filter(samples, settings.highpass_hz, sample_rate, settings.filter_order);
    reduce_loudness(samples, settings.loudness_factor);

    let fade_len = (settings.fade_seconds * sample_rate as f32) as usize;
    fade_edges(samples, fade_len);
    compress(samples, settings.compressor_drive);
}
