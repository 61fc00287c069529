//! Loudness (RMS / dBFS) envelope

/// Per-frame RMS loudness in dBFS
///
/// Frames of `frame_size` samples taken every `hop_length` samples; silent
/// frames report -120 dBFS rather than negative infinity so smoothing and
/// mean-based thresholds stay finite.
pub fn loudness_dbfs(samples: &[f32], frame_size: usize, hop_length: usize) -> Vec<f32> {
    if samples.len() < frame_size || frame_size == 0 || hop_length == 0 {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut start = 0;
    while start + frame_size <= samples.len() {
        let rms = rms(&samples[start..start + frame_size]);
        out.push(if rms > 0.0 {
            20.0 * rms.log10()
        } else {
            -120.0
        });
        start += hop_length;
    }
    out
}

/// Root mean square of a sample slice
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|&s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Centered moving average over `window` points
///
/// Zero-padded at the edges (same-length convolution with a uniform
/// kernel), so first/last frames are damped rather than averaged over a
/// shrunken window.
pub fn smooth(values: &[f32], window: usize) -> Vec<f32> {
    if window <= 1 || values.len() <= 1 {
        return values.to_vec();
    }

    let half = (window / 2) as isize;
    (0..values.len() as isize)
        .map(|i| {
            let lo = (i - half).max(0) as usize;
            let hi = ((i - half + window as isize) as usize).min(values.len());
            values[lo..hi].iter().sum::<f32>() / window as f32
        })
        .collect()
}

/// Convert dB to linear amplitude
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Apply a gain in dB, clamping the result to [-1.0, 1.0]
pub fn apply_gain_db(samples: &mut [f32], gain_db: f32) {
    let gain = db_to_linear(gain_db);
    for s in samples.iter_mut() {
        *s = (*s * gain).clamp(-1.0, 1.0);
    }
}
