//! Analysis window functions

/// Periodic Hann window of the given length
///
/// Periodic form (denominator N, not N-1) to match standard STFT practice.
pub fn hann(len: usize) -> Vec<f32> {
    if len == 0 {
        return Vec::new();
    }
    (0..len)
        .map(|n| {
            let x = 2.0 * std::f32::consts::PI * n as f32 / len as f32;
            0.5 * (1.0 - x.cos())
        })
        .collect()
}
