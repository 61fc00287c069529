//! Sample-rate conversion to the retuning rate
//!
//! The retune chain runs at a fixed 44.1 kHz; uploads whose audio track
//! carries another rate are converted here before analysis.

use anyhow::{Context, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Sample rate the pipeline operates at
pub const TARGET_SAMPLE_RATE: u32 = 44_100;

/// Resample mono f32 PCM to `TARGET_SAMPLE_RATE`
///
/// Single-pass sinc interpolation (256-tap, BlackmanHarris2, 0.95 cutoff).
/// Returns the input unchanged when the source already runs at the target
/// rate.
pub fn resample_to_target(samples: Vec<f32>, source_rate: u32) -> Result<Vec<f32>> {
    if source_rate == TARGET_SAMPLE_RATE || samples.is_empty() {
        return Ok(samples);
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let resample_ratio = TARGET_SAMPLE_RATE as f64 / source_rate as f64;
    let num_frames = samples.len();

    let mut resampler = SincFixedIn::<f32>::new(
        resample_ratio,
        4.0, // Allow up to 4x ratio (8 kHz voice tracks upward)
        params,
        num_frames, // Chunk size = input length for single-pass processing
        1,          // Mono
    )
    .context("Failed to create rubato resampler")?;

    let input_channels = vec![samples];
    let mut output_channels = resampler
        .process(&input_channels, None)
        .context("Rubato resampling failed")?;

    let output = output_channels.remove(0);

    tracing::debug!(
        source_rate,
        target_rate = TARGET_SAMPLE_RATE,
        input_frames = num_frames,
        output_frames = output.len(),
        "Resampled audio"
    );

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_rate_is_passthrough() {
        let samples = vec![0.1f32, 0.2, 0.3];
        let out = resample_to_target(samples.clone(), TARGET_SAMPLE_RATE).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn empty_input_is_passthrough() {
        let out = resample_to_target(Vec::new(), 48_000).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn upsample_scales_length_by_ratio() {
        let source_rate = 22_050;
        let samples: Vec<f32> = (0..source_rate as usize)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / source_rate as f32).sin())
            .collect();

        let out = resample_to_target(samples, source_rate).unwrap();

        // One second in, roughly one second out at 44.1 kHz
        let expected = TARGET_SAMPLE_RATE as usize;
        let tolerance = expected / 20;
        assert!(
            out.len().abs_diff(expected) < tolerance,
            "expected ~{} samples, got {}",
            expected,
            out.len()
        );
    }
}
