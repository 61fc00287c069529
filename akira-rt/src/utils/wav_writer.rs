//! Retuned audio output as 16-bit PCM WAV

use anyhow::{Context, Result};
use std::path::Path;

/// Write mono f32 samples to a 16-bit PCM WAV file
///
/// Samples are clamped to [-1.0, 1.0] before quantization; the retune
/// compressor already bounds flagged segments but untouched audio may carry
/// the pre-analysis boost.
pub fn write_mono_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {}", path.display()))?;

    for &sample in samples {
        let quantized = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer
            .write_sample(quantized)
            .with_context(|| format!("Failed to write WAV sample: {}", path.display()))?;
    }

    writer
        .finalize()
        .with_context(|| format!("Failed to finalize WAV file: {}", path.display()))?;

    tracing::debug!(
        path = %path.display(),
        samples = samples.len(),
        sample_rate,
        "Wrote retuned WAV"
    );

    Ok(())
}
