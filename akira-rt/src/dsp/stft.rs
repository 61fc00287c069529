//! Short-Time Fourier Transform
//!
//! Produces the magnitude spectrogram used for both the MFCC front end and
//! the STFT energy envelope of the detector.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use super::window::hann;

/// STFT analyzer with fixed frame/hop geometry
pub struct Stft {
    n_fft: usize,
    hop_length: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl Stft {
    /// Create an analyzer (typical geometry: n_fft 2048, hop 512)
    pub fn new(n_fft: usize, hop_length: usize) -> Self {
        assert!(n_fft > 0 && hop_length > 0, "invalid STFT geometry");
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n_fft);
        Self {
            n_fft,
            hop_length,
            window: hann(n_fft),
            fft,
        }
    }

    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    /// Number of frames produced for a signal of `len` samples
    pub fn num_frames(&self, len: usize) -> usize {
        if len == 0 {
            0
        } else {
            len / self.hop_length + 1
        }
    }

    /// Magnitude spectrogram, frames-major: `result[frame][bin]`
    ///
    /// Frames are centered on `frame * hop_length` with zero padding at the
    /// edges, so frame timestamps line up with `frames_to_seconds`.
    pub fn magnitudes(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        let num_frames = self.num_frames(samples.len());
        let num_bins = self.n_fft / 2 + 1;
        let half = self.n_fft / 2;
        let mut frames = Vec::with_capacity(num_frames);
        let mut buffer: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); self.n_fft];

        for frame_idx in 0..num_frames {
            let center = frame_idx * self.hop_length;

            for (i, slot) in buffer.iter_mut().enumerate() {
                let pos = center as isize + i as isize - half as isize;
                let sample = if pos >= 0 && (pos as usize) < samples.len() {
                    samples[pos as usize]
                } else {
                    0.0
                };
                *slot = Complex::new(sample * self.window[i], 0.0);
            }

            self.fft.process(&mut buffer);

            let mags: Vec<f32> = buffer[..num_bins].iter().map(|c| c.norm()).collect();
            frames.push(mags);
        }

        frames
    }

    /// Per-frame mean magnitude, normalized to peak 1.0
    ///
    /// This is the dynamic-threshold energy envelope of the detector.
    pub fn energy_envelope(&self, samples: &[f32]) -> Vec<f32> {
        let frames = self.magnitudes(samples);
        let mut energy: Vec<f32> = frames
            .iter()
            .map(|bins| {
                if bins.is_empty() {
                    0.0
                } else {
                    bins.iter().sum::<f32>() / bins.len() as f32
                }
            })
            .collect();

        let peak = energy.iter().cloned().fold(0.0f32, f32::max);
        if peak > 0.0 {
            for e in &mut energy {
                *e /= peak;
            }
        }

        energy
    }

    /// Convert a frame index to its center time in seconds
    pub fn frames_to_seconds(&self, frame_idx: usize, sample_rate: u32) -> f32 {
        (frame_idx * self.hop_length) as f32 / sample_rate as f32
    }
}

/// Normalized autocorrelation of a signal (lag 0 -> 1.0)
///
/// Computed in the frequency domain (power spectrum inverse) so full-file
/// repetition analysis stays tractable for minutes of audio.
pub fn autocorrelate(samples: &[f32]) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    // Zero-pad to the next power of two at least 2n to avoid circular wrap
    let n = samples.len();
    let padded = (2 * n).next_power_of_two();

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(padded);
    let ifft = planner.plan_fft_inverse(padded);

    let mut buffer: Vec<Complex<f32>> = samples
        .iter()
        .map(|&s| Complex::new(s, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(padded)
        .collect();

    fft.process(&mut buffer);
    for c in &mut buffer {
        *c = Complex::new(c.norm_sqr(), 0.0);
    }
    ifft.process(&mut buffer);

    let zero_lag = buffer[0].re.max(f32::EPSILON);
    buffer[..n].iter().map(|c| c.re / zero_lag).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * seconds) as usize;
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn sine_peak_lands_in_expected_bin() {
        let sample_rate = 44100;
        let stft = Stft::new(2048, 512);
        let samples = sine(1000.0, sample_rate, 0.5);

        let frames = stft.magnitudes(&samples);
        assert!(!frames.is_empty());

        // Pick an interior frame, find peak bin
        let frame = &frames[frames.len() / 2];
        let peak_bin = frame
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();

        let bin_hz = sample_rate as f32 / 2048.0;
        let peak_hz = peak_bin as f32 * bin_hz;
        assert!(
            (peak_hz - 1000.0).abs() < 2.0 * bin_hz,
            "peak at {} Hz, expected ~1000 Hz",
            peak_hz
        );
    }

    #[test]
    fn energy_envelope_is_normalized() {
        let stft = Stft::new(2048, 512);
        let samples = sine(440.0, 44100, 1.0);
        let energy = stft.energy_envelope(&samples);

        let peak = energy.iter().cloned().fold(0.0f32, f32::max);
        assert!((peak - 1.0).abs() < 1e-6);
        assert_eq!(energy.len(), stft.num_frames(samples.len()));
    }

    #[test]
    fn energy_envelope_tracks_loudness() {
        let stft = Stft::new(2048, 512);
        let mut samples = sine(440.0, 44100, 1.0);
        // Quiet second half
        let half = samples.len() / 2;
        for s in &mut samples[half..] {
            *s *= 0.05;
        }

        let energy = stft.energy_envelope(&samples);
        let mid = energy.len() / 2;
        let loud_avg: f32 = energy[..mid].iter().sum::<f32>() / mid as f32;
        let quiet_avg: f32 = energy[mid..].iter().sum::<f32>() / (energy.len() - mid) as f32;
        assert!(loud_avg > 3.0 * quiet_avg);
    }

    #[test]
    fn autocorrelation_peaks_at_signal_period() {
        let sample_rate = 8000u32;
        let freq = 100.0;
        let samples = sine(freq, sample_rate, 0.5);

        let ac = autocorrelate(&samples);
        assert!((ac[0] - 1.0).abs() < 1e-4);

        // The lag at one period should be a strong local peak
        let period = (sample_rate as f32 / freq) as usize;
        assert!(ac[period] > 0.8, "ac at period = {}", ac[period]);
    }

    #[test]
    fn autocorrelate_empty_is_empty() {
        assert!(autocorrelate(&[]).is_empty());
    }
}
