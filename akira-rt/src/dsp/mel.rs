//! Mel filterbank and MFCC extraction
//!
//! MFCC front end for the detector: power spectrogram -> triangular mel
//! filterbank -> log -> DCT-II, plus regression deltas. The detector only
//! consumes the per-frame variance of the delta coefficients, which is the
//! "collapsed dynamics" indicator for repetitive/monotonous audio.

use super::stft::Stft;

/// MFCC extractor
pub struct MfccExtractor {
    sample_rate: u32,
    n_mels: usize,
    n_mfcc: usize,
    /// Triangular filter weights, `filters[mel][bin]`
    filters: Vec<Vec<f32>>,
}

impl MfccExtractor {
    /// Create an extractor for the given STFT geometry
    ///
    /// Standard front end: 26 mel bands, 13 cepstral coefficients, filters
    /// spanning 0 Hz to Nyquist.
    pub fn new(sample_rate: u32, n_fft: usize, n_mels: usize, n_mfcc: usize) -> Self {
        assert!(n_mfcc <= n_mels, "n_mfcc must not exceed n_mels");
        let filters = mel_filterbank(sample_rate, n_fft, n_mels);
        Self {
            sample_rate,
            n_mels,
            n_mfcc,
            filters,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// MFCCs per frame: `result[frame][coefficient]`, `n_mfcc` wide
    pub fn mfccs(&self, stft: &Stft, samples: &[f32]) -> Vec<Vec<f32>> {
        let spectrogram = stft.magnitudes(samples);
        let mut out = Vec::with_capacity(spectrogram.len());

        for bins in &spectrogram {
            // Power spectrum through the mel filterbank
            let mut mel_energies = vec![0.0f32; self.n_mels];
            for (m, filter) in self.filters.iter().enumerate() {
                let mut acc = 0.0f32;
                for (bin, &weight) in filter.iter().enumerate() {
                    if weight > 0.0 {
                        let mag = bins.get(bin).copied().unwrap_or(0.0);
                        acc += weight * mag * mag;
                    }
                }
                mel_energies[m] = (acc + 1e-10).ln();
            }

            out.push(dct_ii(&mel_energies, self.n_mfcc));
        }

        out
    }

    /// First-order regression delta over a +/-2 frame window
    ///
    /// Edge frames are padded by repetition, matching the usual delta
    /// definition.
    pub fn delta(mfccs: &[Vec<f32>]) -> Vec<Vec<f32>> {
        const N: isize = 2;
        let denom: f32 = 2.0 * (1..=N).map(|n| (n * n) as f32).sum::<f32>();
        let frames = mfccs.len() as isize;

        let clamp = |idx: isize| -> usize { idx.clamp(0, frames - 1) as usize };

        let mut deltas = Vec::with_capacity(mfccs.len());
        for t in 0..frames {
            let width = mfccs[t as usize].len();
            let mut d = vec![0.0f32; width];
            for n in 1..=N {
                let ahead = &mfccs[clamp(t + n)];
                let behind = &mfccs[clamp(t - n)];
                for c in 0..width {
                    d[c] += n as f32 * (ahead[c] - behind[c]);
                }
            }
            for v in &mut d {
                *v /= denom;
            }
            deltas.push(d);
        }

        deltas
    }

    /// Per-frame variance across delta coefficients
    pub fn delta_variance(deltas: &[Vec<f32>]) -> Vec<f32> {
        deltas
            .iter()
            .map(|coeffs| {
                if coeffs.is_empty() {
                    return 0.0;
                }
                let mean = coeffs.iter().sum::<f32>() / coeffs.len() as f32;
                coeffs.iter().map(|c| (c - mean).powi(2)).sum::<f32>() / coeffs.len() as f32
            })
            .collect()
    }
}

/// Convert Hz to mel (HTK formula)
fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

/// Convert mel to Hz (HTK formula)
fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank, `filters[mel][bin]` over `n_fft / 2 + 1` bins
fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize) -> Vec<Vec<f32>> {
    let num_bins = n_fft / 2 + 1;
    let nyquist = sample_rate as f32 / 2.0;

    let mel_min = hz_to_mel(0.0);
    let mel_max = hz_to_mel(nyquist);

    // n_mels + 2 equally spaced mel points -> triangle edges
    let mel_points: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_min + (mel_max - mel_min) * i as f32 / (n_mels + 1) as f32)
        .collect();
    let hz_points: Vec<f32> = mel_points.iter().map(|&m| mel_to_hz(m)).collect();
    let bin_hz = sample_rate as f32 / n_fft as f32;

    let mut filters = vec![vec![0.0f32; num_bins]; n_mels];
    for m in 0..n_mels {
        let (left, center, right) = (hz_points[m], hz_points[m + 1], hz_points[m + 2]);
        for bin in 0..num_bins {
            let freq = bin as f32 * bin_hz;
            if freq > left && freq < center {
                filters[m][bin] = (freq - left) / (center - left);
            } else if freq >= center && freq < right {
                filters[m][bin] = (right - freq) / (right - center);
            }
        }
    }

    filters
}

/// DCT-II of the input, keeping the first `n_out` coefficients
fn dct_ii(input: &[f32], n_out: usize) -> Vec<f32> {
    let n = input.len();
    let mut out = Vec::with_capacity(n_out);
    for k in 0..n_out {
        let mut acc = 0.0f32;
        for (i, &x) in input.iter().enumerate() {
            acc += x * (std::f32::consts::PI * k as f32 * (i as f32 + 0.5) / n as f32).cos();
        }
        out.push(acc);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filterbank_covers_spectrum() {
        let filters = mel_filterbank(44100, 2048, 26);
        assert_eq!(filters.len(), 26);
        assert_eq!(filters[0].len(), 1025);

        // Every filter has some weight, and weights are in [0, 1]
        for filter in &filters {
            let sum: f32 = filter.iter().sum();
            assert!(sum > 0.0);
            assert!(filter.iter().all(|&w| (0.0..=1.0).contains(&w)));
        }
    }

    #[test]
    fn mel_conversion_round_trip() {
        for hz in [100.0f32, 440.0, 1000.0, 8000.0] {
            let back = mel_to_hz(hz_to_mel(hz));
            assert!((back - hz).abs() < 0.5, "{} -> {}", hz, back);
        }
    }

    #[test]
    fn dct_of_constant_concentrates_in_first_coefficient() {
        let input = vec![1.0f32; 26];
        let coeffs = dct_ii(&input, 13);
        assert!((coeffs[0] - 26.0).abs() < 1e-3);
        for c in &coeffs[1..] {
            assert!(c.abs() < 1e-3);
        }
    }

    #[test]
    fn steady_tone_has_low_delta_variance() {
        let sample_rate = 22050;
        let stft = Stft::new(2048, 512);
        let extractor = MfccExtractor::new(sample_rate, 2048, 26, 13);

        let samples: Vec<f32> = (0..sample_rate as usize * 2)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sample_rate as f32).sin())
            .collect();

        let mfccs = extractor.mfccs(&stft, &samples);
        let deltas = MfccExtractor::delta(&mfccs);
        let var = MfccExtractor::delta_variance(&deltas);

        assert_eq!(var.len(), mfccs.len());
        // Interior frames of a steady tone have near-zero spectral motion
        let interior = &var[4..var.len() - 4];
        let avg = interior.iter().sum::<f32>() / interior.len() as f32;
        assert!(avg < 0.1, "steady tone delta variance = {}", avg);
    }

    #[test]
    fn delta_of_constant_sequence_is_zero() {
        let mfccs = vec![vec![1.0, 2.0, 3.0]; 10];
        let deltas = MfccExtractor::delta(&mfccs);
        for frame in deltas {
            for d in frame {
                assert!(d.abs() < 1e-6);
            }
        }
    }
}
