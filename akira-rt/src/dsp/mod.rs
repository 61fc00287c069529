//! Signal processing for overstimulation detection and retuning
//!
//! All routines operate on mono f32 PCM in [-1.0, 1.0]. Frame-based
//! analysis uses the same frame/hop geometry throughout (2048/512 by
//! default) so the three feature envelopes line up frame for frame.

pub mod detector;
pub mod loudness;
pub mod mel;
pub mod resample;
pub mod retune;
pub mod stft;
pub mod window;

pub use detector::{FlaggedInterval, OverstimDetector};
pub use stft::Stft;
