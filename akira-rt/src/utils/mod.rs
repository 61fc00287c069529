//! Shared utilities for akira-rt

pub mod audio_decoder;
pub mod wav_writer;

pub use audio_decoder::{decode_audio_file, DecodedAudio};
pub use wav_writer::write_mono_wav;
