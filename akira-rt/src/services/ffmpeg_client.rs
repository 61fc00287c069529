//! ffmpeg subprocess client
//!
//! Audio extraction and remuxing are delegated to the ffmpeg
//! command-line tool. Decoding the extracted WAV and all analysis
//! happens in-process; ffmpeg only touches container formats.

use std::path::Path;
use std::process::Command;
use thiserror::Error;

/// ffmpeg client errors
#[derive(Debug, Error)]
pub enum FfmpegError {
    /// ffmpeg binary not found at the configured path
    #[error("ffmpeg binary not found: {0}")]
    BinaryNotFound(String),

    /// Failed to execute ffmpeg command
    #[error("Failed to execute ffmpeg: {0}")]
    ExecutionError(String),

    /// ffmpeg exited with a non-zero status
    #[error("ffmpeg failed: {0}")]
    CommandFailed(String),

    /// I/O error (file read/write)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Input file not found at path
    #[error("Input file not found: {0}")]
    FileNotFound(String),
}

/// ffmpeg client
///
/// Holds the resolved binary path for one pipeline run. Settings
/// changes take effect on the next session.
#[derive(Debug, Clone)]
pub struct FfmpegClient {
    binary_path: String,
}

impl FfmpegClient {
    /// Create new ffmpeg client, verifying the binary runs
    pub fn new(binary_path: &str) -> Result<Self, FfmpegError> {
        match Command::new(binary_path).arg("-version").output() {
            Ok(_) => Ok(Self {
                binary_path: binary_path.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FfmpegError::BinaryNotFound(binary_path.to_string()))
            }
            Err(e) => Err(FfmpegError::ExecutionError(e.to_string())),
        }
    }

    /// Extract the audio track of a video to 16-bit PCM WAV
    ///
    /// `ffmpeg -y -i video -vn -acodec pcm_s16le out.wav`
    pub async fn extract_audio(&self, video: &Path, wav_out: &Path) -> Result<(), FfmpegError> {
        if !video.exists() {
            return Err(FfmpegError::FileNotFound(video.display().to_string()));
        }

        tracing::debug!(
            video = %video.display(),
            wav = %wav_out.display(),
            "Extracting audio track"
        );

        let output = tokio::task::spawn_blocking({
            let binary = self.binary_path.clone();
            let video = video.to_path_buf();
            let wav_out = wav_out.to_path_buf();

            move || {
                Command::new(&binary)
                    .arg("-y")
                    .arg("-i")
                    .arg(&video)
                    .arg("-vn")
                    .arg("-acodec")
                    .arg("pcm_s16le")
                    .arg(&wav_out)
                    .output()
            }
        })
        .await
        .map_err(|e| FfmpegError::ExecutionError(format!("Task join error: {}", e)))?
        .map_err(|e| FfmpegError::ExecutionError(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FfmpegError::CommandFailed(format!(
                "Exit code: {:?}, stderr: {}",
                output.status.code(),
                stderr
            )));
        }

        tracing::info!(video = %video.display(), "Audio track extracted");
        Ok(())
    }

    /// Mux a retuned audio track back under the original video
    ///
    /// The video track is stream-copied; the audio track is re-encoded
    /// to AAC so the output plays in browsers.
    ///
    /// `ffmpeg -y -i video -i retuned.wav -map 0:v -map 1:a -c:v copy -c:a aac -shortest out.mp4`
    pub async fn mux_audio(
        &self,
        video: &Path,
        retuned_wav: &Path,
        video_out: &Path,
    ) -> Result<(), FfmpegError> {
        if !video.exists() {
            return Err(FfmpegError::FileNotFound(video.display().to_string()));
        }
        if !retuned_wav.exists() {
            return Err(FfmpegError::FileNotFound(retuned_wav.display().to_string()));
        }

        tracing::debug!(
            video = %video.display(),
            wav = %retuned_wav.display(),
            out = %video_out.display(),
            "Muxing retuned audio"
        );

        let output = tokio::task::spawn_blocking({
            let binary = self.binary_path.clone();
            let video = video.to_path_buf();
            let wav = retuned_wav.to_path_buf();
            let out = video_out.to_path_buf();

            move || {
                Command::new(&binary)
                    .arg("-y")
                    .arg("-i")
                    .arg(&video)
                    .arg("-i")
                    .arg(&wav)
                    .arg("-map")
                    .arg("0:v")
                    .arg("-map")
                    .arg("1:a")
                    .arg("-c:v")
                    .arg("copy")
                    .arg("-c:a")
                    .arg("aac")
                    .arg("-shortest")
                    .arg(&out)
                    .output()
            }
        })
        .await
        .map_err(|e| FfmpegError::ExecutionError(format!("Task join error: {}", e)))?
        .map_err(|e| FfmpegError::ExecutionError(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FfmpegError::CommandFailed(format!(
                "Exit code: {:?}, stderr: {}",
                output.status.code(),
                stderr
            )));
        }

        tracing::info!(out = %video_out.display(), "Retuned video written");
        Ok(())
    }

    /// Check if an ffmpeg binary is runnable at the given path
    pub fn is_available(binary_path: &str) -> bool {
        Command::new(binary_path).arg("-version").output().is_ok()
    }

    /// Construction without the binary version check, for tests that never
    /// spawn ffmpeg
    #[cfg(test)]
    pub(crate) fn unchecked(binary_path: &str) -> Self {
        Self {
            binary_path: binary_path.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_not_found() {
        let result = FfmpegClient::new("/nonexistent/akira-test-ffmpeg");
        assert!(matches!(result, Err(FfmpegError::BinaryNotFound(_))));
    }

    #[tokio::test]
    async fn missing_input_is_file_not_found() {
        // Constructed without probing so the test runs without ffmpeg installed
        let client = FfmpegClient {
            binary_path: "ffmpeg".to_string(),
        };
        let result = client
            .extract_audio(Path::new("/nonexistent/input.mp4"), Path::new("/tmp/out.wav"))
            .await;
        assert!(matches!(result, Err(FfmpegError::FileNotFound(_))));
    }
}
