//! Upload intake for the retune pipeline
//!
//! Validates uploaded video content, lays out the per-session working
//! directory, and hashes the source for deduplication.

use akira_common::{Error, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Per-session file layout under the root folder
///
/// ```text
/// <root>/uploads/<session_id>/
///     source.mp4        uploaded video, verbatim
///     work/audio.wav    extracted mono-downmixable track
///     work/retuned.wav  processed track
///     retuned.mp4       retuned video
/// ```
#[derive(Debug, Clone)]
pub struct SessionPaths {
    session_dir: PathBuf,
}

impl SessionPaths {
    /// Locate the session directory without creating it
    pub fn locate(root_folder: &Path, session_id: Uuid) -> Self {
        Self {
            session_dir: root_folder.join("uploads").join(session_id.to_string()),
        }
    }

    /// Create the session directory tree
    pub fn create(root_folder: &Path, session_id: Uuid) -> Result<Self> {
        let paths = Self::locate(root_folder, session_id);
        std::fs::create_dir_all(paths.work_dir())?;
        Ok(paths)
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    pub fn work_dir(&self) -> PathBuf {
        self.session_dir.join("work")
    }

    /// Uploaded video, stored verbatim
    pub fn source_video(&self) -> PathBuf {
        self.session_dir.join("source.mp4")
    }

    /// Audio track extracted by ffmpeg
    pub fn extracted_wav(&self) -> PathBuf {
        self.work_dir().join("audio.wav")
    }

    /// Retuned audio track awaiting mux
    pub fn retuned_wav(&self) -> PathBuf {
        self.work_dir().join("retuned.wav")
    }

    /// Final retuned video
    pub fn output_video(&self) -> PathBuf {
        self.session_dir.join("retuned.mp4")
    }

    /// Remove intermediate work files, keeping source and output
    pub fn cleanup_work_files(&self) -> Result<()> {
        let work = self.work_dir();
        if work.is_dir() {
            std::fs::remove_dir_all(&work)?;
        }
        Ok(())
    }
}

/// Validate that uploaded content is an MP4/QuickTime family video
///
/// Sniffs magic bytes rather than trusting the filename or the
/// client-supplied content type. QuickTime-branded ftyp boxes are
/// accepted alongside plain MP4; ffmpeg demuxes both.
pub fn validate_mp4(leading_bytes: &[u8]) -> Result<()> {
    match infer::get(leading_bytes) {
        Some(kind) if matches!(kind.mime_type(), "video/mp4" | "video/quicktime") => Ok(()),
        Some(kind) => Err(Error::InvalidInput(format!(
            "Expected an MP4 video, got {}",
            kind.mime_type()
        ))),
        None => Err(Error::InvalidInput(
            "Unrecognized file content; expected an MP4 video".to_string(),
        )),
    }
}

/// Keep only safe filename characters for display and output naming
pub fn sanitize_filename(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches(['.', ' ']).is_empty() {
        "upload.mp4".to_string()
    } else {
        cleaned
    }
}

/// Calculate SHA-256 hash of a stored upload
///
/// Reads in 1MB chunks on a blocking thread; uploads can be large.
pub async fn hash_file(file_path: &Path) -> Result<String> {
    let path = file_path.to_path_buf();
    tracing::debug!(path = %path.display(), "Calculating SHA-256 hash");

    tokio::task::spawn_blocking(move || -> Result<String> {
        use std::fs::File;
        use std::io::Read;

        let mut file = File::open(&path)?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; 1024 * 1024];

        loop {
            let bytes_read = file.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    })
    .await
    .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal ftyp box that infer recognizes as video/mp4
    fn mp4_header() -> Vec<u8> {
        let mut bytes = vec![0x00, 0x00, 0x00, 0x18];
        bytes.extend_from_slice(b"ftypmp42");
        bytes.extend_from_slice(&[0x00; 16]);
        bytes
    }

    // TC-IN-001: Given MP4 magic bytes, When validated, Then accepted
    #[test]
    fn tc_in_001_accepts_mp4() {
        assert!(validate_mp4(&mp4_header()).is_ok());
    }

    // TC-IN-006: Given a QuickTime-branded ftyp box, When validated,
    // Then accepted (MP4/QuickTime family)
    #[test]
    fn tc_in_006_accepts_quicktime() {
        let mut bytes = vec![0x00, 0x00, 0x00, 0x14];
        bytes.extend_from_slice(b"ftypqt  ");
        bytes.extend_from_slice(&[0x00; 16]);
        assert!(validate_mp4(&bytes).is_ok());
    }

    // TC-IN-002: Given non-video content, When validated, Then rejected
    #[test]
    fn tc_in_002_rejects_other_content() {
        // PNG magic
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert!(matches!(
            validate_mp4(&png),
            Err(Error::InvalidInput(_))
        ));

        assert!(validate_mp4(b"plain text, not a video").is_err());
    }

    // TC-IN-003: Given a session id, When created,
    // Then the directory tree exists with the expected layout
    #[test]
    fn tc_in_003_session_layout() {
        let dir = tempfile::tempdir().unwrap();
        let session_id = Uuid::new_v4();

        let paths = SessionPaths::create(dir.path(), session_id).unwrap();
        assert!(paths.work_dir().is_dir());
        assert!(paths
            .source_video()
            .starts_with(dir.path().join("uploads").join(session_id.to_string())));
        assert_eq!(paths.extracted_wav().file_name().unwrap(), "audio.wav");
    }

    // TC-IN-004: Given hostile filenames, When sanitized,
    // Then path separators and control characters are stripped
    #[test]
    fn tc_in_004_sanitize_filename() {
        assert_eq!(sanitize_filename("cartoon.mp4"), "cartoon.mp4");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("a b/c:d.mp4"), "c_d.mp4");
        assert_eq!(sanitize_filename(""), "upload.mp4");
        assert_eq!(sanitize_filename("..."), "upload.mp4");
    }

    // TC-IN-005: Given a file, When hashed, Then the SHA-256 is stable
    #[tokio::test]
    async fn tc_in_005_hash_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"akira").unwrap();

        let hash = hash_file(&path).await.unwrap();
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_file(&path).await.unwrap());
    }
}
