//! Audio intake: format sniffing and normalisation into canonical WAV.

mod error;
mod format;
mod normalizer;

pub use error::NormalizeError;
pub use format::AudioFormat;
pub use normalizer::{transcode_target, FsAudioNormalizer};

use std::path::{Path, PathBuf};

/// A reference to caller-owned audio on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    pub path: PathBuf,
    pub mime_hint: Option<String>,
}

impl AudioArtifact {
    pub fn from_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            mime_hint: None,
        }
    }

    pub fn with_mime_hint<S: Into<String>>(mut self, mime: S) -> Self {
        self.mime_hint = Some(mime.into());
        self
    }
}

/// Audio ready for the transcription stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedAudio {
    pub path: PathBuf,
    pub format: AudioFormat,
    /// Set when a new artifact was written; the caller owns its cleanup.
    pub transcoded: bool,
}

impl NormalizedAudio {
    pub fn passthrough<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            format: AudioFormat::Wav,
            transcoded: false,
        }
    }
}
