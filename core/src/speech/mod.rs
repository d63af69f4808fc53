//! Speech recognition clients.

mod cloud;

pub use cloud::CloudSpeechEngine;

use thiserror::Error;

/// Recognition language. Fixed for this service; not exposed to callers.
pub const LANGUAGE_CODE: &str = "ja-JP";

#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// Audio was received but no text could be decoded from it.
    #[error("speech could not be recognized")]
    Unrecognized,
    #[error("speech service unavailable: {0}")]
    ServiceUnavailable(String),
}
