use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("source audio not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),
}
