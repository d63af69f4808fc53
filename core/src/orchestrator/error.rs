use thiserror::Error;

use super::types::Stage;
use crate::audio::NormalizeError;
use crate::backend::BackendStatus;
use crate::query::QueryError;
use crate::speech::TranscriptionError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    InputValidation(String),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Transcription(#[from] TranscriptionError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("{message} (status: {})", .status.as_str())]
    Backend {
        stage: Stage,
        status: BackendStatus,
        message: String,
    },
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::InputValidation(_) => Stage::Input,
            PipelineError::Normalize(_) => Stage::Normalization,
            PipelineError::Transcription(_) => Stage::Transcription,
            PipelineError::Query(_) => Stage::Query,
            PipelineError::Backend { stage, .. } => *stage,
        }
    }

    /// User-facing message naming the failing stage.
    pub fn describe(&self) -> String {
        format!("{} failed: {self}", self.stage().label())
    }
}
