use serde::{Deserialize, Serialize};

use crate::audio::AudioArtifact;
use crate::backend::{Analysis, BackendMetadata, GenerationContext};
use crate::query::ExternalReply;

use super::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineInput {
    Text(String),
    Audio(AudioArtifact),
}

impl PipelineInput {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineInput::Text(_) => "text",
            PipelineInput::Audio(_) => "audio",
        }
    }
}

/// One pipeline invocation. `input` is `None` when the caller supplied
/// neither text nor audio; the pipeline rejects that as invalid input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRequest {
    pub input: Option<PipelineInput>,
    /// `true` sends the text to the external query endpoint first; `false`
    /// lets the backend generate a reply directly.
    pub delegate: bool,
}

impl PipelineRequest {
    pub fn text<S: Into<String>>(text: S, delegate: bool) -> Self {
        Self {
            input: Some(PipelineInput::Text(text.into())),
            delegate,
        }
    }

    pub fn audio(artifact: AudioArtifact, delegate: bool) -> Self {
        Self {
            input: Some(PipelineInput::Audio(artifact)),
            delegate,
        }
    }

    pub fn empty(delegate: bool) -> Self {
        Self {
            input: None,
            delegate,
        }
    }

    pub fn mode(&self) -> PipelineMode {
        if self.delegate {
            PipelineMode::Delegated
        } else {
            PipelineMode::Direct
        }
    }

    pub fn input_kind(&self) -> &'static str {
        self.input.as_ref().map(PipelineInput::kind).unwrap_or("none")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    Delegated,
    Direct,
}

impl PipelineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineMode::Delegated => "delegated",
            PipelineMode::Direct => "direct",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    Success,
    Error,
}

impl PipelineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::Success => "success",
            PipelineStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Input,
    Normalization,
    Transcription,
    Query,
    PostProcessing,
    Generation,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Input => "input",
            Stage::Normalization => "normalization",
            Stage::Transcription => "transcription",
            Stage::Query => "query",
            Stage::PostProcessing => "post_processing",
            Stage::Generation => "generation",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Input => "input validation",
            Stage::Normalization => "audio normalization",
            Stage::Transcription => "transcription",
            Stage::Query => "external query",
            Stage::PostProcessing => "post-processing",
            Stage::Generation => "response generation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineMetadata {
    pub mode: PipelineMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<GenerationContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<Stage>,
}

impl PipelineMetadata {
    pub fn new(mode: PipelineMode) -> Self {
        Self {
            mode,
            source: None,
            version: None,
            transcript: None,
            analysis: None,
            context: None,
            failed_stage: None,
        }
    }

    pub(crate) fn with_backend(mut self, metadata: Option<BackendMetadata>) -> Self {
        if let Some(metadata) = metadata {
            self.source = Some(metadata.source);
            self.version = Some(metadata.version);
        }
        self
    }
}

/// The only artifact exposed across the service boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub status: PipelineStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_external_reply: Option<ExternalReply>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PipelineMetadata>,
}

impl PipelineResult {
    pub fn failure(mode: PipelineMode, err: &PipelineError) -> Self {
        let mut metadata = PipelineMetadata::new(mode);
        metadata.failed_stage = Some(err.stage());
        Self {
            status: PipelineStatus::Error,
            message: err.describe(),
            session_id: None,
            timestamp: None,
            content: None,
            response_text: None,
            input: None,
            raw_external_reply: None,
            metadata: Some(metadata),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == PipelineStatus::Success
    }

    pub fn failed_stage(&self) -> Option<Stage> {
        self.metadata.as_ref().and_then(|metadata| metadata.failed_stage)
    }
}
