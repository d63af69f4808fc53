use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::audio::{AudioArtifact, FsAudioNormalizer};
use crate::backend::{build_backend, Analysis, BackendRecord};
use crate::config::AppConfig;
use crate::orchestrator::config::PipelineConfig;
use crate::orchestrator::constants::{NO_INPUT_MESSAGE, NO_SPEECH_MESSAGE, PREVIEW_CHARS, TARGET};
use crate::orchestrator::error::PipelineError;
use crate::orchestrator::traits::{AudioNormalizer, QueryClient, ResponseBackend, SpeechEngine};
use crate::orchestrator::types::{
    PipelineInput, PipelineMetadata, PipelineMode, PipelineRequest, PipelineResult,
    PipelineStatus, Stage,
};
use crate::query::DifyClient;
use crate::speech::{CloudSpeechEngine, TranscriptionError};
use crate::telemetry::events::record_pipeline_outcome;

/// Text recovered from audio, kept for the result metadata.
struct Heard {
    transcript: String,
    analysis: Option<Analysis>,
}

/// Runs one request start to finish: optional transcription, then either the
/// delegated path (external query, then backend post-processing) or the
/// direct path (backend generation). Every outcome, including failures, is a
/// `PipelineResult`.
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    normalizer: Arc<dyn AudioNormalizer>,
    speech: Arc<dyn SpeechEngine>,
    query: Arc<dyn QueryClient>,
    backend: Arc<dyn ResponseBackend>,
}

impl PipelineOrchestrator {
    pub fn from_config(config: &AppConfig) -> Self {
        Self::with_components(
            PipelineConfig::default(),
            Arc::new(FsAudioNormalizer::with_scratch_dir(
                &config.server.upload_dir,
            )),
            Arc::new(CloudSpeechEngine::new(&config.speech)),
            Arc::new(DifyClient::new(&config.dify)),
            build_backend(&config.backend),
        )
    }

    pub fn with_components(
        config: PipelineConfig,
        normalizer: Arc<dyn AudioNormalizer>,
        speech: Arc<dyn SpeechEngine>,
        query: Arc<dyn QueryClient>,
        backend: Arc<dyn ResponseBackend>,
    ) -> Self {
        Self {
            config,
            normalizer,
            speech,
            query,
            backend,
        }
    }

    pub fn session_id(&self) -> &str {
        self.backend.session_id()
    }

    pub async fn run(&self, request: PipelineRequest) -> PipelineResult {
        let started = Instant::now();
        let mode = request.mode();
        let input_kind = request.input_kind();

        let result = match self.execute(request, mode).await {
            Ok(result) => result,
            Err(err) => {
                warn!(
                    target: TARGET,
                    stage = err.stage().as_str(),
                    error = %err,
                    "pipeline terminated with error"
                );
                PipelineResult::failure(mode, &err)
            }
        };

        record_pipeline_outcome(
            mode.as_str(),
            input_kind,
            result.status.as_str(),
            result.failed_stage().map(|stage| stage.as_str()),
            started.elapsed(),
        );
        result
    }

    async fn execute(
        &self,
        request: PipelineRequest,
        mode: PipelineMode,
    ) -> Result<PipelineResult, PipelineError> {
        let (text, heard) = match request.input {
            None => return Err(PipelineError::InputValidation(NO_INPUT_MESSAGE.into())),
            Some(PipelineInput::Text(text)) => (text, None),
            Some(PipelineInput::Audio(artifact)) => match self.listen(&artifact).await? {
                Some(heard) => (heard.transcript.clone(), Some(heard)),
                None => return Err(PipelineError::InputValidation(NO_SPEECH_MESSAGE.into())),
            },
        };

        if text.trim().is_empty() {
            return Err(PipelineError::InputValidation(NO_INPUT_MESSAGE.into()));
        }

        info!(
            target: TARGET,
            mode = mode.as_str(),
            text = %preview(&text),
            "running pipeline"
        );

        match mode {
            PipelineMode::Delegated => self.delegate(text, heard).await,
            PipelineMode::Direct => self.respond_directly(text, heard).await,
        }
    }

    /// Normalises and transcribes audio. `Ok(None)` means no usable speech.
    async fn listen(&self, artifact: &AudioArtifact) -> Result<Option<Heard>, PipelineError> {
        let normalized = self.normalizer.normalize(artifact).await?;
        let transcribed = self.speech.transcribe(&normalized).await;
        if normalized.transcoded {
            discard_scratch(&normalized.path).await;
        }

        let transcript = match transcribed {
            Ok(transcript) if !transcript.trim().is_empty() => transcript,
            Ok(_) | Err(TranscriptionError::Unrecognized) => {
                info!(target: TARGET, "audio contained no recognizable speech");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let analysis = if self.config.analyze_transcripts {
            let record = self.backend.analyze(&transcript).await;
            if !record.is_success() {
                debug!(
                    target: TARGET,
                    status = record.status.as_str(),
                    message = %record.message,
                    "transcript analysis unavailable"
                );
            }
            record.payload
        } else {
            None
        };

        Ok(Some(Heard {
            transcript,
            analysis,
        }))
    }

    async fn delegate(
        &self,
        text: String,
        heard: Option<Heard>,
    ) -> Result<PipelineResult, PipelineError> {
        let reply = self.query.query(&text).await?;
        let processed = accept(self.backend.process(&reply).await, Stage::PostProcessing)?;

        let metadata = attach_heard(
            PipelineMetadata::new(PipelineMode::Delegated).with_backend(processed.metadata),
            heard,
        );

        Ok(PipelineResult {
            status: PipelineStatus::Success,
            message: processed.message,
            session_id: Some(processed.session_id),
            timestamp: processed.timestamp,
            content: processed.payload.map(|payload| payload.content),
            response_text: None,
            input: None,
            raw_external_reply: Some(reply),
            metadata: Some(metadata),
        })
    }

    async fn respond_directly(
        &self,
        text: String,
        heard: Option<Heard>,
    ) -> Result<PipelineResult, PipelineError> {
        let generated = accept(self.backend.generate(&text, None).await, Stage::Generation)?;

        let mut metadata = attach_heard(
            PipelineMetadata::new(PipelineMode::Direct).with_backend(generated.metadata),
            heard,
        );
        let (response_text, context) = match generated.payload {
            Some(payload) => (Some(payload.text), payload.context),
            None => (None, Default::default()),
        };
        if !context.is_empty() {
            metadata.context = Some(context);
        }

        Ok(PipelineResult {
            status: PipelineStatus::Success,
            message: generated.message,
            session_id: Some(generated.session_id),
            timestamp: generated.timestamp,
            content: None,
            response_text,
            input: Some(text),
            raw_external_reply: None,
            metadata: Some(metadata),
        })
    }
}

/// Anything other than a successful record with a payload ends the run.
fn accept<T>(record: BackendRecord<T>, stage: Stage) -> Result<BackendRecord<T>, PipelineError> {
    if record.is_success() {
        Ok(record)
    } else {
        Err(PipelineError::Backend {
            stage,
            status: record.status,
            message: record.message,
        })
    }
}

/// Transcoded audio is request-scoped; the caller's source file is never removed.
async fn discard_scratch(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(target: TARGET, path = %path.display(), "removed transcoded audio"),
        Err(err) => warn!(
            target: TARGET,
            path = %path.display(),
            error = %err,
            "failed to remove transcoded audio"
        ),
    }
}

fn attach_heard(mut metadata: PipelineMetadata, heard: Option<Heard>) -> PipelineMetadata {
    if let Some(heard) = heard {
        metadata.transcript = Some(heard.transcript);
        metadata.analysis = heard.analysis;
    }
    metadata
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}
