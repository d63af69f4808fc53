use async_trait::async_trait;

use crate::audio::{AudioArtifact, NormalizeError, NormalizedAudio};
use crate::backend::{Analysis, BackendRecord, Generated, GenerationContext, ProcessedContent};
use crate::query::{ExternalReply, QueryError};
use crate::speech::TranscriptionError;

#[async_trait]
pub trait AudioNormalizer: Send + Sync {
    /// Any artifact written here belongs to the caller, who must remove it.
    async fn normalize(&self, artifact: &AudioArtifact) -> Result<NormalizedAudio, NormalizeError>;
}

#[async_trait]
pub trait SpeechEngine: Send + Sync {
    async fn transcribe(&self, audio: &NormalizedAudio) -> Result<String, TranscriptionError>;
}

#[async_trait]
pub trait QueryClient: Send + Sync {
    async fn query(&self, text: &str) -> Result<ExternalReply, QueryError>;
}

/// Analysis, post-processing and generation behind one envelope. Operations
/// never fail outright: bad input or an unavailable service comes back as a
/// record whose status is not `success`.
#[async_trait]
pub trait ResponseBackend: Send + Sync {
    /// Fixed for the lifetime of the backend and shared by every record.
    fn session_id(&self) -> &str;

    async fn analyze(&self, text: &str) -> BackendRecord<Analysis>;

    async fn process(&self, reply: &ExternalReply) -> BackendRecord<ProcessedContent>;

    async fn generate(
        &self,
        text: &str,
        context: Option<&GenerationContext>,
    ) -> BackendRecord<Generated>;
}
