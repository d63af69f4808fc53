use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use tracing::{debug, info, warn};

use super::{TranscriptionError, LANGUAGE_CODE};
use crate::audio::NormalizedAudio;
use crate::config::SpeechConfig;
use crate::orchestrator::traits::SpeechEngine;

const TARGET: &str = "speech_engine";

#[derive(Debug, Default, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Debug, Default, Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Default, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
}

/// Blocking REST client for a `speech:recognize` style endpoint. Each call
/// makes a single attempt; retry policy belongs to the caller.
#[derive(Clone)]
pub struct CloudSpeechEngine {
    agent: ureq::Agent,
    endpoint: String,
    api_key: Option<String>,
}

impl CloudSpeechEngine {
    pub fn new(config: &SpeechConfig) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl SpeechEngine for CloudSpeechEngine {
    async fn transcribe(&self, audio: &NormalizedAudio) -> Result<String, TranscriptionError> {
        let Some(api_key) = self.api_key.clone() else {
            warn!(target: TARGET, "speech API key not configured");
            return Err(TranscriptionError::ServiceUnavailable(
                "speech API key is not configured".into(),
            ));
        };

        let agent = self.agent.clone();
        let endpoint = self.endpoint.clone();
        let path = audio.path.clone();

        tokio::task::spawn_blocking(move || recognize(&agent, &endpoint, &api_key, &path))
            .await
            .map_err(|err| {
                TranscriptionError::ServiceUnavailable(format!("recognition task failed: {err}"))
            })?
    }
}

fn recognize(
    agent: &ureq::Agent,
    endpoint: &str,
    api_key: &str,
    path: &Path,
) -> Result<String, TranscriptionError> {
    let spec = hound::WavReader::open(path)
        .map(|reader| reader.spec())
        .map_err(|err| {
            debug!(target: TARGET, error = %err, "normalized audio is not readable wav");
            TranscriptionError::Unrecognized
        })?;
    let bytes = std::fs::read(path).map_err(|err| {
        TranscriptionError::ServiceUnavailable(format!("failed to read audio: {err}"))
    })?;

    let body = json!({
        "config": {
            "encoding": "LINEAR16",
            "sampleRateHertz": spec.sample_rate,
            "audioChannelCount": spec.channels,
            "languageCode": LANGUAGE_CODE,
        },
        "audio": { "content": BASE64.encode(&bytes) },
    });

    debug!(
        target: TARGET,
        sample_rate = spec.sample_rate,
        bytes = bytes.len(),
        "sending audio for recognition"
    );

    let response = agent
        .post(endpoint)
        .query("key", api_key)
        .send_json(body)
        .map_err(|err| match err {
            ureq::Error::Status(status, _) => TranscriptionError::ServiceUnavailable(format!(
                "recognition endpoint returned status {status}"
            )),
            ureq::Error::Transport(transport) => {
                TranscriptionError::ServiceUnavailable(transport.to_string())
            }
        })?;

    let parsed: RecognizeResponse = response.into_json().map_err(|err| {
        TranscriptionError::ServiceUnavailable(format!("invalid recognition response: {err}"))
    })?;

    let transcript: String = parsed
        .results
        .iter()
        .filter_map(|result| result.alternatives.first())
        .map(|alternative| alternative.transcript.as_str())
        .collect();
    let transcript = transcript.trim().to_string();

    if transcript.is_empty() {
        info!(target: TARGET, "no speech recognized");
        return Err(TranscriptionError::Unrecognized);
    }

    info!(target: TARGET, chars = transcript.chars().count(), "speech recognized");
    Ok(transcript)
}
