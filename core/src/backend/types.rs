use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::timestamp_now;

pub type GenerationContext = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendStatus {
    Success,
    Error,
    Unknown,
}

impl BackendStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendStatus::Success => "success",
            BackendStatus::Error => "error",
            BackendStatus::Unknown => "unknown",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "success" => BackendStatus::Success,
            "error" => BackendStatus::Error,
            _ => BackendStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendMetadata {
    pub source: String,
    pub version: String,
}

impl BackendMetadata {
    pub fn new<S: Into<String>, V: Into<String>>(source: S, version: V) -> Self {
        Self {
            source: source.into(),
            version: version.into(),
        }
    }
}

/// Envelope shared by every backend operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendRecord<T> {
    pub status: BackendStatus,
    pub message: String,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BackendMetadata>,
}

impl<T> BackendRecord<T> {
    pub fn success<S: Into<String>>(
        session_id: &str,
        message: S,
        payload: T,
        metadata: BackendMetadata,
    ) -> Self {
        Self {
            status: BackendStatus::Success,
            message: message.into(),
            session_id: session_id.to_string(),
            timestamp: Some(timestamp_now()),
            payload: Some(payload),
            metadata: Some(metadata),
        }
    }

    /// Degraded record for refused or failed operations; carries no payload.
    pub fn error<S: Into<String>>(session_id: &str, message: S) -> Self {
        Self {
            status: BackendStatus::Error,
            message: message.into(),
            session_id: session_id.to_string(),
            timestamp: None,
            payload: None,
            metadata: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == BackendStatus::Success && self.payload.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    /// Any label a remote backend reports outside the two known values.
    #[serde(other)]
    Unclassified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub text: String,
    pub sentiment: Sentiment,
    pub word_count: usize,
    pub char_count: usize,
}

impl Analysis {
    pub fn new(text: &str, sentiment: Sentiment) -> Self {
        Self {
            text: text.to_string(),
            sentiment,
            word_count: text.split_whitespace().count(),
            char_count: text.chars().count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedContent {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generated {
    pub text: String,
    pub input: String,
    pub context: GenerationContext,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_labels_map_to_unknown() {
        assert_eq!(BackendStatus::from_label("SUCCESS"), BackendStatus::Success);
        assert_eq!(BackendStatus::from_label("error"), BackendStatus::Error);
        assert_eq!(BackendStatus::from_label("pending"), BackendStatus::Unknown);
    }

    #[test]
    fn analysis_counts_words_and_chars() {
        let analysis = Analysis::new("thank you so much", Sentiment::Positive);
        assert_eq!(analysis.word_count, 4);
        assert_eq!(analysis.char_count, 17);

        let japanese = Analysis::new("ありがとう", Sentiment::Positive);
        assert_eq!(japanese.word_count, 1);
        assert_eq!(japanese.char_count, 5);
    }

    #[test]
    fn error_record_omits_payload_and_timestamp() {
        let record: BackendRecord<ProcessedContent> = BackendRecord::error("s-1", "empty");
        let encoded = serde_json::to_value(&record).expect("record encodes");
        assert_eq!(
            encoded,
            serde_json::json!({"status": "error", "message": "empty", "sessionId": "s-1"})
        );
        assert!(!record.is_success());
    }

    #[test]
    fn unexpected_sentiment_label_is_unclassified() {
        let sentiment: Sentiment =
            serde_json::from_str("\"negative\"").expect("sentiment decodes");
        assert_eq!(sentiment, Sentiment::Unclassified);
    }
}
