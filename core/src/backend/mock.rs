use async_trait::async_trait;
use tracing::{info, warn};

use super::{
    extract_content, new_session_id, Analysis, BackendMetadata, BackendRecord, Generated,
    GenerationContext, ProcessedContent, Sentiment,
};
use crate::orchestrator::traits::ResponseBackend;
use crate::query::ExternalReply;

const TARGET: &str = "response_backend";
const SOURCE: &str = "zonos_mock";
const VERSION: &str = "0.1.0";
const PREVIEW_CHARS: usize = 100;
const ECHO_PREFIX_CHARS: usize = 20;

pub(crate) const GREETING_REPLY: &str =
    "こんにちは！Zonosアシスタントです。どのようにお手伝いできますか？";
pub(crate) const THANKS_REPLY: &str =
    "どういたしまして！他にお手伝いできることがあればお知らせください。";
pub(crate) const FAREWELL_REPLY: &str = "さようなら！またのご利用をお待ちしております。";

const GREETING_MARKERS: [&str; 2] = ["こんにちは", "hello"];
const THANKS_MARKERS: [&str; 2] = ["ありがとう", "thank"];
const FAREWELL_MARKERS: [&str; 2] = ["さようなら", "bye"];
const POSITIVE_MARKERS: [&str; 4] = ["ありがとう", "嬉しい", "thank", "happy"];

/// Rule-based stand-in for the response service. Sentiment is a keyword
/// check, not a model; generation matches a few fixed phrases and otherwise
/// echoes the start of the input back with a prompt.
#[derive(Debug, Clone)]
pub struct MockBackend {
    session_id: String,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::with_session_id(new_session_id())
    }

    pub fn with_session_id<S: Into<String>>(session_id: S) -> Self {
        let session_id = session_id.into();
        info!(target: TARGET, %session_id, source = SOURCE, "response backend ready");
        Self { session_id }
    }

    fn metadata() -> BackendMetadata {
        BackendMetadata::new(SOURCE, VERSION)
    }
}

fn contains_marker(text: &str, markers: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    markers.iter().any(|marker| lowered.contains(marker))
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

pub(crate) fn classify(text: &str) -> Sentiment {
    if contains_marker(text, &POSITIVE_MARKERS) {
        Sentiment::Positive
    } else {
        Sentiment::Neutral
    }
}

pub(crate) fn compose_reply(text: &str) -> String {
    if contains_marker(text, &GREETING_MARKERS) {
        GREETING_REPLY.to_string()
    } else if contains_marker(text, &THANKS_MARKERS) {
        THANKS_REPLY.to_string()
    } else if contains_marker(text, &FAREWELL_MARKERS) {
        FAREWELL_REPLY.to_string()
    } else {
        let prefix: String = text.chars().take(ECHO_PREFIX_CHARS).collect();
        format!("「{prefix}...」についてのお問い合わせを承りました。詳細を教えていただけますか？")
    }
}

#[async_trait]
impl ResponseBackend for MockBackend {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn analyze(&self, text: &str) -> BackendRecord<Analysis> {
        if text.trim().is_empty() {
            warn!(target: TARGET, "empty text passed to analyze");
            return BackendRecord::error(&self.session_id, "empty text for analysis");
        }

        info!(target: TARGET, text = %preview(text), "analyzing text");
        let analysis = Analysis::new(text, classify(text));
        BackendRecord::success(
            &self.session_id,
            "text analysis completed",
            analysis,
            Self::metadata(),
        )
    }

    async fn process(&self, reply: &ExternalReply) -> BackendRecord<ProcessedContent> {
        if reply.is_empty() {
            warn!(target: TARGET, "empty reply passed to process");
            return BackendRecord::error(&self.session_id, "empty reply payload");
        }

        info!(
            target: TARGET,
            reply = %preview(&reply.as_value().to_string()),
            "processing external reply"
        );
        let content = extract_content(reply);
        BackendRecord::success(
            &self.session_id,
            "reply processing completed",
            ProcessedContent { content },
            Self::metadata(),
        )
    }

    async fn generate(
        &self,
        text: &str,
        context: Option<&GenerationContext>,
    ) -> BackendRecord<Generated> {
        if text.trim().is_empty() {
            warn!(target: TARGET, "empty text passed to generate");
            return BackendRecord::error(&self.session_id, "empty input text");
        }

        info!(target: TARGET, text = %preview(text), "generating response");
        let generated = Generated {
            text: compose_reply(text),
            input: text.to_string(),
            context: context.cloned().unwrap_or_default(),
        };
        BackendRecord::success(
            &self.session_id,
            "response generation completed",
            generated,
            Self::metadata(),
        )
    }
}
