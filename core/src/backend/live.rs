use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use super::{
    extract_content, new_session_id, Analysis, BackendMetadata, BackendRecord, BackendStatus,
    Generated, GenerationContext, ProcessedContent, Sentiment,
};
use crate::config::LiveBackendConfig;
use crate::orchestrator::traits::ResponseBackend;
use crate::query::ExternalReply;

const TARGET: &str = "response_backend";
const SOURCE: &str = "zonos_live";

/// HTTP client for a remote response service. It reads the same fields the
/// rule-based backend produces (`analysis`, `processed_content`,
/// `response.text`) and rewraps them in this instance's envelope. Remote
/// failures become error records rather than errors.
#[derive(Clone)]
pub struct LiveBackend {
    agent: ureq::Agent,
    endpoint: String,
    session_id: String,
}

impl LiveBackend {
    pub fn new(config: &LiveBackendConfig) -> Self {
        Self::with_session_id(config, new_session_id())
    }

    pub fn with_session_id<S: Into<String>>(config: &LiveBackendConfig, session_id: S) -> Self {
        let session_id = session_id.into();
        info!(
            target: TARGET,
            %session_id,
            endpoint = %config.endpoint,
            source = SOURCE,
            "response backend ready"
        );
        Self {
            agent: ureq::AgentBuilder::new().build(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            session_id,
        }
    }

    async fn call(
        &self,
        operation: &'static str,
        body: Value,
    ) -> Result<Map<String, Value>, String> {
        let agent = self.agent.clone();
        let url = format!("{}/{operation}", self.endpoint);
        debug!(target: TARGET, %url, "calling response service");

        tokio::task::spawn_blocking(move || post_json(&agent, &url, body))
            .await
            .map_err(|err| format!("response service task failed: {err}"))?
    }

    fn record<T>(
        &self,
        reply: &Map<String, Value>,
        default_message: &str,
        payload: T,
    ) -> BackendRecord<T> {
        let status = reply
            .get("status")
            .and_then(Value::as_str)
            .map(BackendStatus::from_label)
            .unwrap_or(BackendStatus::Unknown);
        let message = reply
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(default_message);

        if status != BackendStatus::Success {
            warn!(
                target: TARGET,
                status = status.as_str(),
                %message,
                "response service reported failure"
            );
            let mut record = BackendRecord::error(&self.session_id, message);
            record.status = status;
            return record;
        }

        BackendRecord::success(&self.session_id, message, payload, remote_metadata(reply))
    }

    fn failure<T>(&self, operation: &str, err: String) -> BackendRecord<T> {
        warn!(target: TARGET, operation, error = %err, "response service unreachable");
        BackendRecord::error(
            &self.session_id,
            format!("response service {operation} failed: {err}"),
        )
    }
}

fn post_json(agent: &ureq::Agent, url: &str, body: Value) -> Result<Map<String, Value>, String> {
    let response = agent.post(url).send_json(body).map_err(|err| match err {
        ureq::Error::Status(status, _) => format!("status {status}"),
        ureq::Error::Transport(transport) => transport.to_string(),
    })?;

    match response.into_json::<Value>() {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(format!("expected a JSON object, got {other}")),
        Err(err) => Err(format!("invalid JSON reply: {err}")),
    }
}

fn remote_metadata(reply: &Map<String, Value>) -> BackendMetadata {
    let metadata = reply.get("metadata");
    let field = |key: &str| {
        metadata
            .and_then(|value| value.get(key))
            .and_then(Value::as_str)
            .map(String::from)
    };
    BackendMetadata::new(
        field("source").unwrap_or_else(|| SOURCE.to_string()),
        field("version").unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
    )
}

fn render(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl ResponseBackend for LiveBackend {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn analyze(&self, text: &str) -> BackendRecord<Analysis> {
        if text.trim().is_empty() {
            return BackendRecord::error(&self.session_id, "empty text for analysis");
        }

        match self.call("analyze", json!({ "text": text })).await {
            Ok(reply) => {
                let sentiment = reply
                    .get("analysis")
                    .and_then(|analysis| analysis.get("sentiment"))
                    .cloned()
                    .and_then(|value| serde_json::from_value::<Sentiment>(value).ok())
                    .unwrap_or(Sentiment::Unclassified);
                self.record(&reply, "text analysis completed", Analysis::new(text, sentiment))
            }
            Err(err) => self.failure("analyze", err),
        }
    }

    async fn process(&self, reply: &ExternalReply) -> BackendRecord<ProcessedContent> {
        if reply.is_empty() {
            return BackendRecord::error(&self.session_id, "empty reply payload");
        }

        match self.call("process", json!({ "payload": reply })).await {
            Ok(remote) => {
                let content = remote
                    .get("processed_content")
                    .map(render)
                    .unwrap_or_else(|| extract_content(reply));
                self.record(&remote, "reply processing completed", ProcessedContent { content })
            }
            Err(err) => self.failure("process", err),
        }
    }

    async fn generate(
        &self,
        text: &str,
        context: Option<&GenerationContext>,
    ) -> BackendRecord<Generated> {
        if text.trim().is_empty() {
            return BackendRecord::error(&self.session_id, "empty input text");
        }

        let context = context.cloned().unwrap_or_default();
        let body = json!({ "text": text, "context": &context });
        match self.call("generate", body).await {
            Ok(remote) => {
                let reply_text = remote
                    .get("response")
                    .and_then(|response| response.get("text"))
                    .and_then(Value::as_str)
                    .map(String::from)
                    .unwrap_or_else(|| {
                        extract_content(&ExternalReply::new(Value::Object(remote.clone())))
                    });
                let generated = Generated {
                    text: reply_text,
                    input: text.to_string(),
                    context,
                };
                self.record(&remote, "response generation completed", generated)
            }
            Err(err) => self.failure("generate", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{request_body, FakeHttpServer};

    fn backend(endpoint: &str) -> LiveBackend {
        LiveBackend::with_session_id(
            &LiveBackendConfig {
                endpoint: endpoint.to_string(),
            },
            "20240101120000",
        )
    }

    #[tokio::test]
    async fn generate_reads_response_text_and_keeps_own_session() {
        let server = FakeHttpServer::json(
            200,
            r#"{"status":"success","message":"done","session_id":"remote","response":{"text":"やあ"},"metadata":{"source":"zonos","version":"2.1"}}"#,
        );

        let record = backend(&format!("{}/", server.url))
            .generate("こんにちは", None)
            .await;
        let request = server.request();

        assert!(request.starts_with("POST /generate "));
        let body: Value = serde_json::from_str(request_body(&request)).expect("json body");
        assert_eq!(body, json!({"text": "こんにちは", "context": {}}));

        assert_eq!(record.status, BackendStatus::Success);
        assert_eq!(record.session_id, "20240101120000");
        assert_eq!(record.message, "done");
        assert_eq!(record.payload.expect("payload").text, "やあ");
        assert_eq!(record.metadata, Some(BackendMetadata::new("zonos", "2.1")));
    }

    #[tokio::test]
    async fn process_falls_back_to_local_extraction() {
        let server = FakeHttpServer::json(200, r#"{"status":"success"}"#);
        let reply = ExternalReply::new(json!({"response": "r", "answer": "a"}));

        let record = backend(&server.url).process(&reply).await;
        let request = server.request();

        let body: Value = serde_json::from_str(request_body(&request)).expect("json body");
        assert_eq!(body["payload"], json!({"response": "r", "answer": "a"}));
        assert_eq!(record.payload.expect("payload").content, "a");
        assert_eq!(
            record.metadata,
            Some(BackendMetadata::new(SOURCE, env!("CARGO_PKG_VERSION")))
        );
    }

    #[tokio::test]
    async fn remote_status_is_carried_into_record() {
        let server = FakeHttpServer::json(200, r#"{"status":"pending","message":"queued"}"#);

        let record = backend(&server.url).analyze("嬉しい").await;
        server.request();

        assert_eq!(record.status, BackendStatus::Unknown);
        assert_eq!(record.message, "queued");
        assert!(record.payload.is_none());
    }

    #[tokio::test]
    async fn analyze_reads_remote_sentiment() {
        let server = FakeHttpServer::json(
            200,
            r#"{"status":"success","analysis":{"sentiment":"positive"}}"#,
        );

        let record = backend(&server.url).analyze("good news everyone").await;
        server.request();

        let analysis = record.payload.expect("analysis");
        assert_eq!(analysis.sentiment, Sentiment::Positive);
        assert_eq!(analysis.word_count, 3);
    }

    #[tokio::test]
    async fn unreachable_service_degrades_to_error_record() {
        let record = backend("http://127.0.0.1:1").generate("hello", None).await;

        assert_eq!(record.status, BackendStatus::Error);
        assert!(record.message.starts_with("response service generate failed"));
    }

    #[tokio::test]
    async fn empty_input_never_reaches_the_service() {
        let backend = backend("http://127.0.0.1:1");
        let record = backend.generate("", None).await;
        assert_eq!(record.status, BackendStatus::Error);
        assert_eq!(record.message, "empty input text");

        let record = backend.process(&ExternalReply::new(Value::Null)).await;
        assert_eq!(record.message, "empty reply payload");
    }
}
