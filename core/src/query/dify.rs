use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::{ExternalReply, QueryError};
use crate::config::DifyConfig;
use crate::orchestrator::traits::QueryClient;

const TARGET: &str = "query_client";
const RESPONSE_MODE: &str = "streaming";
const PREVIEW_CHARS: usize = 50;
const CARRIED_STREAM_FIELDS: [&str; 3] = ["conversation_id", "message_id", "task_id"];

#[derive(Debug, Serialize)]
struct ChatRequest {
    inputs: Map<String, Value>,
    query: String,
    response_mode: &'static str,
    conversation_id: &'static str,
    user: String,
}

/// Client for a Dify-style `chat-messages` endpoint. Every call is a fresh,
/// single-turn exchange with no conversation carried between calls.
#[derive(Clone)]
pub struct DifyClient {
    agent: ureq::Agent,
    endpoint: String,
    api_key: String,
    user: String,
}

impl DifyClient {
    pub fn new(config: &DifyConfig) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            user: config.user.clone(),
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/chat-messages", self.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl QueryClient for DifyClient {
    async fn query(&self, text: &str) -> Result<ExternalReply, QueryError> {
        let request = ChatRequest {
            inputs: Map::new(),
            query: text.to_string(),
            response_mode: RESPONSE_MODE,
            conversation_id: "",
            user: self.user.clone(),
        };
        let agent = self.agent.clone();
        let url = self.chat_url();
        let authorization = format!("Bearer {}", self.api_key);

        debug!(
            target: TARGET,
            %url,
            query = %preview(text),
            "sending external query"
        );

        tokio::task::spawn_blocking(move || send_chat(&agent, &url, &authorization, &request))
            .await
            .map_err(|err| QueryError::TransportError(format!("query task failed: {err}")))?
    }
}

fn send_chat(
    agent: &ureq::Agent,
    url: &str,
    authorization: &str,
    request: &ChatRequest,
) -> Result<ExternalReply, QueryError> {
    let response = match agent
        .post(url)
        .set("Authorization", authorization)
        .set("Content-Type", "application/json")
        .send_json(request)
    {
        Ok(response) => response,
        Err(ureq::Error::Status(status, response)) => {
            let body = response.into_string().unwrap_or_default();
            warn!(target: TARGET, status, %body, "external query rejected");
            return Err(QueryError::RemoteError { status, body });
        }
        Err(ureq::Error::Transport(transport)) => {
            warn!(target: TARGET, error = %transport, "external query transport failure");
            return Err(QueryError::TransportError(transport.to_string()));
        }
    };

    let status = response.status();
    let body = response
        .into_string()
        .map_err(|err| QueryError::TransportError(format!("failed to read reply: {err}")))?;

    if status != 200 {
        warn!(target: TARGET, status, "external query returned non-200 status");
        return Err(QueryError::RemoteError { status, body });
    }

    let reply = parse_reply(&body)?;
    info!(target: TARGET, bytes = body.len(), "external query completed");
    Ok(reply)
}

/// Accepts either a single JSON document or a `data: {...}` event stream.
pub(crate) fn parse_reply(body: &str) -> Result<ExternalReply, QueryError> {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return Ok(ExternalReply::new(value));
    }

    parse_event_stream(body)?
        .ok_or_else(|| QueryError::MalformedReply(preview(body)))
}

fn parse_event_stream(body: &str) -> Result<Option<ExternalReply>, QueryError> {
    let mut reply = Map::new();
    let mut answer = String::new();
    let mut saw_event = false;

    for line in body.lines() {
        let Some(data) = line.trim().strip_prefix("data:") else {
            continue;
        };
        let Ok(Value::Object(event)) = serde_json::from_str::<Value>(data.trim()) else {
            continue;
        };
        saw_event = true;

        for key in CARRIED_STREAM_FIELDS {
            if let Some(value) = event.get(key) {
                reply.entry(key).or_insert_with(|| value.clone());
            }
        }

        match event.get("event").and_then(Value::as_str) {
            Some("message") | Some("agent_message") => {
                if let Some(fragment) = event.get("answer").and_then(Value::as_str) {
                    answer.push_str(fragment);
                }
            }
            Some("message_end") => {
                if let Some(metadata) = event.get("metadata") {
                    reply.insert("metadata".into(), metadata.clone());
                }
            }
            Some("error") => {
                let status = event
                    .get("status")
                    .and_then(Value::as_u64)
                    .and_then(|status| u16::try_from(status).ok())
                    .unwrap_or(500);
                let message = event
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("stream error")
                    .to_string();
                return Err(QueryError::RemoteError {
                    status,
                    body: message,
                });
            }
            _ => {}
        }
    }

    if !saw_event {
        return Ok(None);
    }

    reply.insert("answer".into(), Value::String(answer));
    Ok(Some(ExternalReply::new(Value::Object(reply))))
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{request_body, FakeHttpServer};
    use serde_json::json;

    fn client(endpoint: &str) -> DifyClient {
        DifyClient::new(&DifyConfig {
            api_key: "app-secret".into(),
            endpoint: endpoint.to_string(),
            user: "user".into(),
        })
    }

    #[tokio::test]
    async fn posts_single_turn_body_with_bearer_token() {
        let server = FakeHttpServer::json(200, r#"{"answer":"晴れです","conversation_id":"c-1"}"#);

        let reply = client(&format!("{}/v1/", server.url))
            .query("今日の天気は？")
            .await
            .expect("query succeeds");
        let request = server.request();

        assert_eq!(reply.get("answer"), Some(&json!("晴れです")));
        assert!(request.starts_with("POST /v1/chat-messages "));
        assert!(request
            .to_ascii_lowercase()
            .contains("authorization: bearer app-secret"));
        let body: Value = serde_json::from_str(request_body(&request)).expect("json body");
        assert_eq!(
            body,
            json!({
                "inputs": {},
                "query": "今日の天気は？",
                "response_mode": "streaming",
                "conversation_id": "",
                "user": "user"
            })
        );
    }

    #[tokio::test]
    async fn non_success_status_is_remote_error() {
        let server = FakeHttpServer::json(401, r#"{"code":"unauthorized"}"#);

        let err = client(&server.url)
            .query("hello")
            .await
            .expect_err("401 must fail");
        server.request();

        match err {
            QueryError::RemoteError { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("unauthorized"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_200_success_status_is_remote_error() {
        let server = FakeHttpServer::json(201, r#"{"answer":"created"}"#);

        let err = client(&server.url)
            .query("hello")
            .await
            .expect_err("only 200 counts as success");
        server.request();

        assert!(matches!(err, QueryError::RemoteError { status: 201, .. }));
    }

    #[tokio::test]
    async fn connection_failure_is_transport_error() {
        let err = client("http://127.0.0.1:1")
            .query("hello")
            .await
            .expect_err("connection refused must fail");

        assert!(matches!(err, QueryError::TransportError(_)));
    }

    #[tokio::test]
    async fn event_stream_reply_is_collapsed() {
        let stream = concat!(
            "data: {\"event\": \"message\", \"task_id\": \"t-1\", \"message_id\": \"m-1\", \"conversation_id\": \"c-1\", \"answer\": \"こんにちは\"}\n\n",
            "data: {\"event\": \"message\", \"task_id\": \"t-1\", \"message_id\": \"m-1\", \"conversation_id\": \"c-1\", \"answer\": \"、元気です\"}\n\n",
            "data: {\"event\": \"message_end\", \"task_id\": \"t-1\", \"message_id\": \"m-1\", \"conversation_id\": \"c-1\", \"metadata\": {\"usage\": {\"total_tokens\": 7}}}\n\n",
        );
        let server = FakeHttpServer::respond(200, "text/event-stream", stream);

        let reply = client(&server.url)
            .query("こんにちは")
            .await
            .expect("stream parses");
        server.request();

        assert_eq!(reply.get("answer"), Some(&json!("こんにちは、元気です")));
        assert_eq!(reply.get("conversation_id"), Some(&json!("c-1")));
        assert_eq!(reply.get("message_id"), Some(&json!("m-1")));
        assert_eq!(
            reply.get("metadata"),
            Some(&json!({"usage": {"total_tokens": 7}}))
        );
    }

    #[test]
    fn stream_error_event_is_remote_error() {
        let stream = "data: {\"event\": \"error\", \"status\": 400, \"code\": \"invalid_param\", \"message\": \"bad query\"}\n\n";
        let err = parse_reply(stream).expect_err("error event must fail");
        assert!(
            matches!(err, QueryError::RemoteError { status: 400, ref body } if body == "bad query")
        );
    }

    #[test]
    fn unparseable_body_is_malformed() {
        let err = parse_reply("<html>gateway</html>").expect_err("html is not a reply");
        assert!(matches!(err, QueryError::MalformedReply(_)));
    }

    #[test]
    fn preview_truncates_long_text() {
        let text = "あ".repeat(60);
        let shown = preview(&text);
        assert_eq!(shown.chars().count(), PREVIEW_CHARS + 3);
        assert!(shown.ends_with("..."));
        assert_eq!(preview("short"), "short");
    }
}
