use serde_json::Value;

use crate::query::ExternalReply;

/// Content fields in precedence order. The first key present wins.
const CONTENT_FIELDS: [&str; 3] = ["answer", "response", "message"];

/// Pulls one human-readable string out of an external reply. Strings are
/// returned verbatim, other values and field-less replies are rendered as
/// compact JSON.
pub fn extract_content(reply: &ExternalReply) -> String {
    CONTENT_FIELDS
        .iter()
        .find_map(|field| reply.get(field))
        .map(render)
        .unwrap_or_else(|| render(reply.as_value()))
}

fn render(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reply(value: Value) -> ExternalReply {
        ExternalReply::new(value)
    }

    #[test]
    fn answer_wins_over_response_and_message() {
        let content = extract_content(&reply(json!({
            "message": "m",
            "response": "r",
            "answer": "a"
        })));
        assert_eq!(content, "a");
    }

    #[test]
    fn response_wins_over_message() {
        let content = extract_content(&reply(json!({"message": "m", "response": "r"})));
        assert_eq!(content, "r");
    }

    #[test]
    fn falls_back_to_message() {
        assert_eq!(extract_content(&reply(json!({"message": "m"}))), "m");
    }

    #[test]
    fn present_key_wins_even_when_not_a_string() {
        let content = extract_content(&reply(json!({"answer": {"text": "x"}, "response": "r"})));
        assert_eq!(content, r#"{"text":"x"}"#);
    }

    #[test]
    fn renders_whole_payload_without_content_fields() {
        let content = extract_content(&reply(json!({"id": 7})));
        assert_eq!(content, r#"{"id":7}"#);

        assert_eq!(extract_content(&reply(json!("plain"))), "plain");
        assert_eq!(extract_content(&reply(json!([1, 2]))), "[1,2]");
    }
}
