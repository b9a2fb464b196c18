//! Completion endpoint contract.
//!
//! The hosted completion function is a black box: it takes the coalesced
//! user messages for a session and answers with zero or more ordered text
//! replies, or an `error` field.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, RiyaError};

/// `messages` goes out as a bare string for a single message and as an
/// array for a coalesced batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompletionInput {
    Single(String),
    Batch(Vec<String>),
}

impl CompletionInput {
    pub fn from_texts(mut texts: Vec<String>) -> Self {
        if texts.len() == 1 {
            Self::Single(texts.remove(0))
        } else {
            Self::Batch(texts)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Batch(texts) => texts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Request body sent to the completion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub session_or_user_id: String,
    pub messages: CompletionInput,
    pub is_batch: bool,
    pub is_guest: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl CompletionRequest {
    pub fn new(session_or_user_id: impl Into<String>, texts: Vec<String>, is_guest: bool) -> Self {
        let messages = CompletionInput::from_texts(texts);
        Self {
            session_or_user_id: session_or_user_id.into(),
            is_batch: matches!(messages, CompletionInput::Batch(_)),
            messages,
            is_guest,
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }
}

/// Extracts the ordered reply texts from a completion response body.
///
/// - `{"messages": [{"text": ".."}, ..]}` → the texts, in order
/// - `{"error": ".."}` → `RiyaError::Backend`
/// - anything else (missing or non-array `messages`, entries without a
///   string `text`) → `RiyaError::MalformedResponse`
pub fn parse_completion_response(body: &Value) -> Result<Vec<String>> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        let message = error
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(RiyaError::backend(message));
    }

    let messages = body
        .get("messages")
        .ok_or_else(|| RiyaError::malformed("response has no `messages` field"))?
        .as_array()
        .ok_or_else(|| RiyaError::malformed("`messages` is not an array"))?;

    messages
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            entry
                .get("text")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| RiyaError::malformed(format!("messages[{index}] has no text")))
        })
        .collect()
}

/// The hosted completion endpoint.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Sends one coalesced batch and returns the replies in display order.
    async fn complete(&self, request: CompletionRequest) -> Result<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_message_serializes_as_string() {
        let request = CompletionRequest::new("guest-1", vec!["hi".into()], true);
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            json!({
                "sessionOrUserId": "guest-1",
                "messages": "hi",
                "isBatch": false,
                "isGuest": true
            })
        );
    }

    #[test]
    fn test_batch_serializes_as_array() {
        let request =
            CompletionRequest::new("u-7", vec!["a".into(), "b".into()], false)
                .with_system_prompt(Some("be kind".into()));
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["messages"], json!(["a", "b"]));
        assert_eq!(body["isBatch"], json!(true));
        assert_eq!(body["systemPrompt"], json!("be kind"));
        assert_eq!(request.messages.len(), 2);
    }

    #[test]
    fn test_parse_replies_in_order() {
        let body = json!({"messages": [{"text": "haha"}, {"text": "toh kya karna hai?"}]});
        assert_eq!(
            parse_completion_response(&body).unwrap(),
            vec!["haha", "toh kya karna hai?"]
        );
    }

    #[test]
    fn test_parse_empty_reply_list() {
        let body = json!({"messages": []});
        assert!(parse_completion_response(&body).unwrap().is_empty());
    }

    #[test]
    fn test_parse_error_payload() {
        let body = json!({"error": "rate limited"});
        let err = parse_completion_response(&body).unwrap_err();
        assert!(matches!(err, RiyaError::Backend(ref m) if m == "rate limited"));
    }

    #[test]
    fn test_parse_malformed_payloads() {
        for body in [
            json!({}),
            json!({"messages": "hello"}),
            json!({"messages": [{"content": "x"}]}),
            json!({"messages": [{"text": 5}]}),
        ] {
            let err = parse_completion_response(&body).unwrap_err();
            assert!(matches!(err, RiyaError::MalformedResponse(_)), "{body}");
        }
    }

    #[test]
    fn test_null_error_is_ignored() {
        let body = json!({"error": null, "messages": [{"text": "ok"}]});
        assert_eq!(parse_completion_response(&body).unwrap(), vec!["ok"]);
    }
}
