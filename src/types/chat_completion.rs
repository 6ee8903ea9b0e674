use serde::{Deserialize, Serialize};

/// Role of a message on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System role.
    System,

    /// User role.
    User,

    /// Assistant role.
    Assistant,

    /// Any role this client does not know about.
    #[serde(other)]
    Other,
}

/// One message of a chat completion request or response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who authored the message.
    pub role: Role,

    /// Message text.  Some servers send `null` for empty content.
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatMessage {
    /// A user message with the given text.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
        }
    }
}

/// Body of `POST /v1/chat/completions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Model identifier.
    pub model: String,

    /// Conversation sent to the model.
    pub messages: Vec<ChatMessage>,

    /// Whether the response should be an SSE stream.
    pub stream: bool,
}

impl ChatCompletionRequest {
    /// A single-turn request carrying one user message.
    pub fn single_turn(model: impl Into<String>, user_text: impl Into<String>, stream: bool) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::user(user_text)],
            stream,
        }
    }
}

/// A complete, non-streaming chat completion response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    /// Candidate completions; only the first is used.
    pub choices: Vec<ResponseChoice>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if there is one with content.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }
}

/// One choice of a non-streaming response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseChoice {
    /// The generated message.
    pub message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn test_request_serialization() {
        let request = ChatCompletionRequest::single_turn("jan-nano", "hello", true);
        assert_eq!(
            to_value(&request).unwrap(),
            json!({
                "model": "jan-nano",
                "messages": [{"role": "user", "content": "hello"}],
                "stream": true
            })
        );
    }

    #[test]
    fn test_response_deserialization() {
        let response: ChatCompletionResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "ok"}}]
        }))
        .unwrap();
        assert_eq!(response.first_content(), Some("ok"));
        assert_eq!(response.choices[0].message.role, Role::Assistant);
    }

    #[test]
    fn null_content_and_unknown_roles_decode() {
        let response: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "tool", "content": null}}]
        }))
        .unwrap();
        assert_eq!(response.first_content(), None);
        assert_eq!(response.choices[0].message.role, Role::Other);
    }

    #[test]
    fn missing_choices_is_an_error() {
        let result = serde_json::from_value::<ChatCompletionResponse>(json!({"object": "x"}));
        assert!(result.is_err());
    }
}
