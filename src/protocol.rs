use serde::{Deserialize, Serialize};
use std::fmt;

pub const ALLOWED_MODEL_NAMES: &[&str] = &[
    "llama3-70b-8192",
    "mixtral-8x7b-32768",
    "llama-3.3-70b-versatile",
    "gpt-4o-mini",
];

pub const INVALID_MODEL_MESSAGE: &str = "Invalid model name. Kindly select a valid AI model";

pub fn is_allowed_model(name: &str) -> bool {
    ALLOWED_MODEL_NAMES.contains(&name)
}

/// Any role string decodes; roles outside the known three are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
    System,
    Other(String),
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "system" => Role::System,
            _ => Role::Other(value),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::User => "user".to_string(),
            Role::Assistant => "assistant".to_string(),
            Role::System => "system".to_string(),
            Role::Other(value) => value,
        }
    }
}

/// Turn content as the client may hold it: plain text, or a structured
/// payload carrying the text under `response`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Wrapped { response: String },
}

impl MessageContent {
    pub fn as_text(&self) -> &str {
        match self {
            MessageContent::Text(text) => text,
            MessageContent::Wrapped { response } => response,
        }
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

/// A turn on the wire. `content` is always plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model_name: String,
    pub model_provider: String,
    pub system_prompt: String,
    pub messages: Vec<Message>,
    pub allow_search: bool,
}

/// Either shape is sent with a success status; the key present decides which.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatResponse {
    Error { error: String },
    Success { response: MessageContent },
}

impl ChatResponse {
    pub fn success(text: impl Into<String>) -> Self {
        ChatResponse::Success {
            response: MessageContent::Text(text.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ChatResponse::Error {
            error: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Groq,
    OpenAi,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Groq, Provider::OpenAi];

    pub fn name(self) -> &'static str {
        match self {
            Provider::Groq => "Groq",
            Provider::OpenAi => "OpenAI",
        }
    }

    pub fn models(self) -> &'static [&'static str] {
        match self {
            Provider::Groq => &["llama-3.3-70b-versatile", "mixtral-8x7b-32768"],
            Provider::OpenAi => &["gpt-4o-mini"],
        }
    }

    pub fn default_model(self) -> &'static str {
        self.models()[0]
    }

    pub fn parse(value: &str) -> Option<Self> {
        Provider::ALL
            .into_iter()
            .find(|provider| provider.name().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_decodes_plain_and_wrapped() {
        let plain: MessageContent = serde_json::from_value(json!("Hi")).unwrap();
        assert_eq!(plain, MessageContent::Text("Hi".to_string()));

        let wrapped: MessageContent =
            serde_json::from_value(json!({"response": "Hello"})).unwrap();
        assert_eq!(wrapped.as_text(), "Hello");
    }

    #[test]
    fn response_shape_is_chosen_by_key() {
        let ok: ChatResponse = serde_json::from_value(json!({"response": "done"})).unwrap();
        assert_eq!(ok, ChatResponse::success("done"));

        let nested: ChatResponse =
            serde_json::from_value(json!({"response": {"response": "done"}})).unwrap();
        match nested {
            ChatResponse::Success { response } => assert_eq!(response.as_text(), "done"),
            other => panic!("expected success, got {:?}", other),
        }

        let err: ChatResponse = serde_json::from_value(json!({"error": "nope"})).unwrap();
        assert_eq!(err, ChatResponse::error("nope"));
    }

    #[test]
    fn success_serializes_as_plain_string() {
        let value = serde_json::to_value(ChatResponse::success("answer")).unwrap();
        assert_eq!(value, json!({"response": "answer"}));
        let value = serde_json::to_value(ChatResponse::error(INVALID_MODEL_MESSAGE)).unwrap();
        assert_eq!(value, json!({"error": INVALID_MODEL_MESSAGE}));
    }

    #[test]
    fn request_keeps_unknown_roles() {
        let body = json!({
            "model_name": "gpt-4o-mini",
            "model_provider": "OpenAI",
            "system_prompt": "",
            "messages": [
                {"role": "tool", "content": "x"},
                {"role": "User", "content": "y"},
                {"role": "user", "content": "Hi"}
            ],
            "allow_search": false
        });
        let request: ChatRequest = serde_json::from_value(body.clone()).unwrap();

        assert_eq!(request.messages[0].role, Role::Other("tool".to_string()));
        assert_eq!(request.messages[1].role, Role::Other("User".to_string()));
        assert_eq!(request.messages[2].role, Role::User);
        assert_eq!(serde_json::to_value(&request).unwrap(), body);
    }

    #[test]
    fn provider_models_are_allowed() {
        for provider in Provider::ALL {
            for model in provider.models() {
                assert!(is_allowed_model(model), "{} not allowed", model);
            }
        }
        assert!(!is_allowed_model("unknown-model"));
    }

    #[test]
    fn provider_parse_ignores_case() {
        assert_eq!(Provider::parse("groq"), Some(Provider::Groq));
        assert_eq!(Provider::parse(" OpenAI "), Some(Provider::OpenAi));
        assert_eq!(Provider::parse("anthropic"), None);
    }
}
