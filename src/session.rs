use crate::protocol::{ChatRequest, ChatResponse, Message, MessageContent, Provider, Role};
use uuid::Uuid;

const RESPONSE_RULES: &str = "Explain the topic in a clear, human-friendly way.
Rules:
- Do NOT start with Yes or No
- Do NOT give one-word answers
- Start directly with the explanation
- Use bullet points
- Keep it simple and natural";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: MessageContent,
}

impl From<Message> for Turn {
    fn from(message: Message) -> Self {
        Self {
            role: message.role,
            content: MessageContent::Text(message.content),
        }
    }
}

/// Outcome of feeding a response envelope back into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Reply(String),
    Rejected(String),
}

/// State for one interactive conversation. Nothing here is shared between
/// sessions.
#[derive(Debug)]
pub struct Session {
    id: String,
    history: Vec<Turn>,
    provider: Provider,
    model: String,
    act_as: String,
    allow_search: bool,
}

impl Session {
    pub fn new(provider: Provider) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            history: Vec::new(),
            provider,
            model: provider.default_model().to_string(),
            act_as: String::new(),
            allow_search: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn act_as(&self) -> &str {
        &self.act_as
    }

    pub fn allow_search(&self) -> bool {
        self.allow_search
    }

    /// Switching provider resets the model to that provider's first entry.
    pub fn set_provider(&mut self, provider: Provider) {
        self.provider = provider;
        self.model = provider.default_model().to_string();
    }

    pub fn set_model(&mut self, model: &str) -> Result<(), String> {
        let models = self.provider.models();
        if !models.contains(&model) {
            return Err(format!(
                "{} does not offer {}; choose one of: {}",
                self.provider,
                model,
                models.join(", ")
            ));
        }
        self.model = model.to_string();
        Ok(())
    }

    pub fn set_act_as(&mut self, act_as: impl Into<String>) {
        self.act_as = act_as.into();
    }

    pub fn set_allow_search(&mut self, allow_search: bool) {
        self.allow_search = allow_search;
    }

    pub fn append_user_turn(&mut self, text: impl Into<String>) {
        self.history.push(Turn {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        });
    }

    pub fn build_request(&self) -> ChatRequest {
        ChatRequest {
            model_name: self.model.clone(),
            model_provider: self.provider.name().to_string(),
            system_prompt: system_prompt(&self.act_as),
            messages: sanitize(&self.history),
            allow_search: self.allow_search,
        }
    }

    /// An error envelope never touches the history.
    pub fn apply_response(&mut self, response: ChatResponse) -> Applied {
        match response {
            ChatResponse::Error { error } => Applied::Rejected(error),
            ChatResponse::Success { response } => {
                let text = response.as_text().to_string();
                self.history.push(Turn {
                    role: Role::Assistant,
                    content: response,
                });
                Applied::Reply(text)
            }
        }
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

pub fn sanitize(history: &[Turn]) -> Vec<Message> {
    history
        .iter()
        .map(|turn| Message {
            role: turn.role.clone(),
            content: turn.content.as_text().to_string(),
        })
        .collect()
}

pub fn system_prompt(act_as: &str) -> String {
    format!("{}\n\n{}", act_as.trim(), RESPONSE_RULES)
}
