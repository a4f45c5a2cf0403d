use crate::ai_sdk::{first_choice_text, ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use crate::protocol::Provider;
use crate::search::{format_hits, WebSearch};
use futures::future::BoxFuture;
use reqwest::Client;
use std::error::Error;

pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

pub type AgentResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

pub type AgentFuture<'a> = BoxFuture<'a, AgentResult<String>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRequest {
    pub model: String,
    pub provider: String,
    pub query: Vec<String>,
    pub allow_search: bool,
    pub system_prompt: String,
}

/// Produces one reply for one request. Implementations own all provider and
/// tool interaction.
pub trait Agent: Send + Sync {
    fn respond(&self, request: AgentRequest) -> AgentFuture<'_>;
}

pub struct Endpoint {
    pub base_url: String,
    pub api_key: Option<String>,
}

pub struct AgentConfig {
    pub groq: Endpoint,
    pub openai: Endpoint,
    pub tavily_base_url: String,
    pub tavily_api_key: Option<String>,
}

pub struct ProviderAgent {
    client: Client,
    groq: Endpoint,
    openai: Endpoint,
    search: Option<WebSearch>,
}

impl ProviderAgent {
    pub fn new(config: AgentConfig) -> Self {
        let client = Client::new();
        let search = config
            .tavily_api_key
            .map(|key| WebSearch::new(client.clone(), &config.tavily_base_url, key));
        Self {
            client,
            groq: config.groq,
            openai: config.openai,
            search,
        }
    }

    fn endpoint(&self, provider: &str) -> AgentResult<(&str, &str)> {
        let provider =
            Provider::parse(provider).ok_or_else(|| format!("Unsupported provider: {}", provider))?;
        let endpoint = match provider {
            Provider::Groq => &self.groq,
            Provider::OpenAi => &self.openai,
        };
        let api_key = endpoint
            .api_key
            .as_deref()
            .ok_or_else(|| format!("No API key configured for {}", provider))?;
        Ok((endpoint.base_url.trim_end_matches('/'), api_key))
    }

    async fn build_messages(&self, request: &AgentRequest) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(request.system_prompt.clone())];

        if request.allow_search {
            match (&self.search, request.query.last()) {
                (Some(search), Some(latest)) => match search.search(latest).await {
                    Ok(hits) => {
                        log::debug!("web search returned {} results", hits.len());
                        if !hits.is_empty() {
                            messages.push(ChatMessage::system(format_hits(&hits)));
                        }
                    }
                    Err(err) => log::warn!("web search failed, answering without it: {}", err),
                },
                (None, _) => log::warn!("search requested but TAVILY_API_KEY is not set"),
                (Some(_), None) => {}
            }
        }

        messages.extend(request.query.iter().cloned().map(ChatMessage::user));
        messages
    }

    async fn run_inference(&self, request: AgentRequest) -> AgentResult<String> {
        let (base_url, api_key) = self.endpoint(&request.provider)?;
        let messages = self.build_messages(&request).await;

        let body = ChatCompletionRequest {
            model: request.model,
            messages,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(format!("API error: {} - {}", status, error_text).into());
        }

        let completion: ChatCompletionResponse = response.json().await?;
        log::debug!(
            "completion {} finished: {}",
            completion.id.as_deref().unwrap_or("-"),
            completion
                .choices
                .first()
                .and_then(|choice| choice.finish_reason.as_deref())
                .unwrap_or("-")
        );
        first_choice_text(&completion).ok_or_else(|| "API returned no message content".into())
    }
}

impl Agent for ProviderAgent {
    fn respond(&self, request: AgentRequest) -> AgentFuture<'_> {
        Box::pin(self.run_inference(request))
    }
}
