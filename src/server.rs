use crate::agent::{Agent, AgentConfig, AgentRequest, Endpoint, ProviderAgent};
use crate::protocol::{
    is_allowed_model, ChatRequest, ChatResponse, Message, Role, INVALID_MODEL_MESSAGE,
};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::error::Error;
use std::sync::Arc;

pub struct ServerConfig {
    pub listen: String,
    pub groq_base_url: String,
    pub openai_base_url: String,
    pub tavily_base_url: String,
}

struct ServerState {
    agent: Arc<dyn Agent>,
}

type ServerResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

pub async fn run(config: ServerConfig) -> ServerResult<()> {
    let agent = ProviderAgent::new(AgentConfig {
        groq: Endpoint {
            base_url: config.groq_base_url,
            api_key: std::env::var("GROQ_API_KEY").ok(),
        },
        openai: Endpoint {
            base_url: config.openai_base_url,
            api_key: std::env::var("OPENAI_API_KEY").ok(),
        },
        tavily_base_url: config.tavily_base_url,
        tavily_api_key: std::env::var("TAVILY_API_KEY").ok(),
    });

    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    log::info!("relay server listening on http://{}", config.listen);
    axum::serve(listener, router(Arc::new(agent))).await?;

    Ok(())
}

pub fn router(agent: Arc<dyn Agent>) -> Router {
    let state = Arc::new(ServerState { agent });

    Router::new()
        .route("/chat", post(chat))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn chat(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    if !is_allowed_model(&payload.model_name) {
        log::info!("rejected chat request for model {:?}", payload.model_name);
        return Ok(Json(ChatResponse::error(INVALID_MODEL_MESSAGE)));
    }

    let query = extract_user_query(&payload.messages);
    log::info!(
        "chat request: model={} provider={} messages={} user_turns={} search={}",
        payload.model_name,
        payload.model_provider,
        payload.messages.len(),
        query.len(),
        payload.allow_search
    );

    let request = AgentRequest {
        model: payload.model_name,
        provider: payload.model_provider,
        query,
        allow_search: payload.allow_search,
        system_prompt: payload.system_prompt,
    };

    match state.agent.respond(request).await {
        Ok(text) => Ok(Json(ChatResponse::success(text))),
        Err(err) => {
            log::error!("agent failed: {}", err);
            Err((StatusCode::BAD_GATEWAY, err.to_string()))
        }
    }
}

pub fn extract_user_query(messages: &[Message]) -> Vec<String> {
    messages
        .iter()
        .filter(|message| message.role == Role::User)
        .map(|message| message.content.clone())
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::agent::{AgentFuture, AgentResult};
    use serde_json::{json, Value};
    use std::net::SocketAddr;
    use std::sync::Mutex;

    /// Records every request and answers with a canned result.
    pub(crate) struct StubAgent {
        calls: Mutex<Vec<AgentRequest>>,
        reply: Result<String, String>,
    }

    impl StubAgent {
        pub(crate) fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                reply: Ok(text.to_string()),
            })
        }

        pub(crate) fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                reply: Err(message.to_string()),
            })
        }

        pub(crate) fn calls(&self) -> Vec<AgentRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Agent for StubAgent {
        fn respond(&self, request: AgentRequest) -> AgentFuture<'_> {
            self.calls.lock().unwrap().push(request);
            let reply: AgentResult<String> = self.reply.clone().map_err(Into::into);
            Box::pin(async move { reply })
        }
    }

    pub(crate) async fn spawn(agent: Arc<StubAgent>) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(agent)).await.unwrap();
        });
        addr
    }

    async fn post_chat(addr: SocketAddr, body: Value) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("http://{}/chat", addr))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    fn message(role: Role, content: &str) -> Message {
        Message {
            role,
            content: content.to_string(),
        }
    }

    #[test]
    fn extract_keeps_user_turns_in_order() {
        let messages = vec![
            message(Role::User, "first"),
            message(Role::Assistant, "reply"),
            message(Role::System, "context"),
            message(Role::Other("tool".to_string()), "result"),
            message(Role::User, "second"),
            message(Role::User, ""),
        ];

        assert_eq!(extract_user_query(&messages), vec!["first", "second", ""]);
        assert!(extract_user_query(&[]).is_empty());
        assert!(extract_user_query(&[message(Role::Assistant, "x")]).is_empty());
    }

    #[tokio::test]
    async fn allowed_model_dispatches_user_query() {
        let agent = StubAgent::replying("Hello there");
        let addr = spawn(agent.clone()).await;

        let response = post_chat(
            addr,
            json!({
                "model_name": "gpt-4o-mini",
                "model_provider": "OpenAI",
                "system_prompt": "AI Tutor",
                "messages": [{"role": "user", "content": "Hi"}],
                "allow_search": false
            }),
        )
        .await;

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({"response": "Hello there"}));
        assert_eq!(
            agent.calls(),
            vec![AgentRequest {
                model: "gpt-4o-mini".to_string(),
                provider: "OpenAI".to_string(),
                query: vec!["Hi".to_string()],
                allow_search: false,
                system_prompt: "AI Tutor".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn unknown_model_is_rejected_without_dispatch() {
        let agent = StubAgent::replying("unused");
        let addr = spawn(agent.clone()).await;

        for model in ["unknown-model", "", "GPT-4O-MINI"] {
            let response = post_chat(
                addr,
                json!({
                    "model_name": model,
                    "model_provider": "OpenAI",
                    "system_prompt": "",
                    "messages": [{"role": "user", "content": "Hi"}],
                    "allow_search": true
                }),
            )
            .await;

            assert_eq!(response.status(), reqwest::StatusCode::OK);
            let body: Value = response.json().await.unwrap();
            assert_eq!(
                body,
                json!({"error": "Invalid model name. Kindly select a valid AI model"})
            );
        }

        assert!(agent.calls().is_empty());
    }

    #[tokio::test]
    async fn assistant_turns_are_not_part_of_query() {
        let agent = StubAgent::replying("ok");
        let addr = spawn(agent.clone()).await;

        post_chat(
            addr,
            json!({
                "model_name": "llama-3.3-70b-versatile",
                "model_provider": "Groq",
                "system_prompt": "",
                "messages": [
                    {"role": "assistant", "content": "Hello"},
                    {"role": "user", "content": "Hi"}
                ],
                "allow_search": true
            }),
        )
        .await;

        let calls = agent.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].query, vec!["Hi"]);
        assert!(calls[0].allow_search);
    }

    #[tokio::test]
    async fn unknown_roles_decode_and_are_dropped() {
        let agent = StubAgent::replying("ok");
        let addr = spawn(agent.clone()).await;
        let messages = json!([
            {"role": "tool", "content": "x"},
            {"role": "user", "content": "Hi"}
        ]);

        let response = post_chat(
            addr,
            json!({
                "model_name": "gpt-4o-mini",
                "model_provider": "OpenAI",
                "system_prompt": "",
                "messages": messages,
                "allow_search": false
            }),
        )
        .await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(agent.calls()[0].query, vec!["Hi"]);

        let response = post_chat(
            addr,
            json!({
                "model_name": "unknown-model",
                "model_provider": "OpenAI",
                "system_prompt": "",
                "messages": messages,
                "allow_search": false
            }),
        )
        .await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({"error": INVALID_MODEL_MESSAGE}));
        assert_eq!(agent.calls().len(), 1);
    }

    #[tokio::test]
    async fn agent_failure_is_bad_gateway() {
        let agent = StubAgent::failing("provider timed out");
        let addr = spawn(agent.clone()).await;

        let response = post_chat(
            addr,
            json!({
                "model_name": "gpt-4o-mini",
                "model_provider": "OpenAI",
                "system_prompt": "",
                "messages": [{"role": "user", "content": "Hi"}],
                "allow_search": false
            }),
        )
        .await;

        assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);
        assert_eq!(response.text().await.unwrap(), "provider timed out");
        assert_eq!(agent.calls().len(), 1);
    }

    #[tokio::test]
    async fn non_string_content_fails_decoding() {
        let agent = StubAgent::replying("unused");
        let addr = spawn(agent.clone()).await;

        let response = post_chat(
            addr,
            json!({
                "model_name": "gpt-4o-mini",
                "model_provider": "OpenAI",
                "system_prompt": "",
                "messages": [{"role": "assistant", "content": {"response": "Hello"}}],
                "allow_search": false
            }),
        )
        .await;

        assert!(response.status().is_client_error());
        assert!(agent.calls().is_empty());
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let addr = spawn(StubAgent::replying("unused")).await;
        let response = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "ok");
    }
}
