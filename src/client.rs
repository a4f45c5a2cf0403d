use crate::protocol::{ChatRequest, ChatResponse};
use reqwest::{Client as HttpClient, StatusCode};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub retries: u32,
}

#[derive(Clone)]
pub struct RelayClient {
    base_url: String,
    retries: u32,
    http: HttpClient,
}

impl RelayClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = HttpClient::builder().timeout(config.timeout).build()?;

        Ok(Self {
            base_url: normalize_base_url(&config.base_url),
            retries: config.retries,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends one request and waits for the reply. Only connection failures and
    /// timeouts are retried; any HTTP status other than 200 is final.
    pub async fn submit(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        let url = format!("{}/chat", self.base_url);
        let mut attempt = 0;

        let response = loop {
            match self.http.post(&url).json(request).send().await {
                Ok(response) => break response,
                Err(err) if attempt < self.retries && (err.is_connect() || err.is_timeout()) => {
                    attempt += 1;
                    log::warn!("chat request failed ({}), retry {}/{}", err, attempt, self.retries);
                }
                Err(err) => return Err(err.into()),
            }
        };

        if response.status() != StatusCode::OK {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

fn normalize_base_url(value: &str) -> String {
    let value = value.trim_end_matches('/');
    value.strip_suffix("/chat").unwrap_or(value).to_string()
}
