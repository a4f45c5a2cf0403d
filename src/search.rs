use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::error::Error;

pub const DEFAULT_TAVILY_BASE_URL: &str = "https://api.tavily.com";

const MAX_RESULTS: u32 = 2;

type SearchResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct SearchHit {
    pub(crate) title: String,
    pub(crate) url: String,
    #[serde(default)]
    pub(crate) content: String,
}

pub(crate) struct WebSearch {
    client: Client,
    base_url: String,
    api_key: String,
}

impl WebSearch {
    pub(crate) fn new(client: Client, base_url: &str, api_key: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub(crate) async fn search(&self, query: &str) -> SearchResult<Vec<SearchHit>> {
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&SearchRequest {
                query,
                max_results: MAX_RESULTS,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Search error: {} - {}", status, body).into());
        }

        let body: SearchResponse = response.json().await?;
        Ok(body.results)
    }
}

pub(crate) fn format_hits(hits: &[SearchHit]) -> String {
    let mut out = String::from("Web search results:");
    for (idx, hit) in hits.iter().enumerate() {
        out.push_str(&format!(
            "\n[{}] {} ({})\n{}",
            idx + 1,
            hit.title,
            hit.url,
            hit.content.trim()
        ));
    }
    out
}
