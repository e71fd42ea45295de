//! Tavily web search client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capability::{NewsSearch, SearchHit, SearchRequest};
use crate::error::CapabilityError;
use crate::security::SecretValue;

pub struct TavilyClient {
    client: Client,
    base_url: String,
    api_key: SecretValue,
}

#[derive(Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    max_results: usize,
    include_domains: &'a [String],
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    published_date: Option<String>,
}

impl TavilyClient {
    pub fn new(base_url: impl Into<String>, api_key: SecretValue) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl NewsSearch for TavilyClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, CapabilityError> {
        let url = format!("{}/search", self.base_url);
        let body = TavilyRequest {
            api_key: self.api_key.expose(),
            query: &request.query,
            search_depth: "advanced",
            max_results: request.max_results,
            include_domains: &request.include_domains,
        };

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CapabilityError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TavilyResponse = response.json().await?;
        let hits: Vec<SearchHit> = parsed
            .results
            .into_iter()
            .filter(|result| !result.url.is_empty())
            .take(request.max_results)
            .map(|result| SearchHit {
                title: result.title,
                url: result.url,
                snippet: result.content,
                published_date: result.published_date,
            })
            .collect();

        debug!(query = %request.query, hits = hits.len(), "tavily search completed");
        Ok(hits)
    }
}
