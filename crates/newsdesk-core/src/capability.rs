//! Injected external collaborators and their null object.
//!
//! Every capability is optional. Which implementation an agent talks to is
//! decided once when [`Capabilities`] is assembled; callers never test for
//! availability by provoking errors.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CapabilityError;

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);
pub const PREVIEW_LIMIT: usize = 1000;

/// A two-part prompt for a chat-style language model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub max_results: usize,
    pub include_domains: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub published_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedPage {
    pub title: String,
    pub content: String,
    pub publish_date: Option<String>,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &Prompt) -> Result<String, CapabilityError>;

    fn is_available(&self) -> bool {
        true
    }
}

#[async_trait]
pub trait NewsSearch: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, CapabilityError>;

    fn is_available(&self) -> bool {
        true
    }
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, CapabilityError>;

    fn is_available(&self) -> bool {
        true
    }
}

/// Null object standing in for any capability that is not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

#[async_trait]
impl TextGenerator for Unavailable {
    async fn generate(&self, _prompt: &Prompt) -> Result<String, CapabilityError> {
        Err(CapabilityError::Unavailable)
    }

    fn is_available(&self) -> bool {
        false
    }
}

#[async_trait]
impl NewsSearch for Unavailable {
    async fn search(&self, _request: &SearchRequest) -> Result<Vec<SearchHit>, CapabilityError> {
        Err(CapabilityError::Unavailable)
    }

    fn is_available(&self) -> bool {
        false
    }
}

#[async_trait]
impl PageFetcher for Unavailable {
    async fn fetch(&self, _url: &str) -> Result<FetchedPage, CapabilityError> {
        Err(CapabilityError::Unavailable)
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// The set of capabilities handed to every agent, with the per-call timeout
/// applied at this boundary.
#[derive(Clone)]
pub struct Capabilities {
    llm: Arc<dyn TextGenerator>,
    search: Arc<dyn NewsSearch>,
    fetcher: Arc<dyn PageFetcher>,
    call_timeout: Duration,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::offline()
    }
}

impl Capabilities {
    /// Every capability unavailable; agents run purely on fallbacks.
    pub fn offline() -> Self {
        Self {
            llm: Arc::new(Unavailable),
            search: Arc::new(Unavailable),
            fetcher: Arc::new(Unavailable),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn TextGenerator>) -> Self {
        self.llm = llm;
        self
    }

    pub fn with_search(mut self, search: Arc<dyn NewsSearch>) -> Self {
        self.search = search;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    pub fn llm_available(&self) -> bool {
        self.llm.is_available()
    }

    pub fn search_available(&self) -> bool {
        self.search.is_available()
    }

    pub fn fetcher_available(&self) -> bool {
        self.fetcher.is_available()
    }

    pub async fn generate(&self, prompt: &Prompt) -> Result<String, CapabilityError> {
        self.bounded("generate", self.llm.generate(prompt)).await
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, CapabilityError> {
        self.bounded("search", self.search.search(request)).await
    }

    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, CapabilityError> {
        self.bounded("fetch", self.fetcher.fetch(url)).await
    }

    async fn bounded<T, F>(&self, call: &'static str, future: F) -> Result<T, CapabilityError>
    where
        F: Future<Output = Result<T, CapabilityError>>,
    {
        match tokio::time::timeout(self.call_timeout, future).await {
            Ok(result) => result,
            Err(_) => {
                debug!(call, timeout = ?self.call_timeout, "capability call timed out");
                Err(CapabilityError::Timeout(self.call_timeout))
            }
        }
    }
}

/// Cut `text` to at most `limit` characters, marking the cut with `...`.
pub fn truncate_preview(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Slow;

    #[async_trait]
    impl TextGenerator for Slow {
        async fn generate(&self, _prompt: &Prompt) -> Result<String, CapabilityError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("late".into())
        }
    }

    #[tokio::test]
    async fn offline_capabilities_report_unavailable() {
        let caps = Capabilities::offline();
        assert!(!caps.llm_available());
        assert!(!caps.search_available());
        assert!(!caps.fetcher_available());

        let err = caps.generate(&Prompt::new("s", "u")).await.unwrap_err();
        assert!(err.is_unavailable());
        let err = caps.fetch("https://example.com").await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_calls_time_out() {
        let caps = Capabilities::offline()
            .with_llm(Arc::new(Slow))
            .with_call_timeout(Duration::from_millis(50));
        let err = caps.generate(&Prompt::new("s", "u")).await.unwrap_err();
        assert!(matches!(err, CapabilityError::Timeout(_)));
    }

    #[test]
    fn preview_truncation() {
        assert_eq!(truncate_preview("short", 10), "short");
        assert_eq!(truncate_preview("exactly", 7), "exactly");
        assert_eq!(truncate_preview("abcdefgh", 3), "abc...");
        assert_eq!(truncate_preview("héllo wörld", 4), "héll...");
    }
}
