//! Capability stubs shared by the unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use newsdesk_core::{
    CapabilityError, NewsSearch, Prompt, SearchHit, SearchRequest, TextGenerator,
};

type Reply = Box<dyn Fn(&Prompt) -> Result<String, CapabilityError> + Send + Sync>;

pub(crate) struct ScriptedLlm {
    reply: Reply,
}

impl ScriptedLlm {
    pub(crate) fn with(
        reply: impl Fn(&Prompt) -> Result<String, CapabilityError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            reply: Box::new(reply),
        })
    }

    pub(crate) fn replying(text: &str) -> Arc<Self> {
        let text = text.to_string();
        Self::with(move |_| Ok(text.clone()))
    }

    pub(crate) fn failing() -> Arc<Self> {
        Self::with(|_| Err(CapabilityError::Request("connection reset".into())))
    }
}

#[async_trait]
impl TextGenerator for ScriptedLlm {
    async fn generate(&self, prompt: &Prompt) -> Result<String, CapabilityError> {
        (self.reply)(prompt)
    }
}

enum Hits {
    Generated(usize),
    Urls(Vec<String>),
}

pub(crate) struct StaticSearch {
    hits: Hits,
    seen: Mutex<Vec<String>>,
}

impl StaticSearch {
    /// `count` generated hits per query, dated 2024-02-01.
    pub(crate) fn with_hits(count: usize) -> Arc<Self> {
        Arc::new(Self {
            hits: Hits::Generated(count),
            seen: Mutex::new(Vec::new()),
        })
    }

    /// The same undated hits for every query.
    pub(crate) fn with_urls(urls: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            hits: Hits::Urls(urls.iter().map(|url| url.to_string()).collect()),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn queries(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl NewsSearch for StaticSearch {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, CapabilityError> {
        self.seen.lock().unwrap().push(request.query.clone());
        let hits = match &self.hits {
            Hits::Generated(count) => (0..*count)
                .map(|i| SearchHit {
                    title: format!("{} story {i}", request.query),
                    url: format!("https://example.org/{}/{i}", request.query),
                    snippet: format!("Coverage of {}.", request.query),
                    published_date: Some("2024-02-01".into()),
                })
                .collect::<Vec<_>>(),
            Hits::Urls(urls) => urls
                .iter()
                .map(|url| SearchHit {
                    title: format!("Story at {url}"),
                    url: url.clone(),
                    snippet: format!("snippet for {url}"),
                    published_date: None,
                })
                .collect(),
        };
        Ok(hits.into_iter().take(request.max_results).collect())
    }
}
