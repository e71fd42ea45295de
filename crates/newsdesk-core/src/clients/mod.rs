//! HTTP implementations of the capability traits.

mod chat;
mod page;
mod tavily;

use std::sync::Arc;

use tracing::{info, warn};

pub use chat::ChatCompletionsClient;
pub use page::{HttpPageFetcher, extract_page};
pub use tavily::TavilyClient;

use crate::capability::{Capabilities, NewsSearch, PageFetcher, TextGenerator, Unavailable};
use crate::config::Config;

/// Assemble the capability set described by `config`.
///
/// A missing API key leaves the matching capability unavailable; the pipeline
/// then runs on its fallbacks instead of failing.
pub fn capabilities_from_config(config: &Config) -> Capabilities {
    let llm: Arc<dyn TextGenerator> = match config.llm_api_key() {
        Ok(key) => {
            info!(provider = %config.llm.provider, model = %config.llm.model, "language model enabled");
            Arc::new(ChatCompletionsClient::from_config(&config.llm, key))
        }
        Err(err) => {
            warn!(error = %err, "language model disabled; agents will use fallbacks");
            Arc::new(Unavailable)
        }
    };

    let search: Arc<dyn NewsSearch> = match config.search_api_key() {
        Ok(key) => Arc::new(TavilyClient::new(&config.search.base_url, key)),
        Err(err) => {
            warn!(error = %err, "news search disabled; placeholder articles will be used");
            Arc::new(Unavailable)
        }
    };

    let fetcher: Arc<dyn PageFetcher> = if config.search.fetch_full_text {
        Arc::new(HttpPageFetcher::new())
    } else {
        Arc::new(Unavailable)
    };

    Capabilities::offline()
        .with_llm(llm)
        .with_search(search)
        .with_fetcher(fetcher)
        .with_call_timeout(config.workflow.call_timeout())
}
