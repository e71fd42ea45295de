//! Content analyzer: per-article sentiment and themes plus naive entity
//! extraction, aggregated into the `content` analysis block.

use async_trait::async_trait;
use newsdesk_core::{
    AgentId, ArticleAnalysis, Capabilities, ContentAnalysis, Prompt, Sentiment,
    SentimentAssessment, SharedState,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::agent::Agent;

const ENTITIES_PER_ARTICLE: usize = 10;
const ENTITY_CAP: usize = 15;
const THEMES_PER_ARTICLE: usize = 3;
const SUMMARY_THEMES: usize = 5;
const CLASSIFIED_CONFIDENCE: f64 = 0.7;
const FALLBACK_CONFIDENCE: f64 = 0.5;

const CLASSIFY_SYSTEM: &str = "Classify the sentiment and main themes of the given news text. \
     Answer on one line as `label | theme, theme, theme` where label is one of \
     positive, negative or neutral and themes are short lowercase keywords.";

static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\b").expect("invalid entity regex")
});
static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]+").expect("invalid word regex"));

pub struct ContentAnalyzer {
    capabilities: Capabilities,
}

impl ContentAnalyzer {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }

    async fn classify(&self, text: &str) -> SentimentAssessment {
        let prompt = Prompt::new(CLASSIFY_SYSTEM, format!("Text to analyze: {text}"));

        match self.capabilities.generate(&prompt).await {
            Ok(reply) => {
                let (label, key_themes) = parse_classification(&reply);
                SentimentAssessment {
                    label,
                    confidence: CLASSIFIED_CONFIDENCE,
                    key_themes,
                    summary: format!("Sentiment analysis complete: {label}"),
                }
            }
            Err(err) if err.is_unavailable() => {
                neutral(&["general", "news"], "Basic analysis without language model")
            }
            Err(err) => {
                warn!(error = %err, "sentiment classification failed; defaulting to neutral");
                neutral(&["general"], "Analysis failed")
            }
        }
    }
}

#[async_trait]
impl Agent for ContentAnalyzer {
    fn id(&self) -> AgentId {
        AgentId::Analyzer
    }

    fn description(&self) -> &'static str {
        "Analyzes content sentiment and extracts key insights"
    }

    #[instrument(name = "agent.analyzer", skip(self, state), fields(articles = state.news_articles.len()))]
    async fn execute(&self, mut state: SharedState) -> SharedState {
        if state.news_articles.is_empty() {
            state.record(AgentId::Analyzer, "No articles to analyze");
            return state;
        }

        let mut content = ContentAnalysis::default();
        for article in &state.news_articles {
            let text = article.full_text();
            let sentiment = self.classify(&text).await;
            let entities = extract_entities(&text);
            debug!(title = %article.title, label = %sentiment.label, entities = entities.len(), "article analyzed");

            content.overall_sentiment.increment(sentiment.label);
            for theme in &sentiment.key_themes {
                *content.key_themes.entry(theme.clone()).or_insert(0) += 1;
            }
            for entity in &entities {
                if !content.entities.contains(entity) {
                    content.entities.push(entity.clone());
                }
            }
            content.article_analyses.push(ArticleAnalysis {
                title: article.title.clone(),
                url: article.url.clone(),
                sentiment,
                entities,
            });
        }
        content.entities.truncate(ENTITY_CAP);

        let themes: Vec<&str> = content
            .top_themes(SUMMARY_THEMES)
            .into_iter()
            .map(|(theme, _)| theme)
            .collect();
        content.summary_insights = format!(
            "Analyzed {} articles. Overall sentiment: {}. Top themes: {}. Key entities identified: {}",
            state.news_articles.len(),
            content.overall_sentiment.dominant(),
            themes.join(", "),
            content.entities.len()
        );

        info!(summary = %content.summary_insights, "content analysis complete");

        let message = format!("Content analysis complete: {}", content.summary_insights);
        state.analysis_results.content = Some(content);
        state.record(AgentId::Analyzer, message);
        state
    }
}

/// Title-case word runs, first ten matches, duplicates dropped in first-seen
/// order.
pub fn extract_entities(text: &str) -> Vec<String> {
    let mut entities: Vec<String> = Vec::new();
    for found in ENTITY.find_iter(text).take(ENTITIES_PER_ARTICLE) {
        let entity = found.as_str();
        if !entities.iter().any(|known| known == entity) {
            entities.push(entity.to_string());
        }
    }
    entities
}

/// Parse `label | theme, theme` replies. The label is the first word of the
/// label part that names a sentiment, else neutral; missing themes fall back
/// to `general, news`.
fn parse_classification(reply: &str) -> (Sentiment, Vec<String>) {
    let (label_part, theme_part) = match reply.split_once('|') {
        Some((label, themes)) => (label, themes),
        None => (reply, ""),
    };

    let label = WORD
        .find_iter(label_part)
        .find_map(|word| Sentiment::parse_word(word.as_str()))
        .unwrap_or(Sentiment::Neutral);

    let mut themes: Vec<String> = theme_part
        .split(',')
        .map(|theme| {
            theme
                .trim()
                .trim_matches(|c: char| c.is_ascii_punctuation())
                .trim()
                .to_lowercase()
        })
        .filter(|theme| !theme.is_empty())
        .take(THEMES_PER_ARTICLE)
        .collect();
    if themes.is_empty() {
        themes = vec!["general".to_string(), "news".to_string()];
    }

    (label, themes)
}

fn neutral(themes: &[&str], summary: &str) -> SentimentAssessment {
    SentimentAssessment {
        label: Sentiment::Neutral,
        confidence: FALLBACK_CONFIDENCE,
        key_themes: themes.iter().map(|theme| theme.to_string()).collect(),
        summary: summary.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLlm;
    use newsdesk_core::{Article, SentimentCounts};

    fn article(title: &str, content: &str) -> Article {
        Article {
            title: title.into(),
            url: format!("https://www.npr.org/{}", title.to_lowercase().replace(' ', "-")),
            content: content.into(),
            publish_date: "2024-03-01".into(),
        }
    }

    fn three_articles() -> SharedState {
        let mut state = SharedState::new("trade");
        state.news_articles = vec![
            article("Markets Rally", "Stocks rose sharply."),
            article("Exports Climb", "Shipments grew."),
            article("Council Meets", "The agenda was routine."),
        ];
        state
    }

    #[test]
    fn entities_are_title_case_runs() {
        let entities = extract_entities("Angela Merkel met Emmanuel Macron in Paris. Paris agreed.");
        assert_eq!(entities, vec!["Angela Merkel", "Emmanuel Macron", "Paris"]);

        let many = (0..20)
            .map(|i| format!("Name{i} Alpha"))
            .collect::<Vec<_>>()
            .join(" and ");
        assert!(extract_entities(&many).len() <= ENTITIES_PER_ARTICLE);
    }

    #[test]
    fn classification_replies_are_parsed() {
        assert_eq!(
            parse_classification("Positive | Markets, trade., energy, extra"),
            (
                Sentiment::Positive,
                vec!["markets".to_string(), "trade".to_string(), "energy".to_string()]
            )
        );
        let (label, themes) = parse_classification("The tone is negative overall.");
        assert_eq!(label, Sentiment::Negative);
        assert_eq!(themes, vec!["general", "news"]);
        assert_eq!(parse_classification("nonpositive").0, Sentiment::Neutral);
    }

    #[tokio::test]
    async fn empty_articles_only_add_a_message() {
        let agent = ContentAnalyzer::new(Capabilities::offline());
        let before = SharedState::new("nothing");
        let after = agent.execute(before.clone()).await;

        assert_eq!(after.analysis_results, before.analysis_results);
        assert_eq!(after.messages.len(), 1);
        assert_eq!(after.messages[0].content, "No articles to analyze");
        assert_eq!(after.current_agent, Some(AgentId::Analyzer));
    }

    #[tokio::test]
    async fn aggregates_sentiment_themes_and_entities() {
        let llm = ScriptedLlm::with(|prompt| {
            if prompt.user.contains("Rally") || prompt.user.contains("Climb") {
                Ok("positive | markets, trade".into())
            } else {
                Ok("neutral | politics".into())
            }
        });
        let agent = ContentAnalyzer::new(Capabilities::offline().with_llm(llm));
        let state = agent.execute(three_articles()).await;

        let content = state.analysis_results.content.as_ref().unwrap();
        assert_eq!(
            content.overall_sentiment,
            SentimentCounts {
                positive: 2,
                negative: 0,
                neutral: 1
            }
        );
        assert_eq!(content.overall_sentiment.dominant(), Sentiment::Positive);
        assert_eq!(content.article_analyses[0].sentiment.confidence, 0.7);
        assert_eq!(
            content.entities,
            vec!["Markets Rally", "Stocks", "Exports Climb", "Shipments", "Council Meets", "The"]
        );
        insta::assert_snapshot!(
            content.summary_insights,
            @"Analyzed 3 articles. Overall sentiment: positive. Top themes: markets, trade, politics. Key entities identified: 6"
        );
        assert_eq!(state.messages.len(), 1);
        assert!(state.messages[0].content.starts_with("Content analysis complete: Analyzed 3"));
    }

    #[tokio::test]
    async fn fallbacks_distinguish_unavailable_from_failure() {
        let offline = ContentAnalyzer::new(Capabilities::offline())
            .execute(three_articles())
            .await;
        let content = offline.analysis_results.content.unwrap();
        assert_eq!(content.overall_sentiment.neutral, 3);
        assert_eq!(content.key_themes.get("news"), Some(&3));
        assert_eq!(content.article_analyses[0].sentiment.confidence, 0.5);

        let failing = ContentAnalyzer::new(Capabilities::offline().with_llm(ScriptedLlm::failing()))
            .execute(three_articles())
            .await;
        let content = failing.analysis_results.content.unwrap();
        assert_eq!(content.key_themes.len(), 1);
        assert_eq!(content.key_themes.get("general"), Some(&3));
    }

    #[tokio::test]
    async fn existing_fact_check_block_is_kept() {
        let mut state = three_articles();
        state.analysis_results.fact_check = Some(newsdesk_core::FactCheckResults {
            overall_credibility: 0.8,
            reliability: newsdesk_core::Reliability::High,
            article_assessments: Vec::new(),
            common_red_flags: Default::default(),
            reliability_summary: "Overall reliability: High (Score: 0.80).".into(),
        });
        let state = ContentAnalyzer::new(Capabilities::offline()).execute(state).await;
        assert!(state.analysis_results.content.is_some());
        assert!(state.analysis_results.fact_check.is_some());
    }
}
