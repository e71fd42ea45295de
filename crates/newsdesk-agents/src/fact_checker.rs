//! Fact checker: credibility scores and heuristic red flags per article.

use std::collections::BTreeMap;

use async_trait::async_trait;
use newsdesk_core::{
    AgentId, ArticleAssessment, Capabilities, FactCheckResults, Prompt, Reliability, SharedState,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::agent::Agent;

pub const SENSATIONAL_LANGUAGE: &str = "Contains sensational language";
pub const LIMITED_ATTRIBUTION: &str = "Limited source attribution";
pub const ABSOLUTE_STATEMENTS: &str = "Contains absolute statements";

const SENSATIONAL_WORDS: [&str; 5] = ["shocking", "unbelievable", "incredible", "amazing", "devastating"];
const SUMMARY_FLAGS: usize = 3;

const UNAVAILABLE_SCORE: f64 = 0.7;
const FAILED_SCORE: f64 = 0.5;
const NEGATIVE_SCORE: f64 = 0.3;
const POSITIVE_SCORE: f64 = 0.8;
const NEUTRAL_SCORE: f64 = 0.7;

const CHECK_SYSTEM: &str = "You are a fact-checker. Review the text for verifiable claims, \
     possible misinformation or bias, source credibility and internal consistency. \
     Give a short assessment of its reliability and list any red flags.";

static ABSOLUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:always|never|all|none|everyone|nobody)\b").expect("invalid absolute regex")
});
static DOUBTFUL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:unreliable|false|misleading|biased)\b").expect("invalid doubtful regex")
});
static TRUSTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:credible|accurate|verified|reliable)\b").expect("invalid trusted regex")
});

pub struct FactChecker {
    capabilities: Capabilities,
}

impl FactChecker {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }

    async fn assess(&self, text: &str) -> (f64, String) {
        let prompt = Prompt::new(CHECK_SYSTEM, format!("Text to fact-check: {text}"));

        match self.capabilities.generate(&prompt).await {
            Ok(reply) => (score_assessment(&reply), reply),
            Err(err) if err.is_unavailable() => (
                UNAVAILABLE_SCORE,
                "Language model not available for fact checking".to_string(),
            ),
            Err(err) => {
                warn!(error = %err, "fact check call failed; using neutral credibility");
                (FAILED_SCORE, "Fact checking failed".to_string())
            }
        }
    }
}

#[async_trait]
impl Agent for FactChecker {
    fn id(&self) -> AgentId {
        AgentId::FactChecker
    }

    fn description(&self) -> &'static str {
        "Verifies factual accuracy and identifies potential misinformation"
    }

    #[instrument(name = "agent.fact_checker", skip(self, state), fields(articles = state.news_articles.len()))]
    async fn execute(&self, mut state: SharedState) -> SharedState {
        if state.news_articles.is_empty() {
            state.record(AgentId::FactChecker, "No articles to fact-check");
            return state;
        }

        let mut assessments = Vec::with_capacity(state.news_articles.len());
        let mut common_red_flags = BTreeMap::new();
        let mut total = 0.0;

        for article in &state.news_articles {
            let text = article.full_text();
            let (credibility_score, assessment) = self.assess(&text).await;
            let flags = red_flags(&text);
            debug!(title = %article.title, credibility_score, flags = flags.len(), "article checked");

            total += credibility_score;
            for flag in &flags {
                *common_red_flags.entry(flag.clone()).or_insert(0) += 1;
            }
            assessments.push(ArticleAssessment {
                title: article.title.clone(),
                url: article.url.clone(),
                credibility_score,
                assessment,
                red_flags: flags,
            });
        }

        // Four decimals: identical scores must average to exactly that score.
        let overall_credibility = (total / assessments.len() as f64 * 10_000.0).round() / 10_000.0;
        let reliability = Reliability::from_score(overall_credibility);
        let mut results = FactCheckResults {
            overall_credibility,
            reliability,
            article_assessments: assessments,
            common_red_flags,
            reliability_summary: String::new(),
        };
        results.reliability_summary = summarize(&results);

        info!(
            overall_credibility,
            reliability = %reliability,
            "fact check complete"
        );

        let message = format!("Fact-checking complete: {}", results.reliability_summary);
        state.analysis_results.fact_check = Some(results);
        state.record(AgentId::FactChecker, message);
        state
    }
}

/// Credibility implied by a free-text assessment. Doubtful vocabulary wins
/// over trusting vocabulary; neither gives the neutral score.
pub fn score_assessment(assessment: &str) -> f64 {
    if DOUBTFUL.is_match(assessment) {
        NEGATIVE_SCORE
    } else if TRUSTED.is_match(assessment) {
        POSITIVE_SCORE
    } else {
        NEUTRAL_SCORE
    }
}

pub fn red_flags(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut flags = Vec::new();

    if SENSATIONAL_WORDS.iter().any(|word| lower.contains(word)) {
        flags.push(SENSATIONAL_LANGUAGE.to_string());
    }
    if !lower.contains("source") && !lower.contains("according to") {
        flags.push(LIMITED_ATTRIBUTION.to_string());
    }
    if ABSOLUTE.is_match(text) {
        flags.push(ABSOLUTE_STATEMENTS.to_string());
    }
    flags
}

fn summarize(results: &FactCheckResults) -> String {
    let headline = format!(
        "Overall reliability: {} (Score: {:.2}).",
        results.reliability, results.overall_credibility
    );
    let flags: Vec<&str> = results
        .top_red_flags(SUMMARY_FLAGS)
        .into_iter()
        .map(|(flag, _)| flag)
        .collect();
    if flags.is_empty() {
        headline
    } else {
        format!("{headline} Common issues: {}", flags.join(", "))
    }
}
