//! Shared run state threaded through every agent of a pipeline run.
//!
//! The state is a fixed-schema record. Untyped input (for example the JSON
//! stored in a `graph_flow` session context) only ever enters through
//! [`SharedState::normalize`], which defaults whatever is missing or malformed.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Identifier of a pipeline participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentId {
    Supervisor,
    Researcher,
    Analyzer,
    FactChecker,
    ReportGenerator,
    /// Orchestrator-level messages (failures, step limits).
    System,
}

impl AgentId {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentId::Supervisor => "Supervisor",
            AgentId::Researcher => "Researcher",
            AgentId::Analyzer => "Analyzer",
            AgentId::FactChecker => "FactChecker",
            AgentId::ReportGenerator => "ReportGenerator",
            AgentId::System => "System",
        }
    }

    /// Task identifier used for the agent inside the workflow graph.
    pub fn task_id(&self) -> &'static str {
        match self {
            AgentId::Supervisor => "supervisor",
            AgentId::Researcher => "researcher",
            AgentId::Analyzer => "analyzer",
            AgentId::FactChecker => "fact_checker",
            AgentId::ReportGenerator => "report_generator",
            AgentId::System => "system",
        }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing decision written by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NextAgent {
    Researcher,
    Analyzer,
    FactChecker,
    ReportGenerator,
    /// Termination sentinel.
    #[serde(rename = "FINISH")]
    Finish,
}

impl NextAgent {
    pub const VOCABULARY: [NextAgent; 5] = [
        NextAgent::Researcher,
        NextAgent::Analyzer,
        NextAgent::FactChecker,
        NextAgent::ReportGenerator,
        NextAgent::Finish,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NextAgent::Researcher => "Researcher",
            NextAgent::Analyzer => "Analyzer",
            NextAgent::FactChecker => "FactChecker",
            NextAgent::ReportGenerator => "ReportGenerator",
            NextAgent::Finish => "FINISH",
        }
    }

    /// The agent that handles this decision, `None` for the termination sentinel.
    pub fn agent(&self) -> Option<AgentId> {
        match self {
            NextAgent::Researcher => Some(AgentId::Researcher),
            NextAgent::Analyzer => Some(AgentId::Analyzer),
            NextAgent::FactChecker => Some(AgentId::FactChecker),
            NextAgent::ReportGenerator => Some(AgentId::ReportGenerator),
            NextAgent::Finish => None,
        }
    }
}

impl fmt::Display for NextAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized agent identifier: {0:?}")]
pub struct UnknownAgent(pub String);

impl FromStr for NextAgent {
    type Err = UnknownAgent;

    /// Strict parse of a routing answer. Only surrounding whitespace, quotes,
    /// backticks and punctuation are tolerated; the remainder must be exactly
    /// one vocabulary entry (case-insensitive).
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let cleaned = raw.trim_matches(|c: char| {
            c.is_whitespace() || matches!(c, '"' | '\'' | '`' | '*' | '.' | '!' | ':')
        });

        match cleaned.to_ascii_lowercase().as_str() {
            "researcher" | "newsresearcher" => Ok(NextAgent::Researcher),
            "analyzer" | "contentanalyzer" => Ok(NextAgent::Analyzer),
            "factchecker" => Ok(NextAgent::FactChecker),
            "reportgenerator" => Ok(NextAgent::ReportGenerator),
            "finish" | "terminate" => Ok(NextAgent::Finish),
            _ => Err(UnknownAgent(raw.to_string())),
        }
    }
}

/// One entry of the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub agent: AgentId,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub content: String,
    pub publish_date: String,
}

impl Article {
    /// `title. content`, the text every analysis stage works on.
    pub fn full_text(&self) -> String {
        format!("{}. {}", self.title, self.content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }

    pub fn parse_word(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "positive" => Some(Sentiment::Positive),
            "negative" => Some(Sentiment::Negative),
            "neutral" => Some(Sentiment::Neutral),
            _ => None,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentCounts {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl SentimentCounts {
    pub fn increment(&mut self, sentiment: Sentiment) {
        match sentiment {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Negative => self.negative += 1,
            Sentiment::Neutral => self.neutral += 1,
        }
    }

    pub fn get(&self, sentiment: Sentiment) -> usize {
        match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Negative => self.negative,
            Sentiment::Neutral => self.neutral,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }

    /// Label with the highest count. Ties go to the earlier label in
    /// positive, negative, neutral order; an empty tally is neutral.
    pub fn dominant(&self) -> Sentiment {
        if self.total() == 0 {
            return Sentiment::Neutral;
        }
        let mut best = Sentiment::Positive;
        for sentiment in Sentiment::ALL {
            if self.get(sentiment) > self.get(best) {
                best = sentiment;
            }
        }
        best
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentAssessment {
    pub label: Sentiment,
    pub confidence: f64,
    pub key_themes: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleAnalysis {
    pub title: String,
    pub url: String,
    pub sentiment: SentimentAssessment,
    pub entities: Vec<String>,
}

/// Block written by the content analyzer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentAnalysis {
    pub overall_sentiment: SentimentCounts,
    pub key_themes: BTreeMap<String, usize>,
    pub entities: Vec<String>,
    pub article_analyses: Vec<ArticleAnalysis>,
    pub summary_insights: String,
}

impl ContentAnalysis {
    /// Themes by descending count; equal counts keep alphabetical order.
    pub fn top_themes(&self, limit: usize) -> Vec<(&str, usize)> {
        ranked(&self.key_themes, limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reliability {
    High,
    Moderate,
    Low,
}

impl Reliability {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.7 {
            Reliability::High
        } else if score >= 0.5 {
            Reliability::Moderate
        } else {
            Reliability::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Reliability::High => "High",
            Reliability::Moderate => "Moderate",
            Reliability::Low => "Low",
        }
    }
}

impl fmt::Display for Reliability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleAssessment {
    pub title: String,
    pub url: String,
    pub credibility_score: f64,
    pub assessment: String,
    pub red_flags: Vec<String>,
}

/// Block written by the fact checker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheckResults {
    pub overall_credibility: f64,
    pub reliability: Reliability,
    pub article_assessments: Vec<ArticleAssessment>,
    pub common_red_flags: BTreeMap<String, usize>,
    pub reliability_summary: String,
}

impl FactCheckResults {
    pub fn top_red_flags(&self, limit: usize) -> Vec<(&str, usize)> {
        ranked(&self.common_red_flags, limit)
    }
}

/// Analysis output, one independently written block per contributor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisResults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fact_check: Option<FactCheckResults>,
}

impl AnalysisResults {
    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.fact_check.is_none()
    }
}

/// Completeness flags the supervisor routes on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub has_articles: bool,
    pub has_analysis: bool,
    pub has_fact_check: bool,
    pub has_report: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharedState {
    pub topic: String,
    pub messages: Vec<Message>,
    pub current_agent: Option<AgentId>,
    pub news_articles: Vec<Article>,
    pub analysis_results: AnalysisResults,
    pub final_report: String,
    pub next_agent: Option<NextAgent>,
}

impl SharedState {
    /// Fresh state for a run: everything empty except the topic.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }

    /// Build a complete state from any JSON value.
    ///
    /// Objects keep each field that deserializes and default the rest; a bare
    /// string is taken as the topic; anything else yields an empty state.
    pub fn normalize(value: Value) -> Self {
        match value {
            Value::Object(map) => Self {
                topic: field(&map, "topic"),
                messages: field(&map, "messages"),
                current_agent: field(&map, "current_agent"),
                news_articles: field(&map, "news_articles"),
                analysis_results: field(&map, "analysis_results"),
                final_report: field(&map, "final_report"),
                next_agent: field(&map, "next_agent"),
            },
            Value::String(topic) => Self::new(topic),
            _ => Self::default(),
        }
    }

    /// Append to the audit trail, attributed to `agent`, else the current
    /// agent, else the system.
    pub fn append_message(&mut self, content: impl Into<String>, agent: Option<AgentId>) {
        let agent = agent.or(self.current_agent).unwrap_or(AgentId::System);
        self.messages.push(Message {
            agent,
            content: content.into(),
            timestamp: Utc::now(),
        });
    }

    /// Mark `agent` as the last writer and log exactly one message for it.
    pub fn record(&mut self, agent: AgentId, content: impl Into<String>) {
        self.current_agent = Some(agent);
        self.append_message(content, Some(agent));
    }

    pub fn progress(&self) -> Progress {
        Progress {
            has_articles: !self.news_articles.is_empty(),
            has_analysis: self.analysis_results.content.is_some(),
            has_fact_check: self.analysis_results.fact_check.is_some(),
            has_report: !self.final_report.is_empty(),
        }
    }

    pub fn trace(&self) -> Vec<String> {
        self.messages.iter().map(|m| m.content.clone()).collect()
    }
}

fn field<T: DeserializeOwned + Default>(map: &Map<String, Value>, key: &str) -> T {
    map.get(key)
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default()
}

fn ranked(counts: &BTreeMap<String, usize>, limit: usize) -> Vec<(&str, usize)> {
    let mut entries: Vec<(&str, usize)> = counts
        .iter()
        .map(|(key, count)| (key.as_str(), *count))
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.truncate(limit);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn complete_state() -> SharedState {
        let mut state = SharedState::new("quantum computing");
        state.news_articles.push(Article {
            title: "Qubits Scale Up".into(),
            url: "https://www.reuters.com/q".into(),
            content: "According to IBM the roadmap holds.".into(),
            publish_date: "2024-01-15".into(),
        });
        let mut content = ContentAnalysis::default();
        content.overall_sentiment.increment(Sentiment::Positive);
        content.key_themes.insert("hardware".into(), 1);
        content.entities.push("Qubits Scale Up".into());
        content.summary_insights = "Analyzed 1 articles.".into();
        state.analysis_results.content = Some(content);
        state.final_report = "# report".into();
        state.next_agent = Some(NextAgent::Finish);
        state.record(AgentId::ReportGenerator, "done");
        state
    }

    #[test]
    fn normalize_defaults_missing_fields() {
        let state = SharedState::normalize(json!({ "topic": "ai chips" }));
        assert_eq!(state.topic, "ai chips");
        assert!(state.messages.is_empty());
        assert!(state.news_articles.is_empty());
        assert!(state.analysis_results.is_empty());
        assert!(state.final_report.is_empty());
        assert_eq!(state.current_agent, None);
        assert_eq!(state.next_agent, None);
    }

    #[test]
    fn normalize_tolerates_non_records_and_bad_fields() {
        assert_eq!(SharedState::normalize(json!("fusion")).topic, "fusion");
        assert_eq!(SharedState::normalize(json!(42)), SharedState::default());
        assert_eq!(SharedState::normalize(Value::Null), SharedState::default());

        let state = SharedState::normalize(json!({
            "topic": "fusion",
            "news_articles": "not a list",
            "final_report": 7,
            "next_agent": "Nobody",
        }));
        assert_eq!(state.topic, "fusion");
        assert!(state.news_articles.is_empty());
        assert!(state.final_report.is_empty());
        assert_eq!(state.next_agent, None);
    }

    #[test]
    fn normalize_is_idempotent_and_preserves_complete_state() {
        let state = complete_state();
        let once = SharedState::normalize(serde_json::to_value(&state).unwrap());
        assert_eq!(once, state);
        let twice = SharedState::normalize(serde_json::to_value(&once).unwrap());
        assert_eq!(twice, once);
    }

    #[test]
    fn append_message_attribution() {
        let mut state = SharedState::new("t");
        state.append_message("boot", None);
        assert_eq!(state.messages[0].agent, AgentId::System);

        state.current_agent = Some(AgentId::Researcher);
        state.append_message("searching", None);
        assert_eq!(state.messages[1].agent, AgentId::Researcher);

        state.append_message("override", Some(AgentId::Analyzer));
        assert_eq!(state.messages[2].agent, AgentId::Analyzer);
        assert_eq!(state.trace(), vec!["boot", "searching", "override"]);
    }

    #[test]
    fn dominant_sentiment_prefers_counts_then_order() {
        let counts = SentimentCounts {
            positive: 2,
            negative: 0,
            neutral: 1,
        };
        assert_eq!(counts.dominant(), Sentiment::Positive);

        let tie = SentimentCounts {
            positive: 0,
            negative: 2,
            neutral: 2,
        };
        assert_eq!(tie.dominant(), Sentiment::Negative);
        assert_eq!(SentimentCounts::default().dominant(), Sentiment::Neutral);
    }

    #[test]
    fn next_agent_parsing_is_strict() {
        assert_eq!("Researcher".parse(), Ok(NextAgent::Researcher));
        assert_eq!("  `ReportGenerator`.\n".parse(), Ok(NextAgent::ReportGenerator));
        assert_eq!("contentanalyzer".parse(), Ok(NextAgent::Analyzer));
        assert_eq!("FINISH".parse(), Ok(NextAgent::Finish));
        assert!("The next agent should be Researcher".parse::<NextAgent>().is_err());
        assert!("Researcher, then Analyzer".parse::<NextAgent>().is_err());
        assert!("".parse::<NextAgent>().is_err());
    }

    #[test]
    fn reliability_tiers() {
        assert_eq!(Reliability::from_score(0.7), Reliability::High);
        assert_eq!(Reliability::from_score(0.69), Reliability::Moderate);
        assert_eq!(Reliability::from_score(0.5), Reliability::Moderate);
        assert_eq!(Reliability::from_score(0.3), Reliability::Low);
    }

    #[test]
    fn top_themes_sorted_by_count() {
        let mut content = ContentAnalysis::default();
        content.key_themes.insert("news".into(), 2);
        content.key_themes.insert("general".into(), 3);
        content.key_themes.insert("economy".into(), 2);
        assert_eq!(
            content.top_themes(2),
            vec![("general", 3), ("economy", 2)]
        );
    }
}
