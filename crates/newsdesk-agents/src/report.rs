//! Report generator: renders the collected articles and analysis blocks as a
//! markdown report.

use std::fmt::Write as _;

use async_trait::async_trait;
use chrono::Utc;
use newsdesk_core::{
    AgentId, AnalysisResults, Capabilities, Prompt, Sentiment, SharedState, truncate_preview,
};
use tracing::{info, instrument, warn};

use crate::agent::Agent;

const REPORT_THEMES: usize = 5;
const ARTICLE_THEMES: usize = 3;
const ARTICLE_FLAGS: usize = 2;
const PREVIEW_CHARS: usize = 200;

const SUMMARY_SYSTEM: &str = "Write a professional executive summary for a news analysis \
     report. Cover key findings, overall sentiment, main themes, credibility and strategic \
     implications. Keep it concise.";

pub struct ReportGenerator {
    capabilities: Capabilities,
}

impl ReportGenerator {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }

    async fn executive_summary(&self, state: &SharedState) -> String {
        let analysis = serde_json::to_string_pretty(&state.analysis_results).unwrap_or_default();
        let prompt = Prompt::new(
            SUMMARY_SYSTEM,
            format!(
                "Topic: {}\n\nAnalysis results:\n{analysis}\n\nWrite the executive summary.",
                state.topic
            ),
        );

        match self.capabilities.generate(&prompt).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => templated_summary(state),
            Err(err) => {
                if !err.is_unavailable() {
                    warn!(error = %err, "executive summary generation failed; using template");
                }
                templated_summary(state)
            }
        }
    }
}

#[async_trait]
impl Agent for ReportGenerator {
    fn id(&self) -> AgentId {
        AgentId::ReportGenerator
    }

    fn description(&self) -> &'static str {
        "Generates a comprehensive report from the analysis results"
    }

    #[instrument(name = "agent.report_generator", skip(self, state), fields(topic = %state.topic))]
    async fn execute(&self, mut state: SharedState) -> SharedState {
        if state.analysis_results.is_empty() || state.news_articles.is_empty() {
            state.record(AgentId::ReportGenerator, "Insufficient data for report generation");
            return state;
        }

        let summary = self.executive_summary(&state).await;
        let report = render_report(&state, &summary);
        info!(bytes = report.len(), "report generated");

        let message = format!("Comprehensive report generated for topic: {}", state.topic);
        state.final_report = report;
        state.record(AgentId::ReportGenerator, message);
        state
    }
}

fn templated_summary(state: &SharedState) -> String {
    let results = &state.analysis_results;
    let analyzed = results
        .content
        .as_ref()
        .map(|content| content.article_analyses.len())
        .unwrap_or(state.news_articles.len());

    let mut summary = format!(
        "Executive Summary for {}:\n\nAnalyzed {analyzed} articles.\n",
        state.topic
    );
    if let Some(content) = &results.content {
        let _ = writeln!(
            summary,
            "Overall sentiment: {}.",
            content.overall_sentiment.dominant()
        );
    }
    if let Some(fact_check) = &results.fact_check {
        let _ = writeln!(
            summary,
            "Average credibility score: {:.2}/1.0.",
            fact_check.overall_credibility
        );
    }
    let themes = results
        .content
        .as_ref()
        .map(|content| content.key_themes.len())
        .unwrap_or(0);
    let _ = writeln!(summary, "Key themes identified: {themes}");
    summary.push_str("This analysis provides insights into current trends and public opinion.");
    summary
}

fn render_report(state: &SharedState, executive_summary: &str) -> String {
    let mut report = String::new();
    let _ = writeln!(report, "# News Analysis Report: {}\n", state.topic);
    let _ = writeln!(
        report,
        "**Generated:** {}",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(report, "**Articles Analyzed:** {}\n", state.news_articles.len());

    let _ = writeln!(report, "## Executive Summary\n\n{executive_summary}\n");

    report.push_str("## Key Findings\n\n");
    render_findings(&mut report, &state.analysis_results);

    report.push_str("## Article Summaries\n\n");
    render_articles(&mut report, state);

    report.push_str(
        "## Methodology\n\n\
         This report was produced by a multi-agent pipeline that:\n\
         1. Searched for relevant news articles\n\
         2. Analyzed content for sentiment, themes and entities\n\
         3. Assessed credibility and flagged questionable content\n\
         4. Compiled the findings into this report\n\n\
         **Disclaimer:** This analysis is machine generated and should be verified with additional sources.\n",
    );
    report
}

fn render_findings(report: &mut String, results: &AnalysisResults) {
    if let Some(content) = &results.content {
        let counts = content.overall_sentiment;
        let total = counts.total();
        if total > 0 {
            report.push_str("### Sentiment Analysis\n");
            for sentiment in Sentiment::ALL {
                let count = counts.get(sentiment);
                let percentage = count as f64 / total as f64 * 100.0;
                let _ = writeln!(
                    report,
                    "- {}: {count} articles ({percentage:.1}%)",
                    capitalize(sentiment.as_str())
                );
            }
            report.push('\n');
        }

        let themes = content.top_themes(REPORT_THEMES);
        if !themes.is_empty() {
            report.push_str("### Top Themes\n");
            for (theme, count) in themes {
                let _ = writeln!(report, "- {theme}: {count} mentions");
            }
            report.push('\n');
        }
    }

    if let Some(fact_check) = &results.fact_check {
        report.push_str("### Credibility Assessment\n");
        let _ = writeln!(
            report,
            "- Overall credibility score: {:.2}/1.0 ({})",
            fact_check.overall_credibility, fact_check.reliability
        );
        let _ = writeln!(report, "- Assessment: {}\n", fact_check.reliability_summary);
    }

    if let Some(content) = &results.content {
        if !content.summary_insights.is_empty() {
            let _ = writeln!(report, "### Summary Insights\n{}\n", content.summary_insights);
        }
    }
}

fn render_articles(report: &mut String, state: &SharedState) {
    let analyses = state
        .analysis_results
        .content
        .as_ref()
        .map(|content| content.article_analyses.as_slice())
        .unwrap_or_default();
    let assessments = state
        .analysis_results
        .fact_check
        .as_ref()
        .map(|fact_check| fact_check.article_assessments.as_slice())
        .unwrap_or_default();

    for (index, article) in state.news_articles.iter().enumerate() {
        let title = or_placeholder(&article.title, "Untitled");
        let _ = writeln!(report, "### Article {}: {title}", index + 1);
        let _ = writeln!(report, "**URL:** {}", or_placeholder(&article.url, "N/A"));
        let _ = writeln!(
            report,
            "**Published:** {}\n",
            or_placeholder(&article.publish_date, "Unknown")
        );

        if let Some(analysis) = analyses.get(index) {
            let sentiment = &analysis.sentiment;
            let _ = writeln!(
                report,
                "**Sentiment:** {} (Confidence: {:.2})",
                sentiment.label, sentiment.confidence
            );
            if !sentiment.key_themes.is_empty() {
                let themes: Vec<&str> = sentiment
                    .key_themes
                    .iter()
                    .take(ARTICLE_THEMES)
                    .map(String::as_str)
                    .collect();
                let _ = writeln!(report, "**Themes:** {}", themes.join(", "));
            }
        }

        if let Some(assessment) = assessments.get(index) {
            let _ = writeln!(
                report,
                "**Credibility Score:** {:.2}/1.0",
                assessment.credibility_score
            );
            if !assessment.red_flags.is_empty() {
                let flags: Vec<&str> = assessment
                    .red_flags
                    .iter()
                    .take(ARTICLE_FLAGS)
                    .map(String::as_str)
                    .collect();
                let _ = writeln!(report, "**Issues:** {}", flags.join(", "));
            }
        }

        let _ = writeln!(
            report,
            "**Preview:** {}\n\n---\n",
            truncate_preview(&article.content, PREVIEW_CHARS)
        );
    }
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.is_empty() { placeholder } else { value }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
