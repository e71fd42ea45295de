use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::state::{AgentId, AnalysisResults, Message, SharedState};

pub const NO_REPORT: &str = "No report generated";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    StepLimitReached,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::StepLimitReached => "step_limit_reached",
            RunStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a caller gets back from a run. Always well formed, even when the
/// run itself failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub topic: String,
    pub status: RunStatus,
    pub steps: usize,
    pub messages: Vec<Message>,
    pub article_count: usize,
    pub analysis_results: AnalysisResults,
    pub final_report: String,
    pub trace: Vec<String>,
}

impl RunResult {
    pub fn from_state(state: SharedState, status: RunStatus, steps: usize) -> Self {
        let trace = state.trace();
        let final_report = if state.final_report.is_empty() {
            NO_REPORT.to_string()
        } else {
            state.final_report
        };
        Self {
            topic: state.topic,
            status,
            steps,
            article_count: state.news_articles.len(),
            messages: state.messages,
            analysis_results: state.analysis_results,
            final_report,
            trace,
        }
    }

    /// Result describing a run that could not complete.
    pub fn failed(topic: impl Into<String>, reason: impl fmt::Display) -> Self {
        let topic = topic.into();
        let message = Message {
            agent: AgentId::System,
            content: format!("Workflow failed: {reason}"),
            timestamp: Utc::now(),
        };
        Self {
            final_report: format!("Analysis failed for topic: {topic}. Error: {reason}"),
            trace: vec![format!("Error: {reason}")],
            topic,
            status: RunStatus::Failed,
            steps: 0,
            messages: vec![message],
            article_count: 0,
            analysis_results: AnalysisResults::default(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }
}
