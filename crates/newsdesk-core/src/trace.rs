//! Display views of a run's message log.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::{AgentId, Message};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    pub index: usize,
    pub agent: AgentId,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl TraceStep {
    fn is_decision(&self) -> bool {
        self.agent == AgentId::Supervisor
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceSummary {
    pub steps: Vec<TraceStep>,
}

impl TraceSummary {
    pub fn from_messages(messages: &[Message]) -> Self {
        let steps = messages
            .iter()
            .enumerate()
            .map(|(idx, message)| TraceStep {
                index: idx + 1,
                agent: message.agent,
                message: message.content.clone(),
                at: message.timestamp,
            })
            .collect();
        Self { steps }
    }

    /// Numbered list; supervisor decisions are italicised so the agent work
    /// stands out.
    pub fn render_markdown(&self) -> String {
        if self.steps.is_empty() {
            return "No agent activity recorded.".to_string();
        }

        let mut output = String::from("### Agent Trace\n\n");
        for step in &self.steps {
            let time = step.at.format("%H:%M:%S");
            if step.is_decision() {
                let _ = writeln!(output, "{}. `{time}` _{}_", step.index, step.message);
            } else {
                let _ = writeln!(
                    output,
                    "{}. `{time}` **{}**: {}",
                    step.index, step.agent, step.message
                );
            }
        }
        output
    }

    /// Flowchart with supervisor decisions as diamonds and agent steps as boxes.
    pub fn render_mermaid(&self) -> String {
        let mut output = String::from("flowchart TD\n");
        if self.steps.is_empty() {
            output.push_str("  idle([no agent activity])\n");
            return output;
        }

        for step in &self.steps {
            let label = escape_label(&step.message);
            if step.is_decision() {
                let _ = writeln!(output, "  n{}{{\"{label}\"}}", step.index);
            } else {
                let _ = writeln!(output, "  n{}[\"{}: {label}\"]", step.index, step.agent);
            }
        }
        for pair in self.steps.windows(2) {
            let _ = writeln!(output, "  n{} --> n{}", pair[0].index, pair[1].index);
        }
        output
    }
}

fn escape_label(text: &str) -> String {
    text.replace('"', "#quot;")
        .replace(['[', '{'], "(")
        .replace([']', '}'], ")")
        .replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SharedState;

    fn sample_messages() -> Vec<Message> {
        let mut state = SharedState::new("t");
        state.record(AgentId::Supervisor, "Supervisor decided next agent: Researcher");
        state.record(AgentId::Researcher, "Found 6 news articles for topic: \"t\"");
        state.record(AgentId::Supervisor, "Supervisor decided next agent: FINISH");
        state.messages
    }

    #[test]
    fn markdown_separates_decisions_from_work() {
        let markdown = TraceSummary::from_messages(&sample_messages()).render_markdown();

        assert!(markdown.starts_with("### Agent Trace"));
        assert!(markdown.contains("_Supervisor decided next agent: Researcher_"));
        assert!(markdown.contains("**Researcher**: Found 6 news articles"));
        assert!(markdown.contains("\n3. `"));
    }

    #[test]
    fn mermaid_uses_decision_nodes() {
        let mermaid = TraceSummary::from_messages(&sample_messages()).render_mermaid();

        assert!(mermaid.contains("n1{\"Supervisor decided next agent: Researcher\"}"));
        assert!(mermaid.contains("n2[\"Researcher: Found 6 news articles for topic: #quot;t#quot;\"]"));
        assert!(mermaid.contains("n1 --> n2"));
        assert!(mermaid.contains("n2 --> n3"));
        assert!(!mermaid.contains("n3 --> n4"));
    }

    #[test]
    fn empty_views() {
        let empty = TraceSummary::default();
        assert_eq!(empty.render_markdown(), "No agent activity recorded.");
        assert!(empty.render_mermaid().contains("no agent activity"));
    }
}
