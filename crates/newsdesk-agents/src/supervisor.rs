//! Supervisor: picks the next agent from the state's progress.
//!
//! The deterministic [`route`] is authoritative. A language model may be asked
//! first, but its answer is only honoured when it parses strictly and names a
//! stage that is still pending with its inputs in place.

use std::fmt::Write as _;

use async_trait::async_trait;
use newsdesk_core::{AgentId, Capabilities, NextAgent, Progress, Prompt, SharedState};
use tracing::{debug, info, instrument, warn};

use crate::agent::Agent;

pub struct Supervisor {
    capabilities: Capabilities,
    llm_routing: bool,
    fact_check: bool,
    roster: Vec<(AgentId, &'static str)>,
}

impl Supervisor {
    pub fn new(capabilities: Capabilities, llm_routing: bool, fact_check: bool) -> Self {
        Self {
            capabilities,
            llm_routing,
            fact_check,
            roster: Vec::new(),
        }
    }

    /// Agents (and what they do) described to the model when it routes.
    pub fn with_roster(mut self, roster: Vec<(AgentId, &'static str)>) -> Self {
        self.roster = roster;
        self
    }

    pub async fn decide(&self, state: &SharedState) -> NextAgent {
        let progress = state.progress();
        let rule = route(progress, self.fact_check);

        if !self.llm_routing || !self.capabilities.llm_available() {
            return rule;
        }

        match self.ask_model(state, progress).await {
            Some(NextAgent::Finish) if rule != NextAgent::Finish => {
                debug!(%rule, "model asked to finish early; following rule");
                rule
            }
            Some(next) if !admissible(next, progress) => {
                debug!(%next, %rule, "model picked a finished or unready stage; following rule");
                rule
            }
            Some(next) => next,
            None => rule,
        }
    }

    fn prompt(&self, state: &SharedState, progress: Progress) -> Prompt {
        let mut system = String::from("You supervise a team of news analysis agents.\n\n");
        if !self.roster.is_empty() {
            system.push_str("Available agents:\n");
            for (agent, description) in &self.roster {
                let _ = writeln!(system, "- {agent}: {description}");
            }
            system.push('\n');
        }
        let _ = write!(
            system,
            "Current state:\n\
             - Topic: {}\n\
             - Articles found: {}\n\
             - Analysis completed: {}\n\
             - Fact check completed: {}\n\
             - Report generated: {}\n\n\
             Reply with exactly one of: {}.",
            state.topic,
            state.news_articles.len(),
            progress.has_analysis,
            progress.has_fact_check,
            progress.has_report,
            NextAgent::VOCABULARY.map(|next| next.as_str()).join(", "),
        );
        Prompt::new(system, "What should be the next step?")
    }

    async fn ask_model(&self, state: &SharedState, progress: Progress) -> Option<NextAgent> {
        let prompt = self.prompt(state, progress);

        match self.capabilities.generate(&prompt).await {
            Ok(answer) => match answer.parse::<NextAgent>() {
                Ok(next) => Some(next),
                Err(err) => {
                    warn!(error = %err, "unrecognized routing answer; following rule");
                    None
                }
            },
            Err(err) => {
                warn!(error = %err, "routing call failed; following rule");
                None
            }
        }
    }
}

/// Whether `next` may run now: its own output must be missing and the
/// output it reads must exist. Each stage writes its fields once.
pub fn admissible(next: NextAgent, progress: Progress) -> bool {
    match next {
        NextAgent::Researcher => !progress.has_articles,
        NextAgent::Analyzer => progress.has_articles && !progress.has_analysis,
        NextAgent::FactChecker => {
            progress.has_articles && !progress.has_fact_check && !progress.has_report
        }
        NextAgent::ReportGenerator => {
            !progress.has_report && (progress.has_analysis || progress.has_fact_check)
        }
        NextAgent::Finish => true,
    }
}

/// Deterministic routing over the state's completeness flags.
pub fn route(progress: Progress, fact_check: bool) -> NextAgent {
    if !progress.has_articles {
        NextAgent::Researcher
    } else if !progress.has_analysis {
        NextAgent::Analyzer
    } else if fact_check && !progress.has_fact_check {
        NextAgent::FactChecker
    } else if !progress.has_report {
        NextAgent::ReportGenerator
    } else {
        NextAgent::Finish
    }
}

#[async_trait]
impl Agent for Supervisor {
    fn id(&self) -> AgentId {
        AgentId::Supervisor
    }

    fn description(&self) -> &'static str {
        "Orchestrates the multi-agent workflow for news analysis"
    }

    #[instrument(name = "agent.supervisor", skip(self, state))]
    async fn execute(&self, mut state: SharedState) -> SharedState {
        let next = self.decide(&state).await;
        info!(next = %next, "routing decision");

        state.next_agent = Some(next);
        state.record(
            AgentId::Supervisor,
            format!("Supervisor decided next agent: {next}"),
        );
        state
    }
}
