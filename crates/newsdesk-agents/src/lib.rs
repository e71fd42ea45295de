//! Newsdesk agents and the supervisor-routed workflow that drives them.

pub mod agent;
pub mod analyzer;
pub mod fact_checker;
pub mod report;
pub mod researcher;
pub mod supervisor;
pub mod tasks;
mod workflow;

#[cfg(test)]
mod testing;

pub use agent::Agent;
pub use analyzer::{ContentAnalyzer, extract_entities};
pub use fact_checker::{FactChecker, red_flags, score_assessment};
pub use report::ReportGenerator;
pub use researcher::{NewsResearcher, ResearchSettings};
pub use supervisor::{Supervisor, admissible, route};
pub use tasks::{AgentTask, SupervisorTask};
pub use workflow::{Orchestrator, RunOptions, WorkflowSettings};
