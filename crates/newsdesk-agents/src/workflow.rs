//! The orchestrator: wires the agents into a supervisor-routed `graph_flow`
//! graph and drives one run per topic to a [`RunResult`].

use std::any::Any;
use std::sync::Arc;

use graph_flow::{
    ExecutionStatus, FlowRunner, Graph, GraphBuilder, InMemorySessionStorage, Session,
    SessionStorage,
};
use newsdesk_core::{
    AgentId, Capabilities, Config, EventCollector, NewsdeskError, RunResult, RunStatus,
    SharedState, capabilities_from_config, metrics,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::agent::Agent;
use crate::analyzer::ContentAnalyzer;
use crate::fact_checker::FactChecker;
use crate::report::ReportGenerator;
use crate::researcher::{NewsResearcher, ResearchSettings};
use crate::supervisor::Supervisor;
use crate::tasks::{
    AgentTask, RUN_ID_KEY, STATE_KEY, STEP_LIMIT_KEY, STEPS_KEY, SupervisorTask, load_state,
};

/// Knobs that shape a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSettings {
    pub max_steps: usize,
    pub llm_routing: bool,
    pub fact_check: bool,
    pub research: ResearchSettings,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            max_steps: 12,
            llm_routing: true,
            fact_check: false,
            research: ResearchSettings::default(),
        }
    }
}

impl WorkflowSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_steps: config.workflow.max_steps,
            llm_routing: config.workflow.llm_routing,
            fact_check: config.workflow.fact_check,
            research: ResearchSettings {
                max_articles: config.workflow.max_articles,
                results_per_query: config.search.max_results,
                include_domains: config.search.include_domains.clone(),
            },
        }
    }

    fn with_options(mut self, options: &RunOptions) -> Self {
        if let Some(max_articles) = options.max_articles {
            self.research.max_articles = max_articles.max(1);
        }
        if let Some(fact_check) = options.fact_check {
            self.fact_check = fact_check;
        }
        self
    }
}

/// Per-run overrides of the configured settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    pub max_articles: Option<usize>,
    pub fact_check: Option<bool>,
}

impl RunOptions {
    pub fn with_max_articles(mut self, max_articles: usize) -> Self {
        self.max_articles = Some(max_articles);
        self
    }

    pub fn with_fact_check(mut self, fact_check: bool) -> Self {
        self.fact_check = Some(fact_check);
        self
    }
}

pub struct Orchestrator {
    capabilities: Capabilities,
    settings: WorkflowSettings,
    events: EventCollector,
    overrides: Vec<Arc<dyn Agent>>,
}

struct Outcome {
    state: SharedState,
    status: RunStatus,
    steps: usize,
}

impl Orchestrator {
    pub fn new(capabilities: Capabilities, settings: WorkflowSettings) -> Self {
        Self {
            capabilities,
            settings,
            events: EventCollector::disabled(),
            overrides: Vec::new(),
        }
    }

    /// Build capabilities and settings from a loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            capabilities_from_config(config),
            WorkflowSettings::from_config(config),
        )
    }

    pub fn with_events(mut self, events: EventCollector) -> Self {
        self.events = events;
        self
    }

    /// Replace the built-in agent that has the same [`Agent::id`].
    pub fn with_agent(mut self, agent: Arc<dyn Agent>) -> Self {
        self.overrides.retain(|existing| existing.id() != agent.id());
        self.overrides.push(agent);
        self
    }

    pub async fn run(&self, topic: &str) -> RunResult {
        self.run_with_options(topic, RunOptions::default()).await
    }

    /// Run the pipeline for `topic`. Never fails: orchestration errors and
    /// agent panics come back as a `failed` result.
    #[instrument(name = "workflow.run", skip(self, options))]
    pub async fn run_with_options(&self, topic: &str, options: RunOptions) -> RunResult {
        let run_id = Uuid::new_v4().to_string();

        let result = if topic.trim().is_empty() {
            warn!("refusing to run without a topic");
            RunResult::failed(topic, "topic must not be empty")
        } else {
            let settings = self.settings.clone().with_options(&options);
            let graph = self.build_graph(&settings);
            let handle = tokio::spawn(drive(
                graph,
                SharedState::new(topic),
                run_id.clone(),
                settings.max_steps,
            ));

            match handle.await {
                Ok(Ok(outcome)) => RunResult::from_state(outcome.state, outcome.status, outcome.steps),
                Ok(Err(err)) => {
                    error!(error = %err, "workflow failed");
                    RunResult::failed(topic, err)
                }
                Err(join_err) => {
                    let reason = if join_err.is_panic() {
                        format!("agent panicked: {}", panic_message(join_err.into_panic()))
                    } else {
                        "workflow task was cancelled".to_string()
                    };
                    error!(%reason, "workflow aborted");
                    RunResult::failed(topic, reason)
                }
            }
        };

        info!(status = %result.status, steps = result.steps, articles = result.article_count, "run finished");
        metrics::record_run(result.status.as_str(), result.steps);
        self.events.emit_run_finished(&run_id, result.status, result.steps);
        result
    }

    fn agent(&self, id: AgentId, built_in: impl FnOnce() -> Arc<dyn Agent>) -> Arc<dyn Agent> {
        self.overrides
            .iter()
            .find(|agent| agent.id() == id)
            .cloned()
            .unwrap_or_else(built_in)
    }

    fn build_graph(&self, settings: &WorkflowSettings) -> Arc<Graph> {
        let caps = &self.capabilities;
        let workers = [
            self.agent(AgentId::Researcher, || {
                Arc::new(NewsResearcher::new(caps.clone(), settings.research.clone()))
            }),
            self.agent(AgentId::Analyzer, || Arc::new(ContentAnalyzer::new(caps.clone()))),
            self.agent(AgentId::FactChecker, || Arc::new(FactChecker::new(caps.clone()))),
            self.agent(AgentId::ReportGenerator, || {
                Arc::new(ReportGenerator::new(caps.clone()))
            }),
        ];
        let roster = workers
            .iter()
            .map(|worker| (worker.id(), worker.description()))
            .collect();
        let supervisor = self.agent(AgentId::Supervisor, || {
            Arc::new(
                Supervisor::new(caps.clone(), settings.llm_routing, settings.fact_check)
                    .with_roster(roster),
            )
        });

        let supervisor_task = Arc::new(SupervisorTask::new(supervisor, settings.max_steps));
        let supervisor_id = AgentId::Supervisor.task_id();

        let mut builder = GraphBuilder::new("newsdesk_workflow").add_task(supervisor_task);
        for worker in workers {
            let task_id = worker.id().task_id();
            builder = builder
                .add_task(Arc::new(AgentTask::new(worker, self.events.clone())))
                .add_edge(task_id, supervisor_id);
        }

        Arc::new(builder.set_start_task(supervisor_id).build())
    }
}

async fn drive(
    graph: Arc<Graph>,
    state: SharedState,
    run_id: String,
    max_steps: usize,
) -> Result<Outcome, NewsdeskError> {
    let storage = Arc::new(InMemorySessionStorage::new());
    let runner = FlowRunner::new(graph, storage.clone());

    let session = Session::new_from_task(run_id.clone(), AgentId::Supervisor.task_id());
    session.context.set(STATE_KEY, &state).await;
    session.context.set(RUN_ID_KEY, run_id.clone()).await;
    storage
        .save(session)
        .await
        .map_err(|err| orchestration(format!("failed to persist session: {err}")))?;

    let max_passes = pass_limit(max_steps);
    let mut passes = 0;
    let mut exhausted = false;
    loop {
        if passes >= max_passes {
            warn!(passes, "runner pass limit reached");
            exhausted = true;
            break;
        }
        passes += 1;

        let result = runner
            .run(&run_id)
            .await
            .map_err(|err| orchestration(format!("graph execution failure: {err}")))?;

        match result.status {
            ExecutionStatus::Completed => break,
            ExecutionStatus::Error(message) => return Err(orchestration(message)),
            _ => continue,
        }
    }

    let session = storage
        .get(&run_id)
        .await
        .map_err(|err| orchestration(format!("failed to reload session: {err}")))?
        .ok_or_else(|| orchestration("session missing after execution"))?;

    let state = load_state(&session.context).await;
    let steps: usize = session.context.get(STEPS_KEY).await.unwrap_or(0);
    let limited: bool = session.context.get(STEP_LIMIT_KEY).await.unwrap_or(false);
    let status = if exhausted || limited {
        RunStatus::StepLimitReached
    } else {
        RunStatus::Completed
    };

    Ok(Outcome {
        state,
        status,
        steps,
    })
}

/// One supervisor pass per agent step, plus the final decision.
fn pass_limit(max_steps: usize) -> usize {
    max_steps.saturating_mul(2).saturating_add(2)
}

fn orchestration(message: impl Into<String>) -> NewsdeskError {
    NewsdeskError::Orchestration(message.into())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
