//! `graph_flow` adapters around the agents.
//!
//! The run state lives in the session context under [`STATE_KEY`] and is
//! normalized on every read. The supervisor task jumps to the agent it picked;
//! every agent task continues along its edge back to the supervisor.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use graph_flow::{Context, NextAction, Task, TaskResult};
use newsdesk_core::{AgentId, EventCollector, NextAgent, SharedState, metrics};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::agent::Agent;

pub const STATE_KEY: &str = "state";
pub const STEPS_KEY: &str = "workflow.steps";
pub const RUN_ID_KEY: &str = "workflow.run_id";
pub const STEP_LIMIT_KEY: &str = "workflow.step_limit_reached";

pub async fn load_state(context: &Context) -> SharedState {
    let raw: Value = context.get(STATE_KEY).await.unwrap_or(Value::Null);
    SharedState::normalize(raw)
}

pub async fn store_state(context: &Context, state: &SharedState) {
    context.set(STATE_KEY, state).await;
}

async fn steps_taken(context: &Context) -> usize {
    context.get(STEPS_KEY).await.unwrap_or(0)
}

async fn run_id(context: &Context) -> String {
    context.get(RUN_ID_KEY).await.unwrap_or_default()
}

/// Runs one agent as a graph task and counts it as a step.
pub struct AgentTask {
    agent: Arc<dyn Agent>,
    events: EventCollector,
}

impl AgentTask {
    pub fn new(agent: Arc<dyn Agent>, events: EventCollector) -> Self {
        Self { agent, events }
    }
}

#[async_trait]
impl Task for AgentTask {
    fn id(&self) -> &str {
        self.agent.id().task_id()
    }

    #[instrument(name = "task.agent", skip(self, context), fields(agent = %self.agent.id()))]
    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let agent = self.agent.id();
        let step = steps_taken(&context).await + 1;
        let run_id = run_id(&context).await;
        let state = load_state(&context).await;

        self.events.emit_step_started(&run_id, step, agent);
        let started = Instant::now();
        let state = self.agent.execute(state).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let message = state
            .messages
            .last()
            .map(|message| message.content.clone())
            .unwrap_or_default();

        store_state(&context, &state).await;
        context.set(STEPS_KEY, step).await;

        metrics::record_agent_step(agent.as_str(), duration_ms);
        self.events
            .emit_step_finished(&run_id, step, agent, duration_ms, message.clone());
        info!(step, duration_ms, "agent step finished");

        Ok(TaskResult::new(Some(message), NextAction::Continue))
    }
}

/// Routes between agents and stops the run once the step budget is spent.
pub struct SupervisorTask {
    supervisor: Arc<dyn Agent>,
    max_steps: usize,
}

impl SupervisorTask {
    pub fn new(supervisor: Arc<dyn Agent>, max_steps: usize) -> Self {
        Self {
            supervisor,
            max_steps,
        }
    }
}

#[async_trait]
impl Task for SupervisorTask {
    fn id(&self) -> &str {
        AgentId::Supervisor.task_id()
    }

    #[instrument(name = "task.supervisor", skip(self, context))]
    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let steps = steps_taken(&context).await;
        let mut state = load_state(&context).await;

        if steps >= self.max_steps {
            warn!(steps, max_steps = self.max_steps, "step limit reached; stopping workflow");
            let message = format!("Step limit of {} reached; stopping workflow", self.max_steps);
            state.append_message(message.clone(), Some(AgentId::System));
            store_state(&context, &state).await;
            context.set(STEP_LIMIT_KEY, true).await;
            return Ok(TaskResult::new(Some(message), NextAction::End));
        }

        let state = self.supervisor.execute(state).await;
        let next = state.next_agent.unwrap_or(NextAgent::Finish);
        store_state(&context, &state).await;

        match next.agent() {
            Some(agent) => {
                debug!(steps, next = %agent, "dispatching");
                Ok(TaskResult::new(
                    Some(format!("Supervisor decided next agent: {next}")),
                    NextAction::GoTo(agent.task_id().to_string()),
                ))
            }
            None => {
                info!(steps, "workflow finished");
                Ok(TaskResult::new(
                    Some("Workflow finished".to_string()),
                    NextAction::End,
                ))
            }
        }
    }
}
