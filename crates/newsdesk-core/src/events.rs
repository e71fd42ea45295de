//! Progress events for observers of a pipeline run.
//!
//! The orchestrator emits one `StepStarted`/`StepFinished` pair per agent
//! execution and a final `RunFinished`, so a dashboard can follow along.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::result::RunStatus;
use crate::state::AgentId;

/// Unique identifier for an event
pub type EventId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    StepStarted {
        event_id: EventId,
        timestamp: u64,
        run_id: String,
        step: usize,
        agent: AgentId,
    },
    StepFinished {
        event_id: EventId,
        timestamp: u64,
        run_id: String,
        step: usize,
        agent: AgentId,
        duration_ms: u64,
        message: String,
    },
    RunFinished {
        event_id: EventId,
        timestamp: u64,
        run_id: String,
        status: RunStatus,
        steps: usize,
    },
}

impl WorkflowEvent {
    pub fn event_id(&self) -> &str {
        match self {
            WorkflowEvent::StepStarted { event_id, .. } => event_id,
            WorkflowEvent::StepFinished { event_id, .. } => event_id,
            WorkflowEvent::RunFinished { event_id, .. } => event_id,
        }
    }

    pub fn run_id(&self) -> &str {
        match self {
            WorkflowEvent::StepStarted { run_id, .. } => run_id,
            WorkflowEvent::StepFinished { run_id, .. } => run_id,
            WorkflowEvent::RunFinished { run_id, .. } => run_id,
        }
    }
}

/// Sending half of the event bus. Cloning shares the channel; a collector
/// created with [`EventCollector::disabled`] drops everything.
#[derive(Clone, Default)]
pub struct EventCollector {
    sender: Option<mpsc::UnboundedSender<WorkflowEvent>>,
}

impl EventCollector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<WorkflowEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn emit_step_started(&self, run_id: &str, step: usize, agent: AgentId) {
        self.send(WorkflowEvent::StepStarted {
            event_id: generate_event_id(),
            timestamp: current_timestamp(),
            run_id: run_id.to_string(),
            step,
            agent,
        });
    }

    pub fn emit_step_finished(
        &self,
        run_id: &str,
        step: usize,
        agent: AgentId,
        duration_ms: u64,
        message: String,
    ) {
        self.send(WorkflowEvent::StepFinished {
            event_id: generate_event_id(),
            timestamp: current_timestamp(),
            run_id: run_id.to_string(),
            step,
            agent,
            duration_ms,
            message,
        });
    }

    pub fn emit_run_finished(&self, run_id: &str, status: RunStatus, steps: usize) {
        self.send(WorkflowEvent::RunFinished {
            event_id: generate_event_id(),
            timestamp: current_timestamp(),
            run_id: run_id.to_string(),
            status,
            steps,
        });
    }

    fn send(&self, event: WorkflowEvent) {
        let Some(sender) = &self.sender else {
            return;
        };
        if let Err(e) = sender.send(event) {
            tracing::debug!(error = %e, "event receiver dropped");
        }
    }
}

fn generate_event_id() -> EventId {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("evt_{}", id)
}

/// Current Unix timestamp in milliseconds
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
