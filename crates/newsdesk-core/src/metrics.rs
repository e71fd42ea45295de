use once_cell::sync::OnceCell;
use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::{KeyValue, global};

struct PipelineMetrics {
    steps: Counter<u64>,
    step_duration_ms: Histogram<f64>,
    runs: Counter<u64>,
}

static METRICS: OnceCell<PipelineMetrics> = OnceCell::new();

fn handles() -> &'static PipelineMetrics {
    METRICS.get_or_init(|| {
        let meter: Meter = global::meter("newsdesk.pipeline");
        PipelineMetrics {
            steps: meter
                .u64_counter("agent_steps_total")
                .with_description("Agent executions by agent")
                .init(),
            step_duration_ms: meter
                .f64_histogram("agent_step_duration_ms")
                .with_description("Agent execution time in milliseconds")
                .init(),
            runs: meter
                .u64_counter("pipeline_runs_total")
                .with_description("Completed pipeline runs by final status")
                .init(),
        }
    })
}

/// Record one agent execution (no-op if no meter provider is installed).
pub fn record_agent_step(agent: &str, duration_ms: u64) {
    let metrics = handles();
    let attrs = [KeyValue::new("agent", agent.to_string())];
    metrics.steps.add(1, &attrs);
    metrics.step_duration_ms.record(duration_ms as f64, &attrs);
}

/// Record the end of a run with its status label and step count.
pub fn record_run(status: &str, steps: usize) {
    let attrs = [
        KeyValue::new("status", status.to_string()),
        KeyValue::new("steps", steps as i64),
    ];
    handles().runs.add(1, &attrs);
}
