//! Newsdesk core: the shared run state, the capability seams agents talk to,
//! and the ambient plumbing (configuration, telemetry, metrics, events).

pub mod capability;
pub mod clients;
mod config;
mod error;
pub mod events;
pub mod metrics;
mod result;
mod security;
pub mod state;
mod telemetry;
mod trace;

pub use capability::{
    Capabilities, FetchedPage, NewsSearch, PageFetcher, Prompt, SearchHit, SearchRequest,
    TextGenerator, Unavailable, truncate_preview,
};
pub use clients::capabilities_from_config;
pub use config::{Config, ConfigLoader, LlmConfig, LoggingConfig, SearchConfig, WorkflowConfig};
pub use error::{CapabilityError, NewsdeskError};
pub use events::{EventCollector, WorkflowEvent};
pub use result::{NO_REPORT, RunResult, RunStatus};
pub use security::{SecretValue, require_env};
pub use state::{
    AgentId, AnalysisResults, Article, ArticleAnalysis, ArticleAssessment, ContentAnalysis,
    FactCheckResults, Message, NextAgent, Progress, Reliability, Sentiment,
    SentimentAssessment, SentimentCounts, SharedState, UnknownAgent,
};
pub use telemetry::{TelemetryOptions, init_telemetry};
pub use trace::{TraceStep, TraceSummary};
