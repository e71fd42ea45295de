//! The contract every pipeline stage implements.

use async_trait::async_trait;
use newsdesk_core::{AgentId, SharedState};

/// A pipeline stage.
///
/// `execute` takes the state by value and hands back the updated state. It is
/// infallible: capability failures are absorbed into fallback values, and the
/// returned state always carries exactly one new message attributed to
/// [`Agent::id`].
#[async_trait]
pub trait Agent: Send + Sync {
    fn id(&self) -> AgentId;

    fn description(&self) -> &'static str;

    async fn execute(&self, state: SharedState) -> SharedState;
}
