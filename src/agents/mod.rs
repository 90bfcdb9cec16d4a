use crate::error::Result;
use crate::models::{AgentType, Capability, Task, TaskResult};
use async_trait::async_trait;

/// Behavior every registered agent exposes to the router. Implementations
/// live outside this crate (this exercise only defines the orchestration
/// core); `MockAgent` below exists for tests.
#[async_trait]
pub trait Agent: Send + Sync {
    fn agent_type(&self) -> AgentType;
    fn name(&self) -> String;
    fn capabilities(&self) -> Vec<Capability>;

    fn can_handle(&self, action: &str) -> bool {
        self.capabilities().iter().any(|c| c.action == action)
    }

    async fn execute(&self, task: Task) -> Result<TaskResult>;

    /// Liveness probe the registry's health monitor sends as a
    /// `health_check` message (spec section 4.1). Default implementation
    /// assumes the agent is reachable; override for a real ping.
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
