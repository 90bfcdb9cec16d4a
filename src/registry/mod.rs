mod adapter_registry;
mod agent_registry;
mod health;

#[cfg(test)]
mod tests;

pub use adapter_registry::{AdapterRegistry, OperationGuard};
pub use agent_registry::AgentRegistry;
pub use health::{CircuitBreakerConfig, CircuitState, HealthTracker};
