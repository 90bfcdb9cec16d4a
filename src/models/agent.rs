use super::capability::Capability;
use crate::error::{OrchestratorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    LendingAgent,
    LiquidityAgent,
    PortfolioAgent,
    RiskAgent,
    AnalysisAgent,
}

/// Selection strategy `AgentRegistry::find_best` scores candidates with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalancingStrategy {
    RoundRobin,
    LeastConnections,
    CapabilityBased,
}

impl Default for LoadBalancingStrategy {
    fn default() -> Self {
        LoadBalancingStrategy::CapabilityBased
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Busy,
    Maintenance,
    Offline,
    Error,
}

impl AgentStatus {
    /// Spec section 4.5: `idle <-> busy`, `idle|busy -> maintenance`, any ->
    /// `error` on health failure, `error -> idle` on a successful probe, any
    /// -> `offline` on manual stop.
    pub fn can_transition_to(self, next: AgentStatus) -> bool {
        use AgentStatus::*;
        match (self, next) {
            (_, Offline) => true,
            (_, Error) => true,
            (Error, Idle) => true,
            (Idle, Busy) | (Busy, Idle) => true,
            (Idle, Maintenance) | (Busy, Maintenance) => true,
            (Maintenance, Idle) => true,
            (same, other) if same == other => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: String,
    pub agent_type: AgentType,
    pub name: String,
    pub version: String,
    pub capabilities: Vec<Capability>,
    pub status: AgentStatus,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl AgentRecord {
    pub fn capability(&self, action: &str) -> Option<&Capability> {
        self.capabilities.iter().find(|c| c.action == action)
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self.status, AgentStatus::Idle | AgentStatus::Busy)
    }

    pub fn apply_transition(&mut self, next: AgentStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(OrchestratorError::Fatal(format!(
                "agent {} cannot transition {:?} -> {:?}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }
}

/// Running load metrics kept per agent, driving `find_best`'s weighted
/// score. Updated by the orchestrator pipeline via
/// `AgentRegistry::update_load_metrics`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LoadMetrics {
    pub active_tasks: u32,
    pub completed_tasks: u64,
    pub failed_tasks: u64,
    pub total_latency_ms: u64,
}

impl LoadMetrics {
    pub fn error_rate(&self) -> f64 {
        let total = self.completed_tasks + self.failed_tasks;
        if total == 0 {
            0.0
        } else {
            self.failed_tasks as f64 / total as f64
        }
    }

    pub fn average_latency_ms(&self) -> f64 {
        if self.completed_tasks == 0 {
            0.0
        } else {
            self.total_latency_ms as f64 / self.completed_tasks as f64
        }
    }
}

/// A delta applied atomically to an agent's `LoadMetrics`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadMetricsDelta {
    pub active_tasks_delta: i64,
    pub completed: bool,
    pub failed: bool,
    pub latency_sample_ms: Option<u64>,
}

impl LoadMetricsDelta {
    pub fn started() -> Self {
        Self {
            active_tasks_delta: 1,
            ..Default::default()
        }
    }

    pub fn completed(latency_ms: u64) -> Self {
        Self {
            active_tasks_delta: -1,
            completed: true,
            latency_sample_ms: Some(latency_ms),
            ..Default::default()
        }
    }

    pub fn failed() -> Self {
        Self {
            active_tasks_delta: -1,
            failed: true,
            ..Default::default()
        }
    }
}
