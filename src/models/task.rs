use crate::error::{OrchestratorError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Spec section 4.5: `pending -> running -> {completed|failed}`;
    /// `pending -> cancelled` direct. No other transitions.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Pending, Cancelled)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub intent_id: String,
    pub agent_id: String,
    pub action: String,
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
    pub status: TaskStatus,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl Task {
    pub fn new(
        intent_id: impl Into<String>,
        agent_id: impl Into<String>,
        action: impl Into<String>,
        parameters: HashMap<String, serde_json::Value>,
        priority: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            intent_id: intent_id.into(),
            agent_id: agent_id.into(),
            action: action.into(),
            parameters,
            status: TaskStatus::Pending,
            priority,
            created_at: Utc::now(),
            dependencies: Vec::new(),
        }
    }

    pub fn transition(&mut self, next: TaskStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(OrchestratorError::Fatal(format!(
                "task {} cannot transition {:?} -> {:?}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }
}
