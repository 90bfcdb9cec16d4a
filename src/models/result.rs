use crate::error::OrchestratorError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Success,
    Failure,
    PartialSuccess,
}

/// The serializable half of `OrchestratorError`: stable code plus message,
/// detached from the Rust error type so it can travel in a `TaskResult`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskError {
    pub code: String,
    pub message: String,
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&OrchestratorError> for TaskError {
    fn from(err: &OrchestratorError) -> Self {
        let details = match err {
            OrchestratorError::UnsupportedIntent { supported, .. } => {
                Some(serde_json::json!({ "supportedActions": supported }))
            }
            _ => None,
        };
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            details,
        }
    }
}

impl From<OrchestratorError> for TaskError {
    fn from(err: OrchestratorError) -> Self {
        TaskError::from(&err)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub status: ResultStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
    pub duration_ms: u64,
    pub completed_at: DateTime<Utc>,
}

impl TaskResult {
    pub fn success(task_id: impl Into<String>, data: serde_json::Value, duration_ms: u64) -> Self {
        Self {
            task_id: task_id.into(),
            status: ResultStatus::Success,
            data: Some(data),
            error: None,
            duration_ms,
            completed_at: Utc::now(),
        }
    }

    pub fn failure(task_id: impl Into<String>, error: TaskError, duration_ms: u64) -> Self {
        Self {
            task_id: task_id.into(),
            status: ResultStatus::Failure,
            data: None,
            error: Some(error),
            duration_ms,
            completed_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, ResultStatus::Success)
    }
}
