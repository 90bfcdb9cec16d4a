use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// The seven closed intent families the orchestrator knows how to route.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    Lending,
    Liquidity,
    Portfolio,
    Trading,
    Analysis,
    Info,
    Risk,
}

/// Ordered low to urgent; `Ord` gives urgent the highest rank, which is what
/// the router's priority queues (max-heap) and the task queue (descending
/// sort) both want.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_i32(self) -> i32 {
        match self {
            Priority::Low => 0,
            Priority::Medium => 1,
            Priority::High => 2,
            Priority::Urgent => 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentContext {
    pub session_id: String,
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub previous_intents: Vec<String>,
}

impl IntentContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            wallet_address: None,
            previous_intents: Vec::new(),
        }
    }

    pub fn with_wallet(mut self, wallet_address: impl Into<String>) -> Self {
        self.wallet_address = Some(wallet_address.into());
        self
    }
}

/// A structured user intent. Immutable once created — nothing in the
/// pipeline mutates an `Intent` after `Intent::new` returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub id: String,
    pub intent_type: IntentType,
    pub action: String,
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
    pub context: IntentContext,
    pub priority: Priority,
    pub timestamp: DateTime<Utc>,
}

impl Intent {
    pub fn new(
        intent_type: IntentType,
        action: impl Into<String>,
        parameters: HashMap<String, serde_json::Value>,
        context: IntentContext,
        priority: Priority,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            intent_type,
            action: action.into(),
            parameters,
            context,
            priority,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

/// Output of `Orchestrator::analyse_intent`. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzedIntent {
    pub intent: Intent,
    pub confidence: f64,
    pub required_actions: Vec<String>,
    pub estimated_complexity: Complexity,
    pub risks: Vec<String>,
}
