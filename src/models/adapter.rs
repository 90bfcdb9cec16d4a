use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AdapterFamily {
    ActionKit,
    Analytics,
    Realtime,
}

impl AdapterFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            AdapterFamily::ActionKit => "actionKit",
            AdapterFamily::Analytics => "analytics",
            AdapterFamily::Realtime => "realtime",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "actionKit" => Some(AdapterFamily::ActionKit),
            "analytics" => Some(AdapterFamily::Analytics),
            "realtime" => Some(AdapterFamily::Realtime),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdapterStatus {
    Active,
    Inactive,
    Error,
}

/// Snapshot of one adapter instance, returned by registry read methods.
/// The registry is the only writer; everyone else sees a clone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterInstanceRecord {
    pub id: String,
    pub family: AdapterFamily,
    pub priority: i32,
    pub capabilities: Vec<String>,
    pub status: AdapterStatus,
    pub is_healthy: bool,
    pub last_used: DateTime<Utc>,
    pub active_operations: u32,
}
