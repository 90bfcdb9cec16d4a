use crate::models::{AdapterFamily, AgentStatus, Priority};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

/// Lifecycle notifications the pipeline fans out to listeners. Listeners
/// never see these synchronously with the pipeline step that raised them —
/// see `EventBus`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    IntentReceived {
        intent_id: String,
        priority: Priority,
    },
    TaskCreated {
        task_id: String,
        intent_id: String,
        agent_id: String,
    },
    TaskStarted {
        task_id: String,
        agent_id: String,
    },
    TaskCompleted {
        task_id: String,
        duration_ms: u64,
    },
    TaskFailed {
        task_id: String,
        error_code: String,
    },
    AdapterError {
        adapter_id: String,
        family: AdapterFamily,
        error_code: String,
    },
    AgentStatusChanged {
        agent_id: String,
        from: AgentStatus,
        to: AgentStatus,
    },
    SessionExpired {
        session_id: String,
    },
    ErrorOccurred {
        code: String,
        message: String,
    },
    AdaptersInitialized {
        families: Vec<String>,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::IntentReceived { .. } => "intent_received",
            Event::TaskCreated { .. } => "task_created",
            Event::TaskStarted { .. } => "task_started",
            Event::TaskCompleted { .. } => "task_completed",
            Event::TaskFailed { .. } => "task_failed",
            Event::AdapterError { .. } => "adapter_error",
            Event::AgentStatusChanged { .. } => "agent_status_changed",
            Event::SessionExpired { .. } => "session_expired",
            Event::ErrorOccurred { .. } => "error_occurred",
            Event::AdaptersInitialized { .. } => "adapters_initialized",
        }
    }

    pub fn payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

pub type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

/// Fire-and-forget pub/sub used to decouple the pipeline from anything that
/// watches it (metrics, audit logs, a future UI). Emission never blocks the
/// caller and a panicking or slow listener can never stall a task: events
/// are handed to a background task over an unbounded channel and dispatched
/// there, one at a time, isolated with `catch_unwind`.
pub struct EventBus {
    listeners: Arc<RwLock<Vec<Listener>>>,
    sender: mpsc::UnboundedSender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        let listeners: Arc<RwLock<Vec<Listener>>> = Arc::new(RwLock::new(Vec::new()));
        let (sender, mut receiver) = mpsc::unbounded_channel::<Event>();

        let worker_listeners = Arc::clone(&listeners);
        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                let listeners = worker_listeners.read().await;
                for listener in listeners.iter() {
                    let listener = Arc::clone(listener);
                    let event = event.clone();
                    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        listener(&event);
                    }));
                    if outcome.is_err() {
                        warn!(event = event.name(), "event listener panicked");
                    }
                }
                debug!(event = event.name(), "event dispatched");
            }
        });

        Self { listeners, sender }
    }

    pub async fn subscribe(&self, listener: Listener) {
        self.listeners.write().await.push(listener);
    }

    /// Never fails the caller: a full or closed channel only drops the
    /// event, it never propagates back into the pipeline that raised it.
    pub fn emit(&self, event: Event) {
        if self.sender.send(event).is_err() {
            warn!("event bus receiver dropped, event lost");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            listeners: Arc::clone(&self.listeners),
            sender: self.sender.clone(),
        }
    }
}
