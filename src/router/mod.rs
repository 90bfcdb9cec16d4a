mod gate;
mod priority_queue;
mod retry;
mod rules;

#[cfg(test)]
mod tests;

pub use gate::ConcurrencyGate;
pub use priority_queue::PriorityQueue;
pub use retry::{with_retry, RetryPolicy};
pub use rules::{
    actions_match, adapter_operation_allowed, agent_type_for, canonicalize, closed_actions_for,
    enrich_with_adapter_operations, match_action, operations_for,
};

use crate::agents::Agent;
use crate::config::RouterConfig;
use crate::error::{OrchestratorError, Result};
use crate::events::{Event, EventBus};
use crate::models::{AdapterFamily, LoadMetricsDelta, Message, MessageType, Task, TaskResult};
use crate::registry::{AdapterRegistry, AgentRegistry};
use chrono::Utc;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// A registered default handler for a `MessageType`, or the handler a
/// routing rule overrides it with.
pub type HandlerFn =
    Arc<dyn Fn(Message) -> Pin<Box<dyn Future<Output = Result<serde_json::Value>> + Send>> + Send + Sync>;

/// A `(messageType, priority)`-unique override scanned in descending
/// priority before falling back to the type's default handler (spec
/// invariant 6, section 4.2).
pub struct RoutingRule {
    pub message_type: MessageType,
    pub priority: i32,
    pub condition: Arc<dyn Fn(&Message) -> bool + Send + Sync>,
    pub handler: HandlerFn,
}

/// Routes messages to agents and dispatches adapter operations. Holds
/// read-only registry handles (spec Open Question 4): it queries agent and
/// adapter state but never writes status directly, only through the
/// registries' own mutation methods so there is one writer of truth.
pub struct MessageRouter {
    queue: PriorityQueue,
    adapter_queue: PriorityQueue,
    gate: ConcurrencyGate,
    adapter_gate: ConcurrencyGate,
    retry_policy: RetryPolicy,
    message_timeout: Duration,
    adapter_timeout: Duration,
    enable_parallel_execution: bool,
    agents: Arc<AgentRegistry>,
    adapters: Arc<AdapterRegistry>,
    events: EventBus,
    default_handlers: RwLock<HashMap<MessageType, HandlerFn>>,
    routing_rules: RwLock<Vec<RoutingRule>>,
}

impl MessageRouter {
    pub fn new(
        config: RouterConfig,
        agents: Arc<AgentRegistry>,
        adapters: Arc<AdapterRegistry>,
        events: EventBus,
    ) -> Self {
        Self {
            queue: PriorityQueue::new(config.max_message_queue_size),
            adapter_queue: PriorityQueue::new(config.max_adapter_queue_size),
            gate: ConcurrencyGate::new(config.max_concurrent_messages),
            adapter_gate: ConcurrencyGate::new(config.adapter_routing.max_concurrent_adapter_calls),
            retry_policy: RetryPolicy::new(
                config.default_retry_attempts,
                config.retry_base_delay_ms,
                config.retry_max_backoff_ms,
            )
            .with_backoff_multiplier(config.backoff_multiplier),
            message_timeout: Duration::from_millis(config.message_timeout_ms),
            adapter_timeout: Duration::from_millis(config.adapter_routing.adapter_timeout_ms),
            enable_parallel_execution: config.enable_parallel_execution,
            agents,
            adapters,
            events,
            default_handlers: RwLock::new(HashMap::new()),
            routing_rules: RwLock::new(Vec::new()),
        }
    }

    /// Applies a configured `messageRetryPolicy.retryableErrors` list on top
    /// of the taxonomy-driven classification. Separate from `new` so
    /// `Orchestrator::new` can wire it in without widening the constructor.
    pub fn with_retryable_substrings(mut self, substrings: Vec<String>) -> Self {
        self.retry_policy = self.retry_policy.with_retryable_substrings(substrings);
        self
    }

    pub fn parallel_execution_enabled(&self) -> bool {
        self.enable_parallel_execution
    }

    pub async fn enqueue(&self, message: Message, priority: i32) -> Result<()> {
        self.queue.enqueue(message, priority).await
    }

    pub async fn queue_len(&self) -> usize {
        self.queue.len().await
    }

    /// Registers the default handler invoked for `message_type` when no
    /// routing rule's condition matches.
    pub async fn register_handler(&self, message_type: MessageType, handler: HandlerFn) {
        self.default_handlers.write().await.insert(message_type, handler);
    }

    /// Adds a routing rule, rejecting a second rule for the same
    /// `(messageType, priority)` tuple (spec invariant 6). Rules are kept
    /// sorted by descending priority so `route` can scan them in order.
    pub async fn add_routing_rule(&self, rule: RoutingRule) -> Result<()> {
        let mut rules = self.routing_rules.write().await;
        if rules
            .iter()
            .any(|r| r.message_type == rule.message_type && r.priority == rule.priority)
        {
            return Err(OrchestratorError::DuplicateId(format!(
                "routing rule for ({:?}, priority {})",
                rule.message_type, rule.priority
            )));
        }
        rules.push(rule);
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(())
    }

    async fn resolve_handler(&self, message: &Message) -> Option<HandlerFn> {
        {
            let rules = self.routing_rules.read().await;
            for rule in rules.iter() {
                if rule.message_type == message.message_type && (rule.condition)(message) {
                    return Some(Arc::clone(&rule.handler));
                }
            }
        }
        self.default_handlers.read().await.get(&message.message_type).cloned()
    }

    /// Validates `message`, resolves its handler (first matching routing
    /// rule, else the type's default handler), and dispatches it through the
    /// message concurrency gate with retry and a per-attempt timeout.
    /// `NO_HANDLER` if nothing is registered for the message's type.
    pub async fn route(&self, message: Message) -> Result<serde_json::Value> {
        validate_message(&message)?;
        let handler = self
            .resolve_handler(&message)
            .await
            .ok_or_else(|| OrchestratorError::NoHandler(format!("{:?}", message.message_type)))?;

        let _permit = self.gate.acquire().await;
        let message_for_retry = message.clone();
        with_retry(self.retry_policy.clone(), self.message_timeout, move || {
            let handler = Arc::clone(&handler);
            let message = message_for_retry.clone();
            async move { handler(message).await }
        })
        .await
    }

    /// Routes every message independently and returns results in input
    /// order regardless of completion order (spec section 8: `routeMany`
    /// returns a slice of the same length as its input, result `i`
    /// corresponding to input `i`). Runs sequentially instead of
    /// concurrently when `enableParallelExecution` is off.
    pub async fn route_many(self: &Arc<Self>, messages: Vec<Message>) -> Vec<Result<serde_json::Value>> {
        if !self.enable_parallel_execution {
            let mut results = Vec::with_capacity(messages.len());
            for message in messages {
                results.push(self.route(message).await);
            }
            return results;
        }

        let mut handles = Vec::with_capacity(messages.len());
        for (index, message) in messages.into_iter().enumerate() {
            let router = Arc::clone(self);
            handles.push(tokio::spawn(async move { (index, router.route(message).await) }));
        }

        let len = handles.len();
        let mut ordered: Vec<Option<Result<serde_json::Value>>> = (0..len).map(|_| None).collect();
        for handle in handles {
            match handle.await {
                Ok((index, result)) => ordered[index] = Some(result),
                Err(join_error) => {
                    tracing::warn!(error = %join_error, "route_many task panicked");
                }
            }
        }

        ordered
            .into_iter()
            .enumerate()
            .map(|(index, result)| {
                result.unwrap_or_else(|| {
                    Err(OrchestratorError::Internal(format!(
                        "message {index} processing task panicked"
                    )))
                })
            })
            .collect()
    }

    /// Expands `template` into one message per recipient and dispatches
    /// through `route_many`, preserving recipient order in the result.
    pub async fn broadcast(
        self: &Arc<Self>,
        template: Message,
        recipients: Vec<String>,
    ) -> Vec<Result<serde_json::Value>> {
        let messages = recipients
            .into_iter()
            .map(|recipient| {
                let mut message = template.clone();
                message.id = uuid::Uuid::new_v4().to_string();
                message.receiver_id = recipient;
                message
            })
            .collect();
        self.route_many(messages).await
    }

    /// Dispatches `task` to `agent`, enforcing the concurrency gate and
    /// retrying transient failures per the router's retry policy, each
    /// attempt bounded by `messageTimeout`. Load metrics are updated on the
    /// agent registry around the call so `AgentRegistry::find_best` sees
    /// fresh `active_tasks`/error-rate data for the next selection.
    pub async fn dispatch(&self, task: Task, agent: Arc<dyn Agent>) -> Result<TaskResult> {
        let _permit = self.gate.acquire().await;
        let agent_id = task.agent_id.clone();

        self.agents
            .apply_load_delta(&agent_id, LoadMetricsDelta::started())
            .await
            .ok();
        self.events.emit(Event::TaskStarted {
            task_id: task.id.clone(),
            agent_id: agent_id.clone(),
        });

        let started = Instant::now();
        let task_for_retry = task.clone();
        let result = with_retry(self.retry_policy.clone(), self.message_timeout, move || {
            let agent = Arc::clone(&agent);
            let task = task_for_retry.clone();
            async move { agent.execute(task).await }
        })
        .await;

        let elapsed = started.elapsed().as_millis() as u64;
        match &result {
            Ok(task_result) => {
                self.agents
                    .apply_load_delta(&agent_id, LoadMetricsDelta::completed(elapsed))
                    .await
                    .ok();
                self.events.emit(Event::TaskCompleted {
                    task_id: task_result.task_id.clone(),
                    duration_ms: elapsed,
                });
            }
            Err(error) => {
                self.agents
                    .apply_load_delta(&agent_id, LoadMetricsDelta::failed())
                    .await
                    .ok();
                self.events.emit(Event::TaskFailed {
                    task_id: task.id.clone(),
                    error_code: error.code().to_string(),
                });
            }
        }
        debug!(task_id = %task.id, elapsed, "dispatch finished");
        result
    }

    /// Routes an adapter-bound operation to the best available instance of
    /// `family`, bounding it by the adapter concurrency gate, a retry policy,
    /// and a per-attempt `adapterTimeout`, tracking health via
    /// `AdapterRegistry` on success/failure.
    pub async fn route_to_adapter<F, Fut, T>(&self, family: AdapterFamily, operation: F) -> Result<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _permit = self.adapter_gate.acquire().await;
        let instance = self.adapters.select(family).await?;
        let _guard = self.adapters.begin_operation(&instance.id).await?;

        let attempt_timeout = self.adapter_timeout;
        let policy = self.retry_policy.clone();
        let instance_id = instance.id.clone();
        let result = with_retry(policy, attempt_timeout, || operation(instance_id.clone())).await;

        match &result {
            Ok(_) => {
                self.adapters.record_success(&instance.id).await.ok();
            }
            Err(_) => {
                self.adapters.record_failure(&instance.id).await.ok();
            }
        }
        result
    }

    /// Runs every `(family, operation)` pair through `route_to_adapter`
    /// concurrently, returning results in input order (spec section 4.2's
    /// `routeAdapterOperationsParallel`).
    pub async fn route_adapter_operations_parallel<F, Fut, T>(
        self: &Arc<Self>,
        ops: Vec<(AdapterFamily, F)>,
    ) -> Vec<Result<T>>
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let mut handles = Vec::with_capacity(ops.len());
        for (index, (family, operation)) in ops.into_iter().enumerate() {
            let router = Arc::clone(self);
            handles.push(tokio::spawn(async move {
                (index, router.route_to_adapter(family, operation).await)
            }));
        }

        let len = handles.len();
        let mut ordered: Vec<Option<Result<T>>> = (0..len).map(|_| None).collect();
        for handle in handles {
            match handle.await {
                Ok((index, result)) => ordered[index] = Some(result),
                Err(join_error) => {
                    tracing::warn!(error = %join_error, "adapter operation task panicked");
                }
            }
        }

        ordered
            .into_iter()
            .enumerate()
            .map(|(index, result)| {
                result.unwrap_or_else(|| {
                    Err(OrchestratorError::Internal(format!(
                        "adapter operation {index} task panicked"
                    )))
                })
            })
            .collect()
    }

    pub async fn enqueue_adapter_message(&self, message: Message, priority: i32) -> Result<()> {
        self.adapter_queue.enqueue(message, priority).await
    }

    /// Drains the message queue, routing each message in priority order.
    /// Returns one result per drained message.
    pub async fn process_queue(&self) -> Vec<Result<serde_json::Value>> {
        let mut results = Vec::new();
        while let Some(message) = self.queue.dequeue().await {
            results.push(self.route(message).await);
        }
        results
    }

    pub fn emit_event(&self, event: Event) {
        self.events.emit(event);
    }
}

pub fn build_message(
    message_type: MessageType,
    sender_id: impl Into<String>,
    receiver_id: impl Into<String>,
    payload: serde_json::Value,
) -> Message {
    let mut message = Message::new(message_type, sender_id, receiver_id, payload);
    message.timestamp = Utc::now();
    message
}

pub fn validate_message(message: &Message) -> Result<()> {
    if !message.is_valid() {
        return Err(OrchestratorError::Validation(format!(
            "message {} is missing required fields",
            message.id
        )));
    }
    Ok(())
}
