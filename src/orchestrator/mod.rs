mod analysis;
mod pipeline;
mod selection;
mod session;
mod store;


pub use session::SessionStore;
pub use store::TaskStore;

use crate::adapters::AdapterClients;
use crate::agents::Agent;
use crate::config::{AdapterTogglesConfig, Config};
use crate::error::{OrchestratorError, Result};
use crate::events::{Event, EventBus};
use crate::models::{
    AdapterFamily, AdapterInstanceRecord, AgentRecord, AnalyzedIntent, Intent, IntentContext, Task,
    TaskResult,
};
use crate::registry::{AdapterRegistry, AgentRegistry};
use crate::router::{adapter_operation_allowed, operations_for, MessageRouter};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

const ADAPTER_FAMILIES: [AdapterFamily; 3] =
    [AdapterFamily::ActionKit, AdapterFamily::Analytics, AdapterFamily::Realtime];

/// Top-level entry point for the crate: wires the agent registry, adapter
/// registry, message router, session store, and task store into one
/// orchestrator, and exposes the operations a caller (a CLI, a future HTTP
/// surface, whatever front-end exists outside this crate) drives.
pub struct Orchestrator {
    agents: Arc<AgentRegistry>,
    adapters: Arc<AdapterRegistry>,
    router: Arc<MessageRouter>,
    sessions: SessionStore,
    store: Arc<TaskStore>,
    events: EventBus,
    agent_handlers: Arc<RwLock<HashMap<String, Arc<dyn Agent>>>>,
    adapter_clients: AdapterClients,
    adapter_toggles: AdapterTogglesConfig,
    agent_health_check_interval_ms: u64,
    max_concurrent_intents: usize,
}

impl Orchestrator {
    pub fn new(config: &Config) -> Result<Self> {
        let events = EventBus::new();
        let agents = Arc::new(AgentRegistry::new(config.registry.clone(), events.clone()));
        let adapters = Arc::new(AdapterRegistry::new(config.registry.clone(), events.clone()));
        let router = Arc::new(
            MessageRouter::new(config.router.clone(), Arc::clone(&agents), Arc::clone(&adapters), events.clone())
                .with_retryable_substrings(config.orchestrator.message_retry_policy.retryable_errors.clone()),
        );
        let store = Arc::new(TaskStore::new(
            config.orchestrator.max_stored_tasks,
            config.orchestrator.max_stored_results,
        ));
        let sessions = SessionStore::new(config.orchestrator.session_ttl_seconds);
        let adapter_clients = AdapterClients::new(&config.adapters)?;

        info!("orchestrator initialized");
        Ok(Self {
            agents,
            adapters,
            router,
            sessions,
            store,
            events,
            agent_handlers: Arc::new(RwLock::new(HashMap::new())),
            adapter_clients,
            adapter_toggles: config.orchestrator.adapters.clone(),
            agent_health_check_interval_ms: config.orchestrator.agent_health_check_interval_ms,
            max_concurrent_intents: config.orchestrator.max_concurrent_intents,
        })
    }

    fn family_enabled(&self, family: AdapterFamily) -> bool {
        match family {
            AdapterFamily::ActionKit => self.adapter_toggles.action_kit_enabled,
            AdapterFamily::Analytics => self.adapter_toggles.analytics_enabled,
            AdapterFamily::Realtime => self.adapter_toggles.realtime_enabled,
        }
    }

    /// Publishes which adapter families are enabled (spec section 4.3's
    /// `adapters_initialized` event), then starts the two periodic health
    /// monitors (spec section 4.1's `startHealthMonitoring`): one pinging
    /// every registered agent via `Agent::health_check`, one pinging each
    /// enabled adapter family through its client's liveness call. Actual
    /// instance registration still happens through `register_adapter` —
    /// this only announces readiness and starts watching it.
    pub async fn start(&self) -> Result<()> {
        let families: Vec<String> = ADAPTER_FAMILIES
            .iter()
            .copied()
            .filter(|f| self.family_enabled(*f))
            .map(|f| f.as_str().to_string())
            .collect();
        info!(?families, "adapters initialized");
        self.events.emit(Event::AdaptersInitialized { families });

        let handlers = Arc::clone(&self.agent_handlers);
        let agent_interval = std::time::Duration::from_millis(self.agent_health_check_interval_ms);
        let agent_probe_timeout = std::time::Duration::from_millis(self.agents.config().health_probe_timeout_ms);
        self.agents
            .start_health_monitoring(agent_interval, agent_probe_timeout, move |agent_id| {
                let handlers = Arc::clone(&handlers);
                async move {
                    let agent = handlers.read().await.get(&agent_id).cloned();
                    match agent {
                        Some(agent) => agent.health_check().await,
                        None => Ok(false),
                    }
                }
            })
            .await;

        let adapter_interval = std::time::Duration::from_millis(self.adapters.config().health_check_interval_ms);
        let adapter_probe_timeout =
            std::time::Duration::from_millis(self.adapters.config().adapter_config.health_check_timeout_ms);
        let clients = self.adapter_clients.realtime.clone();
        let action_kit = self.adapter_clients.action_kit.clone();
        let analytics = self.adapter_clients.analytics.clone();
        self.adapters
            .start_health_monitoring(adapter_interval, adapter_probe_timeout, move |family| {
                let action_kit = action_kit.clone();
                let analytics = analytics.clone();
                let realtime = Arc::clone(&clients);
                async move {
                    match family {
                        AdapterFamily::ActionKit => action_kit.ping().await,
                        AdapterFamily::Analytics => analytics.ping().await,
                        AdapterFamily::Realtime => realtime.ping().await,
                    }
                }
            })
            .await;

        Ok(())
    }

    pub async fn register_agent(&self, record: AgentRecord, handler: Arc<dyn Agent>) -> Result<()> {
        let agent_id = record.id.clone();
        self.agents.register(record).await?;
        if let Some(weight) = self.agents.config().load_balancing_weights.get(&agent_id) {
            self.agents.set_capability_weight(&agent_id, *weight).await?;
        }
        self.agent_handlers.write().await.insert(agent_id, handler);
        Ok(())
    }

    pub async fn register_adapter(&self, record: AdapterInstanceRecord) -> Result<()> {
        self.adapters.register(record).await
    }

    /// Returns the declared capability set for every registered instance,
    /// keyed by family name, limited to families enabled in configuration.
    pub async fn adapter_capabilities(&self) -> HashMap<String, Vec<String>> {
        let mut capabilities = HashMap::new();
        for family in ADAPTER_FAMILIES.iter().copied().filter(|f| self.family_enabled(*f)) {
            let mut ops: Vec<String> = self
                .adapters
                .by_family(family)
                .await
                .into_iter()
                .flat_map(|instance| instance.capabilities)
                .collect();
            ops.sort();
            ops.dedup();
            capabilities.insert(family.as_str().to_string(), ops);
        }
        capabilities
    }

    pub async fn analyze_intent(&self, intent: Intent) -> Result<AnalyzedIntent> {
        analysis::analyze(intent)
    }

    pub async fn context_for_session(&self, session_id: &str) -> IntentContext {
        self.sessions.context_for(session_id).await
    }

    pub async fn process_intent(&self, intent: Intent) -> TaskResult {
        let session_id = intent.context.session_id.clone();
        let intent_id = intent.id.clone();

        let handlers = Arc::clone(&self.agent_handlers);
        let result = pipeline::process_one(
            intent,
            &self.agents,
            &self.router,
            &self.store,
            &self.events,
            move |agent_id| {
                // `try_read` is safe here: this closure runs synchronously
                // inside `process_one`, never while a writer (registration)
                // holds the lock for more than the instant it takes to
                // insert one entry.
                handlers.try_read().ok().and_then(|map| map.get(agent_id).cloned())
            },
        )
        .await;

        self.sessions.record_intent(&session_id, &intent_id).await;
        result
    }

    /// Processes every intent concurrently; the returned vector preserves
    /// `intents`' order regardless of completion order (spec Open Question
    /// 2 — this is a hard contract, not best-effort).
    pub async fn process_intents_parallel(&self, intents: Vec<Intent>) -> Vec<TaskResult> {
        let handlers = Arc::clone(&self.agent_handlers);
        pipeline::process_many(
            intents,
            Arc::clone(&self.agents),
            Arc::clone(&self.router),
            Arc::clone(&self.store),
            self.events.clone(),
            self.max_concurrent_intents,
            move |agent_id| handlers.try_read().ok().and_then(|map| map.get(agent_id).cloned()),
        )
        .await
    }

    pub async fn get_task(&self, task_id: &str) -> Option<Task> {
        self.store.get_task(task_id).await
    }

    pub async fn get_result(&self, task_id: &str) -> Option<TaskResult> {
        self.store.get_result(task_id).await
    }

    pub fn agents(&self) -> Arc<AgentRegistry> {
        Arc::clone(&self.agents)
    }

    pub fn adapters(&self) -> Arc<AdapterRegistry> {
        Arc::clone(&self.adapters)
    }

    pub fn router(&self) -> Arc<MessageRouter> {
        Arc::clone(&self.router)
    }

    /// Routes `action` to the best-available instance of `family` and
    /// invokes the matching adapter client, tracking the instance's health
    /// in `AdapterRegistry` around the call.
    pub async fn call_adapter(&self, family: AdapterFamily, action: &str, params: Value) -> Result<Value> {
        match family {
            AdapterFamily::ActionKit => {
                self.router
                    .route_to_adapter(family, |_instance_id| {
                        self.adapter_clients.action_kit.execute(action, &params)
                    })
                    .await
            }
            AdapterFamily::Analytics => {
                self.router
                    .route_to_adapter(family, |_instance_id| {
                        self.adapter_clients.analytics.query(action, &params)
                    })
                    .await
            }
            AdapterFamily::Realtime => {
                self.router
                    .route_to_adapter(family, |_instance_id| {
                        self.adapter_clients.realtime.call(action, params.clone())
                    })
                    .await
            }
        }
    }

    /// String-keyed adapter facade (spec section 4.4): rejects an unknown
    /// family name or a disabled family before anything else runs, checks
    /// `operation` against the family's declared vocabulary, then delegates
    /// to `call_adapter`. Every rejection here emits exactly one
    /// `error_occurred` event and nothing else.
    pub async fn execute_adapter_operation(&self, family: &str, operation: &str, params: Value) -> Result<Value> {
        let Some(family) = AdapterFamily::parse(family) else {
            let error = OrchestratorError::UnknownAdapterFamily(family.to_string());
            self.report_adapter_error(&error);
            return Err(error);
        };

        if !self.family_enabled(family) {
            let error = OrchestratorError::NoAvailable {
                message: "adapter not available".to_string(),
                suggestions: Vec::new(),
            };
            self.report_adapter_error(&error);
            return Err(error);
        }

        if !adapter_operation_allowed(family, operation) {
            let error = OrchestratorError::UnsupportedIntent {
                action: operation.to_string(),
                supported: operations_for(family).iter().map(|s| s.to_string()).collect(),
            };
            self.report_adapter_error(&error);
            return Err(error);
        }

        self.call_adapter(family, operation, params).await
    }

    fn report_adapter_error(&self, error: &OrchestratorError) {
        self.events.emit(Event::ErrorOccurred {
            code: error.code().to_string(),
            message: error.to_string(),
        });
    }

    pub fn events(&self) -> EventBus {
        self.events.clone()
    }

    /// Sweeps expired sessions and lets background event-dispatch tasks and
    /// any adapter transports wind down. There is no persistent state to
    /// flush — session and task storage are process-lifetime only.
    pub async fn stop(&self) {
        self.agents.stop_health_monitoring().await;
        self.adapters.stop_health_monitoring().await;
        let expired = self.sessions.sweep_expired().await;
        info!(expired_sessions = expired.len(), "orchestrator stopped");
    }
}
