use super::health::{tracker_for, HealthTracker};
use crate::config::RegistryConfig;
use crate::constants::{LOAD_WEIGHT_ACTIVE_TASKS, LOAD_WEIGHT_ERROR_RATE, LOAD_WEIGHT_LATENCY_MS};
use crate::error::{OrchestratorError, Result};
use crate::events::{Event, EventBus};
use crate::models::{AgentRecord, AgentStatus, AgentType, LoadBalancingStrategy, LoadMetrics, LoadMetricsDelta};
use crate::router::actions_match;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct Entry {
    record: AgentRecord,
    metrics: LoadMetrics,
    capability_weight: f64,
    health: Arc<HealthTracker>,
}

/// Owns every registered agent's identity, capabilities, status, and load
/// metrics. The sole writer of agent health (spec Open Question 4): the
/// router holds a read-only handle and never mutates an entry here.
pub struct AgentRegistry {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    events: EventBus,
    config: RegistryConfig,
    strategy: LoadBalancingStrategy,
    round_robin_cursor: AtomicUsize,
    monitor: RwLock<Option<JoinHandle<()>>>,
}

impl AgentRegistry {
    pub fn new(config: RegistryConfig, events: EventBus) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            events,
            config,
            strategy: LoadBalancingStrategy::default(),
            round_robin_cursor: AtomicUsize::new(0),
            monitor: RwLock::new(None),
        }
    }

    /// Selection strategy `find_best` scores eligible candidates with (spec
    /// section 6's `loadBalancing`); defaults to `CapabilityBased`.
    pub fn with_strategy(mut self, strategy: LoadBalancingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub async fn register(&self, record: AgentRecord) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&record.id) {
            return Err(OrchestratorError::DuplicateId(record.id.clone()));
        }
        info!(agent_id = %record.id, agent_type = ?record.agent_type, "registering agent");
        let health = tracker_for(&self.config);
        entries.insert(
            record.id.clone(),
            Entry {
                record,
                metrics: LoadMetrics::default(),
                capability_weight: 0.0,
                health,
            },
        );
        Ok(())
    }

    pub async fn deregister(&self, agent_id: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries
            .remove(agent_id)
            .map(|_| ())
            .ok_or_else(|| OrchestratorError::NoHandler(agent_id.to_string()))
    }

    pub async fn get(&self, agent_id: &str) -> Option<AgentRecord> {
        self.entries.read().await.get(agent_id).map(|e| e.record.clone())
    }

    pub async fn all(&self) -> Vec<AgentRecord> {
        self.entries.read().await.values().map(|e| e.record.clone()).collect()
    }

    pub async fn of_type(&self, agent_type: AgentType) -> Vec<AgentRecord> {
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.record.agent_type == agent_type)
            .map(|e| e.record.clone())
            .collect()
    }

    pub async fn set_capability_weight(&self, agent_id: &str, weight: f64) -> Result<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(agent_id)
            .ok_or_else(|| OrchestratorError::NoHandler(agent_id.to_string()))?;
        entry.capability_weight = weight;
        Ok(())
    }

    pub async fn transition_status(&self, agent_id: &str, next: AgentStatus) -> Result<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(agent_id)
            .ok_or_else(|| OrchestratorError::NoHandler(agent_id.to_string()))?;
        let previous = entry.record.status;
        entry.record.apply_transition(next)?;
        drop(entries);
        self.events.emit(Event::AgentStatusChanged {
            agent_id: agent_id.to_string(),
            from: previous,
            to: next,
        });
        Ok(())
    }

    pub async fn apply_load_delta(&self, agent_id: &str, delta: LoadMetricsDelta) -> Result<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(agent_id)
            .ok_or_else(|| OrchestratorError::NoHandler(agent_id.to_string()))?;
        let metrics = &mut entry.metrics;
        metrics.active_tasks = (metrics.active_tasks as i64 + delta.active_tasks_delta).max(0) as u32;
        if delta.completed {
            metrics.completed_tasks += 1;
        }
        if delta.failed {
            metrics.failed_tasks += 1;
        }
        if let Some(latency) = delta.latency_sample_ms {
            metrics.total_latency_ms += latency;
        }
        debug!(agent_id, active = metrics.active_tasks, "applied load delta");
        Ok(())
    }

    pub async fn load_metrics(&self, agent_id: &str) -> Option<LoadMetrics> {
        self.entries.read().await.get(agent_id).map(|e| e.metrics)
    }

    /// Selects the agent record best suited to handle `action` among every
    /// healthy candidate whose capability matches `action` (case-insensitive
    /// substring, either direction) and whose parameter schema accepts
    /// `params`. A candidate that fails the parameter check does not abort
    /// the scan — it is skipped in favor of any other eligible candidate,
    /// and only reported as `CapabilityMismatch` if it turns out to be the
    /// only kind of near-match found. Eligible candidates are ranked by
    /// `self.strategy` (spec section 6's `loadBalancing`). Returns
    /// `NoAvailable` with up to `MAX_SUGGESTIONS` alternative action names
    /// when no agent's capabilities even mention `action`.
    pub async fn find_best(
        &self,
        agent_type: AgentType,
        action: &str,
        params: &std::collections::HashMap<String, serde_json::Value>,
    ) -> Result<AgentRecord> {
        let entries = self.entries.read().await;
        let mut eligible: Vec<(&Entry, f64)> = Vec::new();
        let mut suggestions: Vec<String> = Vec::new();
        let mut capability_mismatch = false;

        for entry in entries.values() {
            if entry.record.agent_type != agent_type {
                continue;
            }
            if !entry.record.is_healthy() {
                continue;
            }
            let Some(capability) = entry
                .record
                .capabilities
                .iter()
                .find(|c| actions_match(action, &c.action))
            else {
                for c in &entry.record.capabilities {
                    if suggestions.len() < crate::constants::MAX_SUGGESTIONS
                        && !suggestions.contains(&c.action)
                    {
                        suggestions.push(c.action.clone());
                    }
                }
                continue;
            };
            if !capability.accepts(params) {
                capability_mismatch = true;
                continue;
            }
            let score = entry.metrics.active_tasks as f64 * LOAD_WEIGHT_ACTIVE_TASKS
                + entry.metrics.error_rate() * LOAD_WEIGHT_ERROR_RATE
                + entry.metrics.average_latency_ms() * LOAD_WEIGHT_LATENCY_MS
                - entry.capability_weight;
            eligible.push((entry, score));
        }

        if eligible.is_empty() {
            warn!(?agent_type, action, "no available agent for action");
            if capability_mismatch && suggestions.is_empty() {
                return Err(OrchestratorError::CapabilityMismatch(format!(
                    "a {agent_type:?} agent exists for '{action}' but rejects the given parameters"
                )));
            }
            suggestions.truncate(crate::constants::MAX_SUGGESTIONS);
            return Err(OrchestratorError::NoAvailable {
                message: format!("no healthy {agent_type:?} agent can handle '{action}'"),
                suggestions,
            });
        }

        let chosen = match self.strategy {
            LoadBalancingStrategy::CapabilityBased => eligible
                .iter()
                .min_by(|a, b| {
                    a.1.partial_cmp(&b.1)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| a.0.metrics.active_tasks.cmp(&b.0.metrics.active_tasks))
                        .then_with(|| a.0.record.id.cmp(&b.0.record.id))
                })
                .map(|(entry, _)| *entry)
                .expect("eligible is non-empty"),
            LoadBalancingStrategy::LeastConnections => eligible
                .iter()
                .min_by_key(|(entry, _)| entry.metrics.active_tasks)
                .map(|(entry, _)| *entry)
                .expect("eligible is non-empty"),
            LoadBalancingStrategy::RoundRobin => {
                let index = self.round_robin_cursor.fetch_add(1, Ordering::Relaxed) % eligible.len();
                eligible[index].0
            }
        };

        debug!(agent_id = %chosen.record.id, strategy = ?self.strategy, "selected agent");
        Ok(chosen.record.clone())
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Spawns the periodic health-monitoring loop (spec section 4.1):
    /// every `interval`, `prober` is invoked for each currently-registered
    /// agent id, bounded by `probe_timeout`. A failing or timed-out probe
    /// is recorded against that agent's circuit breaker; once it trips
    /// open the agent's status becomes `Error` and it drops out of
    /// `find_best` until a later probe succeeds. Calling this again
    /// replaces any previously running monitor.
    pub async fn start_health_monitoring<F, Fut>(self: &Arc<Self>, interval: Duration, probe_timeout: Duration, prober: F)
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool>> + Send + 'static,
    {
        self.stop_health_monitoring().await;
        let registry = Arc::clone(self);
        let prober = Arc::new(prober);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let ids: Vec<String> = registry.entries.read().await.keys().cloned().collect();
                for id in ids {
                    let probe = (prober)(id.clone());
                    let outcome = tokio::time::timeout(probe_timeout, probe).await;
                    let healthy = matches!(outcome, Ok(Ok(true)));
                    registry.record_probe_result(&id, healthy).await;
                }
            }
        });
        *self.monitor.write().await = Some(handle);
    }

    pub async fn stop_health_monitoring(&self) {
        if let Some(handle) = self.monitor.write().await.take() {
            handle.abort();
        }
    }

    /// Applies one health-check outcome to `agent_id`'s circuit breaker and
    /// mirrors the result onto its status: a trip to unhealthy moves the
    /// agent to `Error`, a recovered probe moves an `Error` agent back to
    /// `Idle`. Unknown agent ids (e.g. unregistered mid-sweep) are ignored.
    async fn record_probe_result(&self, agent_id: &str, healthy: bool) {
        let tracker = {
            let entries = self.entries.read().await;
            match entries.get(agent_id) {
                Some(entry) => Arc::clone(&entry.health),
                None => return,
            }
        };
        if healthy {
            tracker.record_success().await;
        } else {
            tracker.record_failure().await;
        }
        let now_healthy = tracker.is_usable().await;

        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(agent_id) else {
            return;
        };
        let next = if !now_healthy {
            AgentStatus::Error
        } else if entry.record.status == AgentStatus::Error {
            AgentStatus::Idle
        } else {
            return;
        };
        let previous = entry.record.status;
        if entry.record.apply_transition(next).is_ok() {
            drop(entries);
            self.events.emit(Event::AgentStatusChanged {
                agent_id: agent_id.to_string(),
                from: previous,
                to: next,
            });
        }
    }
}
