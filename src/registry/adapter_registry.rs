use super::health::{tracker_for, HealthTracker};
use crate::config::RegistryConfig;
use crate::error::{OrchestratorError, Result};
use crate::events::{Event, EventBus};
use crate::models::{AdapterFamily, AdapterInstanceRecord, AdapterStatus};
use chrono::Utc;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};

struct Entry {
    record: AdapterInstanceRecord,
    health: Arc<HealthTracker>,
    active_operations: AtomicU32,
}

/// Owns every adapter instance's registration, priority ordering, and
/// health. Mirrors `AgentRegistry`'s role for the adapter side of spec
/// section 6.
pub struct AdapterRegistry {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    events: EventBus,
    config: RegistryConfig,
    monitor: RwLock<Option<JoinHandle<()>>>,
}

impl AdapterRegistry {
    pub fn new(config: RegistryConfig, events: EventBus) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            events,
            config,
            monitor: RwLock::new(None),
        }
    }

    pub async fn register(&self, record: AdapterInstanceRecord) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&record.id) {
            return Err(OrchestratorError::DuplicateId(record.id.clone()));
        }
        let family_count = entries.values().filter(|e| e.record.family == record.family).count();
        if family_count as u32 >= self.config.adapter_config.max_adapters_per_type {
            return Err(OrchestratorError::Validation(format!(
                "{} already has the configured maximum of {} adapter instances",
                record.family.as_str(),
                self.config.adapter_config.max_adapters_per_type
            )));
        }
        info!(adapter_id = %record.id, family = record.family.as_str(), "registering adapter");
        let health = tracker_for(&self.config);
        entries.insert(
            record.id.clone(),
            Entry {
                record,
                health,
                active_operations: AtomicU32::new(0),
            },
        );
        Ok(())
    }

    pub async fn get(&self, adapter_id: &str) -> Option<AdapterInstanceRecord> {
        self.entries.read().await.get(adapter_id).map(|e| e.record.clone())
    }

    pub async fn by_family(&self, family: AdapterFamily) -> Vec<AdapterInstanceRecord> {
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.record.family == family)
            .map(|e| e.record.clone())
            .collect()
    }

    /// Picks the healthy, under-capacity instance of `family` with the
    /// fewest active operations, breaking ties by least-recently-used
    /// (oldest `last_used` wins). When `adapterConfig.failoverEnabled` is
    /// false, load balancing is skipped entirely: only the single
    /// highest-priority instance is ever considered, and its absence or
    /// unavailability fails the call rather than falling over to another
    /// instance.
    pub async fn select(&self, family: AdapterFamily) -> Result<AdapterInstanceRecord> {
        let entries = self.entries.read().await;
        let cap = self.config.max_operations_per_adapter;
        let not_available = || OrchestratorError::NoAvailable {
            message: format!("no healthy {} adapter under capacity", family.as_str()),
            suggestions: Vec::new(),
        };

        let is_usable = |entry: &&Entry| {
            entry.record.family == family
                && entry.record.status == AdapterStatus::Active
                && entry.record.is_healthy
                && entry.active_operations.load(Ordering::Relaxed) < cap
        };

        if !self.config.adapter_config.failover_enabled {
            let primary = entries
                .values()
                .filter(|e| e.record.family == family)
                .max_by_key(|e| e.record.priority)
                .ok_or_else(not_available)?;
            return if is_usable(&primary) {
                Ok(primary.record.clone())
            } else {
                Err(not_available())
            };
        }

        let mut eligible: Vec<&Entry> = entries.values().filter(is_usable).collect();
        if eligible.is_empty() {
            return Err(not_available());
        }

        let chosen = if self.config.adapter_config.enable_load_balancing {
            eligible
                .into_iter()
                .min_by(|a, b| {
                    a.active_operations
                        .load(Ordering::Relaxed)
                        .cmp(&b.active_operations.load(Ordering::Relaxed))
                        .then_with(|| a.record.last_used.cmp(&b.record.last_used))
                })
                .expect("eligible is non-empty")
        } else {
            eligible.sort_by(|a, b| b.record.priority.cmp(&a.record.priority));
            eligible[0]
        };

        Ok(chosen.record.clone())
    }

    /// RAII-style guard that decrements `active_operations` on drop,
    /// guaranteeing release on success, error, timeout, or panic unwind.
    pub async fn begin_operation(&self, adapter_id: &str) -> Result<OperationGuard> {
        let entries = self.entries.read().await;
        let entry = entries
            .get(adapter_id)
            .ok_or_else(|| OrchestratorError::NoHandler(adapter_id.to_string()))?;
        entry.active_operations.fetch_add(1, Ordering::SeqCst);
        Ok(OperationGuard {
            entries: Arc::clone(&self.entries),
            adapter_id: adapter_id.to_string(),
        })
    }

    pub async fn record_success(&self, adapter_id: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(adapter_id)
            .ok_or_else(|| OrchestratorError::NoHandler(adapter_id.to_string()))?;
        entry.health.record_success().await;
        entry.record.is_healthy = entry.health.is_usable().await;
        entry.record.last_used = Utc::now();
        if entry.record.is_healthy && entry.record.status == AdapterStatus::Error {
            entry.record.status = AdapterStatus::Active;
        }
        Ok(())
    }

    pub async fn record_failure(&self, adapter_id: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(adapter_id)
            .ok_or_else(|| OrchestratorError::NoHandler(adapter_id.to_string()))?;
        entry.health.record_failure().await;
        entry.record.is_healthy = entry.health.is_usable().await;
        if !entry.record.is_healthy {
            entry.record.status = AdapterStatus::Error;
            warn!(adapter_id, "adapter marked error after repeated failures");
            self.events.emit(Event::AdapterError {
                adapter_id: adapter_id.to_string(),
                family: entry.record.family,
                error_code: "ADAPTER_UNHEALTHY".to_string(),
            });
        }
        Ok(())
    }

    /// Spawns the periodic adapter liveness loop (spec section 4.1). Every
    /// `interval`, `prober` is invoked once per distinct registered family
    /// (there is one underlying transport per family, so one liveness call
    /// speaks for every instance of it) bounded by `probe_timeout`; the
    /// outcome is applied to every instance of that family via the same
    /// `record_success`/`record_failure` path the router uses after a real
    /// operation. Calling this again replaces any previously running
    /// monitor.
    pub async fn start_health_monitoring<F, Fut>(self: &Arc<Self>, interval: Duration, probe_timeout: Duration, prober: F)
    where
        F: Fn(AdapterFamily) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool>> + Send + 'static,
    {
        self.stop_health_monitoring().await;
        let registry = Arc::clone(self);
        let prober = Arc::new(prober);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let families: Vec<AdapterFamily> = {
                    let entries = registry.entries.read().await;
                    let mut seen = std::collections::HashSet::new();
                    entries.values().map(|e| e.record.family).filter(|f| seen.insert(*f)).collect()
                };
                for family in families {
                    let probe = (prober)(family);
                    let outcome = tokio::time::timeout(probe_timeout, probe).await;
                    let healthy = matches!(outcome, Ok(Ok(true)));
                    let ids: Vec<String> = {
                        let entries = registry.entries.read().await;
                        entries
                            .values()
                            .filter(|e| e.record.family == family)
                            .map(|e| e.record.id.clone())
                            .collect()
                    };
                    for id in ids {
                        if healthy {
                            registry.record_success(&id).await.ok();
                        } else {
                            registry.record_failure(&id).await.ok();
                        }
                    }
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

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

pub struct OperationGuard {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    adapter_id: String,
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        let entries = Arc::clone(&self.entries);
        let adapter_id = self.adapter_id.clone();
        tokio::spawn(async move {
            let entries = entries.read().await;
            if let Some(entry) = entries.get(&adapter_id) {
                entry.active_operations.fetch_sub(1, Ordering::SeqCst);
            }
        });
    }
}
