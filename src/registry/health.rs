use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub probe_timeout: Duration,
}

/// Tracks consecutive-failure health for a single adapter instance, mirroring
/// the adapter status machine in spec section 4.5 (`active -> error` after
/// `failure_threshold`, `error -> active` after a successful probe).
#[derive(Debug)]
pub struct HealthTracker {
    config: CircuitBreakerConfig,
    state: RwLock<CircuitState>,
    failure_count: AtomicU32,
    success_count: AtomicU32,
    last_state_change: RwLock<Instant>,
}

impl HealthTracker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicU32::new(0),
            success_count: AtomicU32::new(0),
            last_state_change: RwLock::new(Instant::now()),
        }
    }

    pub async fn state(&self) -> CircuitState {
        *self.state.read().await
    }

    pub async fn is_usable(&self) -> bool {
        !matches!(self.state().await, CircuitState::Open)
    }

    pub async fn record_success(&self) {
        let current = self.state().await;
        match current {
            CircuitState::HalfOpen => {
                let count = self.success_count.fetch_add(1, Ordering::Relaxed) + 1;
                if count >= self.config.success_threshold {
                    self.transition(CircuitState::Closed).await;
                }
            }
            CircuitState::Open => {
                self.transition(CircuitState::HalfOpen).await;
            }
            CircuitState::Closed => {
                self.failure_count.store(0, Ordering::Relaxed);
            }
        }
    }

    pub async fn record_failure(&self) {
        let current = self.state().await;
        match current {
            CircuitState::Closed => {
                let count = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
                if count >= self.config.failure_threshold {
                    self.transition(CircuitState::Open).await;
                }
            }
            CircuitState::HalfOpen => {
                self.transition(CircuitState::Open).await;
            }
            CircuitState::Open => {}
        }
    }

    async fn transition(&self, next: CircuitState) {
        let mut state = self.state.write().await;
        let previous = *state;
        *state = next;
        *self.last_state_change.write().await = Instant::now();
        self.failure_count.store(0, Ordering::Relaxed);
        self.success_count.store(0, Ordering::Relaxed);
        match next {
            CircuitState::Open => warn!(?previous, "adapter marked unhealthy"),
            CircuitState::Closed => info!(?previous, "adapter recovered"),
            CircuitState::HalfOpen => debug!(?previous, "adapter probing for recovery"),
        }
    }
}

/// Builds a tracker honoring a registry's configured thresholds (spec
/// section 6's `failureThreshold`/`successThreshold`/`healthProbeTimeoutMs`)
/// rather than hardcoded defaults, so two registries with different
/// `RegistryConfig`s behave differently.
pub fn tracker_for(config: &crate::config::RegistryConfig) -> Arc<HealthTracker> {
    Arc::new(HealthTracker::new(CircuitBreakerConfig {
        failure_threshold: config.failure_threshold,
        success_threshold: config.success_threshold,
        probe_timeout: Duration::from_millis(config.health_probe_timeout_ms),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> HealthTracker {
        HealthTracker::new(CircuitBreakerConfig {
            failure_threshold: 2,
            success_threshold: 1,
            probe_timeout: Duration::from_millis(100),
        })
    }

    #[tokio::test]
    async fn opens_after_threshold_failures() {
        let t = tracker();
        assert!(t.is_usable().await);
        t.record_failure().await;
        assert!(t.is_usable().await);
        t.record_failure().await;
        assert!(!t.is_usable().await);
        assert_eq!(t.state().await, CircuitState::Open);
    }

    #[tokio::test]
    async fn recovers_through_half_open_on_success() {
        let t = tracker();
        t.record_failure().await;
        t.record_failure().await;
        assert_eq!(t.state().await, CircuitState::Open);

        t.record_success().await;
        assert_eq!(t.state().await, CircuitState::HalfOpen);

        t.record_success().await;
        assert_eq!(t.state().await, CircuitState::Closed);
        assert!(t.is_usable().await);
    }
}
