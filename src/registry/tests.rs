use super::*;
use crate::config::RegistryConfig;
use crate::events::EventBus;
use crate::models::{
    AdapterFamily, AdapterInstanceRecord, AdapterStatus, AgentRecord, AgentStatus, AgentType,
    Capability, LoadMetricsDelta,
};
use chrono::Utc;
use std::collections::HashMap;

fn registry_config() -> RegistryConfig {
    RegistryConfig {
        health_check_interval_ms: 30_000,
        health_probe_timeout_ms: 2_000,
        failure_threshold: 2,
        success_threshold: 1,
        max_operations_per_adapter: 2,
        load_balancing_weights: HashMap::new(),
        adapter_config: crate::config::AdapterRegistryConfig {
            enable_load_balancing: true,
            max_adapters_per_type: 10,
            health_check_timeout_ms: 2_000,
            failover_enabled: true,
        },
    }
}

fn agent(id: &str, agent_type: AgentType) -> AgentRecord {
    AgentRecord {
        id: id.to_string(),
        agent_type,
        name: id.to_string(),
        version: "1.0.0".to_string(),
        capabilities: vec![Capability {
            action: "supply".to_string(),
            description: "supply liquidity".to_string(),
            parameters: Vec::new(),
            required_permissions: Vec::new(),
            estimated_execution_time_ms: 100,
        }],
        status: AgentStatus::Idle,
        metadata: HashMap::new(),
    }
}

fn adapter(id: &str, family: AdapterFamily, priority: i32) -> AdapterInstanceRecord {
    AdapterInstanceRecord {
        id: id.to_string(),
        family,
        priority,
        capabilities: vec!["supply".to_string()],
        status: AdapterStatus::Active,
        is_healthy: true,
        last_used: Utc::now(),
        active_operations: 0,
    }
}

#[tokio::test]
async fn registering_duplicate_agent_id_fails() {
    let registry = AgentRegistry::new(registry_config(), EventBus::new());
    registry.register(agent("a1", AgentType::LendingAgent)).await.unwrap();
    let err = registry
        .register(agent("a1", AgentType::LendingAgent))
        .await
        .unwrap_err();
    assert!(matches!(err, crate::error::OrchestratorError::DuplicateId(_)));
}

#[tokio::test]
async fn find_best_prefers_lower_load() {
    let registry = AgentRegistry::new(registry_config(), EventBus::new());
    registry.register(agent("busy", AgentType::LendingAgent)).await.unwrap();
    registry.register(agent("idle", AgentType::LendingAgent)).await.unwrap();

    registry
        .apply_load_delta("busy", LoadMetricsDelta::started())
        .await
        .unwrap();
    registry
        .apply_load_delta("busy", LoadMetricsDelta::started())
        .await
        .unwrap();

    let params = HashMap::new();
    let chosen = registry
        .find_best(AgentType::LendingAgent, "supply", &params)
        .await
        .unwrap();
    assert_eq!(chosen.id, "idle");
}

#[tokio::test]
async fn find_best_errors_with_suggestions_when_no_match() {
    let registry = AgentRegistry::new(registry_config(), EventBus::new());
    registry.register(agent("a1", AgentType::LendingAgent)).await.unwrap();

    let params = HashMap::new();
    let err = registry
        .find_best(AgentType::LendingAgent, "withdraw", &params)
        .await
        .unwrap_err();
    match err {
        crate::error::OrchestratorError::NoAvailable { suggestions, .. } => {
            assert_eq!(suggestions, vec!["supply".to_string()]);
        }
        other => panic!("expected NoAvailable, got {other:?}"),
    }
}

#[tokio::test]
async fn offline_agent_is_never_selected() {
    let registry = AgentRegistry::new(registry_config(), EventBus::new());
    registry.register(agent("a1", AgentType::LendingAgent)).await.unwrap();
    registry
        .transition_status("a1", AgentStatus::Offline)
        .await
        .unwrap();

    let params = HashMap::new();
    let err = registry
        .find_best(AgentType::LendingAgent, "supply", &params)
        .await
        .unwrap_err();
    assert!(matches!(err, crate::error::OrchestratorError::NoAvailable { .. }));
}

#[tokio::test]
async fn adapter_select_skips_instances_at_capacity() {
    let registry = AdapterRegistry::new(registry_config(), EventBus::new());
    registry
        .register(adapter("act1", AdapterFamily::ActionKit, 1))
        .await
        .unwrap();

    let g1 = registry.begin_operation("act1").await.unwrap();
    let g2 = registry.begin_operation("act1").await.unwrap();

    let err = registry.select(AdapterFamily::ActionKit).await.unwrap_err();
    assert!(matches!(err, crate::error::OrchestratorError::NoAvailable { .. }));

    drop(g1);
    drop(g2);
}

#[tokio::test]
async fn adapter_opens_after_repeated_failures() {
    let registry = AdapterRegistry::new(registry_config(), EventBus::new());
    registry
        .register(adapter("act1", AdapterFamily::ActionKit, 1))
        .await
        .unwrap();

    registry.record_failure("act1").await.unwrap();
    registry.record_failure("act1").await.unwrap();

    let record = registry.get("act1").await.unwrap();
    assert_eq!(record.status, AdapterStatus::Error);
    assert!(!record.is_healthy);

    let err = registry.select(AdapterFamily::ActionKit).await.unwrap_err();
    assert!(matches!(err, crate::error::OrchestratorError::NoAvailable { .. }));
}

#[tokio::test]
async fn adapter_recovers_after_success_following_failure() {
    let registry = AdapterRegistry::new(registry_config(), EventBus::new());
    registry
        .register(adapter("act1", AdapterFamily::ActionKit, 1))
        .await
        .unwrap();

    registry.record_failure("act1").await.unwrap();
    registry.record_failure("act1").await.unwrap();
    assert_eq!(registry.get("act1").await.unwrap().status, AdapterStatus::Error);

    registry.record_success("act1").await.unwrap();
    let record = registry.get("act1").await.unwrap();
    assert_eq!(record.status, AdapterStatus::Active);
    assert!(record.is_healthy);
}

#[tokio::test]
async fn health_monitor_marks_agent_error_then_recovers() {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    let registry = Arc::new(AgentRegistry::new(registry_config(), EventBus::new()));
    registry.register(agent("a1", AgentType::LendingAgent)).await.unwrap();

    let healthy = Arc::new(AtomicBool::new(false));
    let probe_flag = Arc::clone(&healthy);
    registry
        .start_health_monitoring(Duration::from_millis(10), Duration::from_millis(50), move |_id| {
            let probe_flag = Arc::clone(&probe_flag);
            async move { Ok(probe_flag.load(Ordering::SeqCst)) }
        })
        .await;

    // failure_threshold is 2 in `registry_config`; two 10ms ticks trip the breaker.
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(registry.get("a1").await.unwrap().status, AgentStatus::Error);

    healthy.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(registry.get("a1").await.unwrap().status, AgentStatus::Idle);

    registry.stop_health_monitoring().await;
}

#[tokio::test]
async fn health_monitor_applies_probe_outcome_to_every_instance_in_family() {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    let registry = Arc::new(AdapterRegistry::new(registry_config(), EventBus::new()));
    registry
        .register(adapter("act1", AdapterFamily::ActionKit, 1))
        .await
        .unwrap();
    registry
        .register(adapter("act2", AdapterFamily::ActionKit, 2))
        .await
        .unwrap();

    let healthy = Arc::new(AtomicBool::new(false));
    let probe_flag = Arc::clone(&healthy);
    registry
        .start_health_monitoring(Duration::from_millis(10), Duration::from_millis(50), move |_family| {
            let probe_flag = Arc::clone(&probe_flag);
            async move { Ok(probe_flag.load(Ordering::SeqCst)) }
        })
        .await;

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(registry.get("act1").await.unwrap().status, AdapterStatus::Error);
    assert_eq!(registry.get("act2").await.unwrap().status, AdapterStatus::Error);

    registry.stop_health_monitoring().await;
}
