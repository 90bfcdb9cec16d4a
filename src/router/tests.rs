use super::*;
use crate::agents::mock::MockAgent;
use crate::config::{AdapterRegistryConfig, AdapterRoutingConfig, RegistryConfig};
use crate::models::{
    AdapterFamily, AdapterInstanceRecord, AdapterStatus, AgentRecord, AgentStatus, AgentType, Capability,
};
use chrono::Utc;
use std::collections::HashMap;

fn router_config() -> RouterConfig {
    RouterConfig {
        max_message_queue_size: 100,
        max_adapter_queue_size: 100,
        queue_poll_interval_ms: 10,
        default_retry_attempts: 3,
        retry_base_delay_ms: 1,
        retry_max_backoff_ms: 10,
        max_concurrent_messages: 16,
        message_timeout_ms: 1_000,
        backoff_multiplier: 2.0,
        enable_parallel_execution: true,
        adapter_routing: AdapterRoutingConfig {
            enable_adapter_messages: true,
            adapter_timeout_ms: 1_000,
            max_concurrent_adapter_calls: 8,
            prioritize_adapters_by_type: false,
        },
    }
}

fn registry_config() -> RegistryConfig {
    RegistryConfig {
        health_check_interval_ms: 30_000,
        health_probe_timeout_ms: 2_000,
        failure_threshold: 2,
        success_threshold: 1,
        max_operations_per_adapter: 2,
        load_balancing_weights: HashMap::new(),
        adapter_config: AdapterRegistryConfig {
            enable_load_balancing: true,
            max_adapters_per_type: 10,
            health_check_timeout_ms: 2_000,
            failover_enabled: true,
        },
    }
}

fn lend_capability() -> Capability {
    Capability {
        action: "supply".to_string(),
        description: "supply".to_string(),
        parameters: Vec::new(),
        required_permissions: Vec::new(),
        estimated_execution_time_ms: 10,
    }
}

#[tokio::test]
async fn dispatch_retries_then_succeeds() {
    let events = EventBus::new();
    let agents = Arc::new(AgentRegistry::new(registry_config(), events.clone()));
    let adapters = Arc::new(AdapterRegistry::new(registry_config(), events.clone()));
    let router = MessageRouter::new(router_config(), Arc::clone(&agents), adapters, events);

    agents
        .register(AgentRecord {
            id: "lend1".to_string(),
            agent_type: AgentType::LendingAgent,
            name: "lend1".to_string(),
            version: "1.0.0".to_string(),
            capabilities: vec![lend_capability()],
            status: AgentStatus::Idle,
            metadata: HashMap::new(),
        })
        .await
        .unwrap();

    let agent = MockAgent::new(AgentType::LendingAgent, "lend1", vec![lend_capability()]).failing(2);

    let task = Task::new("intent-1", "lend1", "supply", HashMap::new(), 1);
    let result = router.dispatch(task, agent).await.unwrap();
    assert!(result.is_success());

    let metrics = agents.load_metrics("lend1").await.unwrap();
    assert_eq!(metrics.completed_tasks, 1);
    assert_eq!(metrics.failed_tasks, 0);
}

#[tokio::test]
async fn dispatch_records_failed_metrics_when_retries_exhausted() {
    let events = EventBus::new();
    let agents = Arc::new(AgentRegistry::new(registry_config(), events.clone()));
    let adapters = Arc::new(AdapterRegistry::new(registry_config(), events.clone()));
    let mut config = router_config();
    config.default_retry_attempts = 1;
    let router = MessageRouter::new(config, Arc::clone(&agents), adapters, events);

    agents
        .register(AgentRecord {
            id: "lend1".to_string(),
            agent_type: AgentType::LendingAgent,
            name: "lend1".to_string(),
            version: "1.0.0".to_string(),
            capabilities: Vec::new(),
            status: AgentStatus::Idle,
            metadata: HashMap::new(),
        })
        .await
        .unwrap();

    let agent = MockAgent::new(AgentType::LendingAgent, "lend1", Vec::new()).failing(5);
    let task = Task::new("intent-1", "lend1", "supply", HashMap::new(), 1);
    let result = router.dispatch(task, agent).await;
    assert!(result.is_err());

    let metrics = agents.load_metrics("lend1").await.unwrap();
    assert_eq!(metrics.failed_tasks, 1);
}

#[tokio::test]
async fn dispatch_attempt_exceeding_message_timeout_is_retried() {
    let events = EventBus::new();
    let agents = Arc::new(AgentRegistry::new(registry_config(), events.clone()));
    let adapters = Arc::new(AdapterRegistry::new(registry_config(), events.clone()));
    let mut config = router_config();
    config.message_timeout_ms = 1_000;
    let router = MessageRouter::new(config, Arc::clone(&agents), adapters, events);

    agents
        .register(AgentRecord {
            id: "lend1".to_string(),
            agent_type: AgentType::LendingAgent,
            name: "lend1".to_string(),
            version: "1.0.0".to_string(),
            capabilities: vec![lend_capability()],
            status: AgentStatus::Idle,
            metadata: HashMap::new(),
        })
        .await
        .unwrap();

    let agent = MockAgent::new(AgentType::LendingAgent, "lend1", vec![lend_capability()]);
    let task = Task::new("intent-1", "lend1", "supply", HashMap::new(), 1);
    let result = router.dispatch(task, agent).await.unwrap();
    assert!(result.is_success());
}

#[tokio::test]
async fn route_to_adapter_selects_and_tracks_health() {
    let events = EventBus::new();
    let agents = Arc::new(AgentRegistry::new(registry_config(), events.clone()));
    let adapters = Arc::new(AdapterRegistry::new(registry_config(), events.clone()));
    adapters
        .register(AdapterInstanceRecord {
            id: "act1".to_string(),
            family: AdapterFamily::ActionKit,
            priority: 1,
            capabilities: vec!["supply".to_string()],
            status: AdapterStatus::Active,
            is_healthy: true,
            last_used: Utc::now(),
            active_operations: 0,
        })
        .await
        .unwrap();
    let router = MessageRouter::new(router_config(), agents, Arc::clone(&adapters), events);

    let result: Result<&str> = router
        .route_to_adapter(AdapterFamily::ActionKit, |_id| async { Ok("ok") })
        .await;
    assert_eq!(result.unwrap(), "ok");
}

#[tokio::test]
async fn route_to_adapter_gate_bounds_concurrency() {
    let events = EventBus::new();
    let agents = Arc::new(AgentRegistry::new(registry_config(), events.clone()));
    let adapters = Arc::new(AdapterRegistry::new(registry_config(), events.clone()));
    adapters
        .register(AdapterInstanceRecord {
            id: "act1".to_string(),
            family: AdapterFamily::ActionKit,
            priority: 1,
            capabilities: vec!["supply".to_string()],
            status: AdapterStatus::Active,
            is_healthy: true,
            last_used: Utc::now(),
            active_operations: 0,
        })
        .await
        .unwrap();

    let mut config = router_config();
    config.adapter_routing.max_concurrent_adapter_calls = 1;
    let router = Arc::new(MessageRouter::new(config, agents, Arc::clone(&adapters), events));

    let op = |_id: String| async { Ok::<_, OrchestratorError>("ok") };
    let ops = vec![(AdapterFamily::ActionKit, op), (AdapterFamily::ActionKit, op)];
    let results = router.route_adapter_operations_parallel(ops).await;
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.is_ok()));
}

fn no_handler_message() -> Message {
    Message::new(MessageType::TaskRequest, "sender", "receiver", serde_json::json!({}))
}

async fn test_router() -> Arc<MessageRouter> {
    let events = EventBus::new();
    let agents = Arc::new(AgentRegistry::new(registry_config(), events.clone()));
    let adapters = Arc::new(AdapterRegistry::new(registry_config(), events.clone()));
    Arc::new(MessageRouter::new(router_config(), agents, adapters, events))
}

#[tokio::test]
async fn route_without_a_registered_handler_fails_with_no_handler() {
    let router = test_router().await;
    let result = router.route(no_handler_message()).await;
    assert!(matches!(result, Err(OrchestratorError::NoHandler(_))));
}

#[tokio::test]
async fn route_dispatches_to_the_registered_default_handler() {
    let router = test_router().await;
    router
        .register_handler(
            MessageType::TaskRequest,
            Arc::new(|message: Message| {
                Box::pin(async move { Ok(serde_json::json!({ "echo": message.receiver_id })) })
            }),
        )
        .await;

    let result = router.route(no_handler_message()).await.unwrap();
    assert_eq!(result["echo"], "receiver");
}

#[tokio::test]
async fn routing_rule_overrides_the_default_handler_when_its_condition_matches() {
    let router = test_router().await;
    router
        .register_handler(
            MessageType::TaskRequest,
            Arc::new(|_message: Message| Box::pin(async move { Ok(serde_json::json!({ "via": "default" })) })),
        )
        .await;
    router
        .add_routing_rule(RoutingRule {
            message_type: MessageType::TaskRequest,
            priority: 10,
            condition: Arc::new(|message: &Message| message.receiver_id == "receiver"),
            handler: Arc::new(|_message: Message| {
                Box::pin(async move { Ok(serde_json::json!({ "via": "rule" })) })
            }),
        })
        .await
        .unwrap();

    let result = router.route(no_handler_message()).await.unwrap();
    assert_eq!(result["via"], "rule");
}

#[tokio::test]
async fn add_routing_rule_rejects_a_duplicate_type_priority_pair() {
    let router = test_router().await;
    let rule = || RoutingRule {
        message_type: MessageType::TaskRequest,
        priority: 5,
        condition: Arc::new(|_m: &Message| true),
        handler: Arc::new(|_m: Message| Box::pin(async move { Ok(serde_json::json!({})) })),
    };
    router.add_routing_rule(rule()).await.unwrap();
    let err = router.add_routing_rule(rule()).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::DuplicateId(_)));
}

#[tokio::test]
async fn route_many_preserves_input_order_in_its_results() {
    let router = test_router().await;
    router
        .register_handler(
            MessageType::TaskRequest,
            Arc::new(|message: Message| {
                Box::pin(async move { Ok(serde_json::json!({ "receiver": message.receiver_id })) })
            }),
        )
        .await;

    let messages: Vec<Message> = (0..5)
        .map(|i| Message::new(MessageType::TaskRequest, "sender", format!("r{i}"), serde_json::json!({})))
        .collect();

    let results = router.route_many(messages).await;
    assert_eq!(results.len(), 5);
    for (i, result) in results.into_iter().enumerate() {
        assert_eq!(result.unwrap()["receiver"], format!("r{i}"));
    }
}

#[tokio::test]
async fn broadcast_fans_a_template_out_to_every_recipient() {
    let router = test_router().await;
    router
        .register_handler(
            MessageType::TaskRequest,
            Arc::new(|message: Message| {
                Box::pin(async move { Ok(serde_json::json!({ "receiver": message.receiver_id })) })
            }),
        )
        .await;

    let template = Message::new(MessageType::TaskRequest, "sender", "placeholder", serde_json::json!({}));
    let results = router
        .broadcast(template, vec!["r1".to_string(), "r2".to_string(), "r3".to_string()])
        .await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap()["receiver"], "r1");
    assert_eq!(results[2].as_ref().unwrap()["receiver"], "r3");
}

#[tokio::test]
async fn process_queue_drains_every_enqueued_message_in_priority_order() {
    let router = test_router().await;
    router
        .register_handler(
            MessageType::TaskRequest,
            Arc::new(|message: Message| {
                Box::pin(async move { Ok(serde_json::json!({ "receiver": message.receiver_id })) })
            }),
        )
        .await;

    router
        .enqueue(
            Message::new(MessageType::TaskRequest, "sender", "low", serde_json::json!({})),
            0,
        )
        .await
        .unwrap();
    router
        .enqueue(
            Message::new(MessageType::TaskRequest, "sender", "urgent", serde_json::json!({})),
            5,
        )
        .await
        .unwrap();

    let results = router.process_queue().await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_ref().unwrap()["receiver"], "urgent");
    assert_eq!(results[1].as_ref().unwrap()["receiver"], "low");
}

#[tokio::test]
async fn router_sizes_its_message_gate_from_config() {
    let mut config = router_config();
    config.max_concurrent_messages = 3;
    let events = EventBus::new();
    let agents = Arc::new(AgentRegistry::new(registry_config(), events.clone()));
    let adapters = Arc::new(AdapterRegistry::new(registry_config(), events.clone()));
    let router = MessageRouter::new(config, agents, adapters, events);
    assert_eq!(router.gate.available_permits(), 3);
}
