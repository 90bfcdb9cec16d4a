use crate::constants;
use crate::error::{OrchestratorError, Result};
use crate::models::LoadBalancingStrategy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;


/// Process-wide configuration, loaded once at startup from the environment
/// (`.env` file picked up via `dotenvy`, then real env vars override it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub registry: RegistryConfig,
    pub router: RouterConfig,
    pub orchestrator: OrchestratorConfig,
    pub adapters: AdapterClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub health_check_interval_ms: u64,
    pub health_probe_timeout_ms: u64,
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub max_operations_per_adapter: u32,
    /// Per-agent score bias applied in `find_best` (spec section 6's
    /// `loadBalancingWeights`); agents absent from the map get weight 0.
    pub load_balancing_weights: HashMap<String, f64>,
    pub adapter_config: AdapterRegistryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterRegistryConfig {
    pub enable_load_balancing: bool,
    pub max_adapters_per_type: u32,
    pub health_check_timeout_ms: u64,
    pub failover_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    pub max_message_queue_size: usize,
    pub max_adapter_queue_size: usize,
    pub queue_poll_interval_ms: u64,
    pub default_retry_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_backoff_ms: u64,
    pub max_concurrent_messages: usize,
    pub message_timeout_ms: u64,
    pub backoff_multiplier: f64,
    pub enable_parallel_execution: bool,
    pub adapter_routing: AdapterRoutingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterRoutingConfig {
    pub enable_adapter_messages: bool,
    pub adapter_timeout_ms: u64,
    pub max_concurrent_adapter_calls: usize,
    pub prioritize_adapters_by_type: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub max_stored_tasks: usize,
    pub max_stored_results: usize,
    pub session_ttl_seconds: u64,
    pub max_concurrent_intents: usize,
    pub agent_health_check_interval_ms: u64,
    pub load_balancing: LoadBalancingStrategy,
    pub message_retry_policy: MessageRetryPolicyConfig,
    pub adapters: AdapterTogglesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRetryPolicyConfig {
    pub max_retries: u32,
    pub backoff_multiplier: f64,
    pub max_backoff_ms: u64,
    pub retryable_errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterTogglesConfig {
    pub action_kit_enabled: bool,
    pub analytics_enabled: bool,
    pub realtime_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterClientConfig {
    pub action_kit_base_url: String,
    pub analytics_base_url: String,
    pub realtime_url: String,
    pub request_timeout_ms: u64,
}

impl Config {
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::info!("loaded .env file from {:?}", path),
            Err(e) => tracing::debug!("no .env file loaded: {}", e),
        }

        let registry = RegistryConfig {
            health_check_interval_ms: parse_env("AEGIS_HEALTH_CHECK_INTERVAL_MS", 30_000u64)?,
            health_probe_timeout_ms: parse_env(
                "AEGIS_HEALTH_PROBE_TIMEOUT_MS",
                constants::DEFAULT_HEALTH_PROBE_TIMEOUT_MS,
            )?,
            failure_threshold: parse_env(
                "AEGIS_FAILURE_THRESHOLD",
                constants::DEFAULT_FAILURE_THRESHOLD,
            )?,
            success_threshold: parse_env(
                "AEGIS_SUCCESS_THRESHOLD",
                constants::DEFAULT_SUCCESS_THRESHOLD,
            )?,
            max_operations_per_adapter: parse_env("AEGIS_MAX_OPS_PER_ADAPTER", 10u32)?,
            load_balancing_weights: parse_env_weights("AEGIS_LOAD_BALANCING_WEIGHTS")?,
            adapter_config: AdapterRegistryConfig {
                enable_load_balancing: parse_env("AEGIS_ADAPTER_ENABLE_LOAD_BALANCING", true)?,
                max_adapters_per_type: parse_env("AEGIS_MAX_ADAPTERS_PER_TYPE", 10u32)?,
                health_check_timeout_ms: parse_env(
                    "AEGIS_ADAPTER_HEALTH_CHECK_TIMEOUT_MS",
                    constants::DEFAULT_HEALTH_PROBE_TIMEOUT_MS,
                )?,
                failover_enabled: parse_env("AEGIS_ADAPTER_FAILOVER_ENABLED", true)?,
            },
        };

        let router = RouterConfig {
            max_message_queue_size: parse_env(
                "AEGIS_MAX_MESSAGE_QUEUE_SIZE",
                constants::MAX_MESSAGE_QUEUE_SIZE,
            )?,
            max_adapter_queue_size: parse_env(
                "AEGIS_MAX_ADAPTER_QUEUE_SIZE",
                constants::MAX_ADAPTER_QUEUE_SIZE,
            )?,
            queue_poll_interval_ms: parse_env(
                "AEGIS_QUEUE_POLL_INTERVAL_MS",
                constants::QUEUE_POLL_INTERVAL_MS,
            )?,
            default_retry_attempts: parse_env("AEGIS_DEFAULT_RETRY_ATTEMPTS", 3u32)?,
            retry_base_delay_ms: parse_env("AEGIS_RETRY_BASE_DELAY_MS", 100u64)?,
            retry_max_backoff_ms: parse_env("AEGIS_RETRY_MAX_BACKOFF_MS", 5_000u64)?,
            max_concurrent_messages: parse_env(
                "AEGIS_MAX_CONCURRENT_MESSAGES",
                constants::DEFAULT_MAX_CONCURRENT_MESSAGES,
            )?,
            message_timeout_ms: parse_env(
                "AEGIS_MESSAGE_TIMEOUT_MS",
                constants::DEFAULT_MESSAGE_TIMEOUT_MS,
            )?,
            backoff_multiplier: parse_env(
                "AEGIS_BACKOFF_MULTIPLIER",
                constants::DEFAULT_BACKOFF_MULTIPLIER,
            )?,
            enable_parallel_execution: parse_env("AEGIS_ENABLE_PARALLEL_EXECUTION", true)?,
            adapter_routing: AdapterRoutingConfig {
                enable_adapter_messages: parse_env("AEGIS_ENABLE_ADAPTER_MESSAGES", true)?,
                adapter_timeout_ms: parse_env(
                    "AEGIS_ADAPTER_TIMEOUT_MS",
                    constants::DEFAULT_ADAPTER_TIMEOUT_MS,
                )?,
                max_concurrent_adapter_calls: parse_env(
                    "AEGIS_MAX_CONCURRENT_ADAPTER_CALLS",
                    constants::DEFAULT_MAX_CONCURRENT_ADAPTER_CALLS,
                )?,
                prioritize_adapters_by_type: parse_env(
                    "AEGIS_PRIORITIZE_ADAPTERS_BY_TYPE",
                    false,
                )?,
            },
        };

        let orchestrator = OrchestratorConfig {
            max_stored_tasks: parse_env("AEGIS_MAX_STORED_TASKS", constants::MAX_STORED_TASKS)?,
            max_stored_results: parse_env(
                "AEGIS_MAX_STORED_RESULTS",
                constants::MAX_STORED_RESULTS,
            )?,
            session_ttl_seconds: parse_env("AEGIS_SESSION_TTL_SECONDS", 1_800u64)?,
            max_concurrent_intents: parse_env("AEGIS_MAX_CONCURRENT_INTENTS", 16usize)?,
            agent_health_check_interval_ms: parse_env(
                "AEGIS_AGENT_HEALTH_CHECK_INTERVAL_MS",
                30_000u64,
            )?,
            load_balancing: parse_env_load_balancing("AEGIS_LOAD_BALANCING")?,
            message_retry_policy: MessageRetryPolicyConfig {
                max_retries: parse_env("AEGIS_MESSAGE_RETRY_MAX_RETRIES", 3u32)?,
                backoff_multiplier: parse_env(
                    "AEGIS_MESSAGE_RETRY_BACKOFF_MULTIPLIER",
                    constants::DEFAULT_BACKOFF_MULTIPLIER,
                )?,
                max_backoff_ms: parse_env("AEGIS_MESSAGE_RETRY_MAX_BACKOFF_MS", 5_000u64)?,
                retryable_errors: parse_env_list(
                    "AEGIS_MESSAGE_RETRYABLE_ERRORS",
                    &["timeout", "network_error", "temporary_unavailable"],
                ),
            },
            adapters: AdapterTogglesConfig {
                action_kit_enabled: parse_env("AEGIS_ADAPTER_ACTION_KIT_ENABLED", true)?,
                analytics_enabled: parse_env("AEGIS_ADAPTER_ANALYTICS_ENABLED", true)?,
                realtime_enabled: parse_env("AEGIS_ADAPTER_REALTIME_ENABLED", true)?,
            },
        };

        let adapters = AdapterClientConfig {
            action_kit_base_url: env::var("AEGIS_ACTION_KIT_URL")
                .unwrap_or_else(|_| "http://localhost:4001".to_string()),
            analytics_base_url: env::var("AEGIS_ANALYTICS_URL")
                .unwrap_or_else(|_| "http://localhost:4002".to_string()),
            realtime_url: env::var("AEGIS_REALTIME_URL")
                .unwrap_or_else(|_| "ws://localhost:4003/ws".to_string()),
            request_timeout_ms: parse_env("AEGIS_ADAPTER_REQUEST_TIMEOUT_MS", 5_000u64)?,
        };

        Ok(Config {
            registry,
            router,
            orchestrator,
            adapters,
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw.parse::<T>().map_err(|_| {
            OrchestratorError::Configuration(format!("{key} is set but not a valid value"))
        }),
        Err(_) => Ok(default),
    }
}

/// Comma-separated list env var, e.g. `"timeout,network_error"`. Falls back
/// to `defaults` (as owned strings) when unset or empty.
fn parse_env_list(key: &str, defaults: &[&str]) -> Vec<String> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
        }
        _ => defaults.iter().map(|s| s.to_string()).collect(),
    }
}

/// `id=weight` pairs separated by commas, e.g. `"lend1=1.5,lend2=0.8"`.
fn parse_env_weights(key: &str) -> Result<HashMap<String, f64>> {
    let mut weights = HashMap::new();
    let Ok(raw) = env::var(key) else {
        return Ok(weights);
    };
    for pair in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (id, weight) = pair.split_once('=').ok_or_else(|| {
            OrchestratorError::Configuration(format!(
                "{key} entry '{pair}' is not in 'id=weight' form"
            ))
        })?;
        let weight: f64 = weight.parse().map_err(|_| {
            OrchestratorError::Configuration(format!("{key} entry '{pair}' has a non-numeric weight"))
        })?;
        weights.insert(id.to_string(), weight);
    }
    Ok(weights)
}

fn parse_env_load_balancing(key: &str) -> Result<LoadBalancingStrategy> {
    match env::var(key) {
        Ok(raw) => match raw.as_str() {
            "round_robin" => Ok(LoadBalancingStrategy::RoundRobin),
            "least_connections" => Ok(LoadBalancingStrategy::LeastConnections),
            "capability_based" => Ok(LoadBalancingStrategy::CapabilityBased),
            other => Err(OrchestratorError::Configuration(format!(
                "{key} '{other}' is not one of round_robin, least_connections, capability_based"
            ))),
        },
        Err(_) => Ok(LoadBalancingStrategy::default()),
    }
}
