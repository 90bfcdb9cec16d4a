//! System-wide tunables. Values are conservative defaults; everything here
//! is overridable through `Config`.

/// Poll interval for queue workers that find nothing to do.
pub const QUEUE_POLL_INTERVAL_MS: u64 = 50;

/// Maximum messages held in the router's FIFO queue before `route` starts
/// surfacing `Concurrency` errors instead of queueing silently.
pub const MAX_MESSAGE_QUEUE_SIZE: usize = 2000;

/// Maximum adapter operations held in the priority queue.
pub const MAX_ADAPTER_QUEUE_SIZE: usize = 2000;

/// Cap on agent/adapter suggestion lists returned alongside `NoAvailable`.
pub const MAX_SUGGESTIONS: usize = 3;

// Weighted load score for `AgentRegistry::find_best` (spec section 4.1).
// Tuned so that one active task roughly offsets a 20% error rate, and
// latency only breaks near-ties between otherwise equal candidates.
pub const LOAD_WEIGHT_ACTIVE_TASKS: f64 = 10.0;
pub const LOAD_WEIGHT_ERROR_RATE: f64 = 50.0;
pub const LOAD_WEIGHT_LATENCY_MS: f64 = 0.01;

/// Bound applied to the in-memory task/result tables so a long-running
/// process doesn't grow without limit (there is no persistence to spill to).
pub const MAX_STORED_TASKS: usize = 10_000;
pub const MAX_STORED_RESULTS: usize = 10_000;

/// Circuit breaker defaults for adapter instance health (grounded on the
/// teacher's `claude_code::circuit_breaker` defaults).
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
pub const DEFAULT_SUCCESS_THRESHOLD: u32 = 2;
pub const DEFAULT_HEALTH_PROBE_TIMEOUT_MS: u64 = 2_000;

/// Default exponential backoff multiplier: `delay = base * multiplier^attempt`.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Default bound on simultaneous in-flight message and adapter dispatches.
pub const DEFAULT_MAX_CONCURRENT_MESSAGES: usize = 16;
pub const DEFAULT_MAX_CONCURRENT_ADAPTER_CALLS: usize = 8;
pub const DEFAULT_MESSAGE_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_ADAPTER_TIMEOUT_MS: u64 = 10_000;

/// Parameter amount past which a transaction is flagged `high_value_transaction`.
pub const HIGH_VALUE_THRESHOLD: f64 = 50_000.0;
