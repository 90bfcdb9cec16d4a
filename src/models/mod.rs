mod adapter;
mod agent;
mod capability;
mod intent;
mod message;
mod task;
mod result;

pub use adapter::{AdapterFamily, AdapterInstanceRecord, AdapterStatus};
pub use agent::{AgentRecord, AgentStatus, AgentType, LoadBalancingStrategy, LoadMetrics, LoadMetricsDelta};
pub use capability::{Capability, ParameterSpec};
pub use intent::{AnalyzedIntent, Complexity, Intent, IntentContext, IntentType, Priority};
pub use message::{Message, MessageType};
pub use result::{ResultStatus, TaskError, TaskResult};
pub use task::{Task, TaskStatus};
