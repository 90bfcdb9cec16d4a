mod action_kit;
mod analytics;
pub mod realtime;

pub use action_kit::ActionKitClient;
pub use analytics::AnalyticsClient;
pub use realtime::RealtimeClient;

use crate::config::AdapterClientConfig;
use crate::error::Result;
use std::sync::Arc;

/// Bundles one client per adapter family behind a single handle, built from
/// `AdapterClientConfig`. The router selects *which instance* to use via
/// `AdapterRegistry`; this just owns the concrete transports that
/// instances' ids resolve to once selected.
pub struct AdapterClients {
    pub action_kit: ActionKitClient,
    pub analytics: AnalyticsClient,
    pub realtime: Arc<RealtimeClient>,
}

impl AdapterClients {
    pub fn new(config: &AdapterClientConfig) -> Result<Self> {
        let action_kit = ActionKitClient::new(config.action_kit_base_url.clone(), config.request_timeout_ms)?;
        let analytics = AnalyticsClient::new(config.analytics_base_url.clone(), config.request_timeout_ms)?;
        let realtime = Arc::new(RealtimeClient::new(config.realtime_url.clone()));
        Arc::clone(&realtime).spawn();

        Ok(Self {
            action_kit,
            analytics,
            realtime,
        })
    }
}
