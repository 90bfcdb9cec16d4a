use crate::models::IntentContext;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

struct Session {
    context: IntentContext,
    last_active: DateTime<Utc>,
}

/// Tracks per-session conversational context (wallet address, prior intent
/// ids) in memory only — persisting sessions across restarts is an explicit
/// non-goal. Expires sessions idle past the configured TTL rather than
/// keeping them forever.
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::seconds(ttl_seconds as i64),
        }
    }

    pub async fn context_for(&self, session_id: &str) -> IntentContext {
        let mut sessions = self.sessions.write().await;
        self.evict_expired(&mut sessions);
        match sessions.get_mut(session_id) {
            Some(session) => {
                session.last_active = Utc::now();
                session.context.clone()
            }
            None => {
                let context = IntentContext::new(session_id);
                sessions.insert(
                    session_id.to_string(),
                    Session {
                        context: context.clone(),
                        last_active: Utc::now(),
                    },
                );
                context
            }
        }
    }

    pub async fn record_intent(&self, session_id: &str, intent_id: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(session_id) {
            session.context.previous_intents.push(intent_id.to_string());
            session.last_active = Utc::now();
        }
    }

    /// Returns the set of session ids dropped for having gone idle past the
    /// configured TTL. Called both from `context_for` (lazily, under the
    /// write lock already held) and can be driven externally on a timer.
    pub async fn sweep_expired(&self) -> Vec<String> {
        let mut sessions = self.sessions.write().await;
        self.evict_expired(&mut sessions)
    }

    fn evict_expired(&self, sessions: &mut HashMap<String, Session>) -> Vec<String> {
        let now = Utc::now();
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, session)| now - session.last_active > self.ttl)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            sessions.remove(id);
            debug!(session_id = id, "session expired");
        }
        expired
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn context_persists_previous_intents_across_calls() {
        let store = SessionStore::new(3600);
        let _ = store.context_for("s1").await;
        store.record_intent("s1", "intent-1").await;
        let context = store.context_for("s1").await;
        assert_eq!(context.previous_intents, vec!["intent-1".to_string()]);
    }

    #[tokio::test]
    async fn expired_sessions_are_swept() {
        let store = SessionStore::new(0);
        let _ = store.context_for("s1").await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let expired = store.sweep_expired().await;
        assert_eq!(expired, vec!["s1".to_string()]);
        assert_eq!(store.len().await, 0);
    }
}
