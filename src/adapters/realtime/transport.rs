use super::protocol::{ping_frame, RealtimeFrame, RealtimeRequest};
use crate::error::{OrchestratorError, Result};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, info, warn};
use uuid::Uuid;

type PendingReplies = Arc<Mutex<HashMap<String, oneshot::Sender<Result<Value>>>>>;

const PING_INTERVAL: Duration = Duration::from_secs(15);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Persistent, reconnecting WebSocket client for the realtime adapter
/// family (price feeds, position updates). Unlike `ActionKitClient` and
/// `AnalyticsClient` this keeps one long-lived connection and multiplexes
/// concurrent requests over it by `correlation_id`, the same way a
/// request/response RPC layer over a single socket would.
pub struct RealtimeClient {
    url: String,
    pending: PendingReplies,
    outbound: Arc<Mutex<Option<tokio::sync::mpsc::UnboundedSender<WsMessage>>>>,
}

impl RealtimeClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pending: Arc::new(Mutex::new(HashMap::new())),
            outbound: Arc::new(Mutex::new(None)),
        }
    }

    /// Spawns the background connection-management task. Reconnects with a
    /// fixed backoff on any disconnect; in-flight requests at the moment of
    /// a drop are failed with a `Transient` error so callers can retry
    /// rather than hang forever.
    pub fn spawn(self: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                match self.run_connection().await {
                    Ok(()) => debug!("realtime connection closed cleanly"),
                    Err(error) => warn!(%error, "realtime connection dropped"),
                }
                self.fail_all_pending(OrchestratorError::Transient(
                    "realtime connection lost".to_string(),
                ))
                .await;
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        });
    }

    async fn run_connection(&self) -> Result<()> {
        let (stream, _response) = connect_async(&self.url)
            .await
            .map_err(|e| OrchestratorError::Transient(format!("realtime connect failed: {e}")))?;
        info!(url = %self.url, "realtime connection established");

        let (mut write, mut read) = stream.split();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<WsMessage>();
        *self.outbound.lock().await = Some(tx);

        let mut ping_tick = tokio::time::interval(PING_INTERVAL);

        loop {
            tokio::select! {
                outgoing = rx.recv() => {
                    match outgoing {
                        Some(message) => {
                            write.send(message).await.map_err(|e| {
                                OrchestratorError::Transient(format!("realtime send failed: {e}"))
                            })?;
                        }
                        None => return Ok(()),
                    }
                }
                incoming = read.next() => {
                    match incoming {
                        Some(Ok(WsMessage::Text(text))) => self.handle_frame(&text).await,
                        Some(Ok(WsMessage::Close(_))) | None => return Ok(()),
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            return Err(OrchestratorError::Transient(format!("realtime read failed: {e}")));
                        }
                    }
                }
                _ = ping_tick.tick() => {
                    write.send(WsMessage::Text(ping_frame().to_string())).await.map_err(|e| {
                        OrchestratorError::Transient(format!("realtime ping failed: {e}"))
                    })?;
                }
            }
        }
    }

    async fn handle_frame(&self, text: &str) {
        let Ok(frame) = serde_json::from_str::<RealtimeFrame>(text) else {
            debug!(text, "ignoring unrecognised realtime frame");
            return;
        };
        match frame {
            RealtimeFrame::Response { correlation_id, data, error } => {
                let mut pending = self.pending.lock().await;
                if let Some(sender) = pending.remove(&correlation_id) {
                    let result = match error {
                        Some(message) => Err(OrchestratorError::Fatal(message)),
                        None => Ok(data.unwrap_or(Value::Null)),
                    };
                    let _ = sender.send(result);
                }
            }
            RealtimeFrame::Push { topic, .. } => {
                debug!(topic, "realtime push frame received, no subscriber wiring yet");
            }
            RealtimeFrame::Pong => {}
        }
    }

    async fn fail_all_pending(&self, error: OrchestratorError) {
        let mut pending = self.pending.lock().await;
        for (_, sender) in pending.drain() {
            let _ = sender.send(Err(error.clone()));
        }
    }

    /// Liveness probe for the health monitor: the connection is considered
    /// alive if the background task has an open outbound sender to the
    /// socket. This doesn't round-trip a frame (the periodic ping in
    /// `run_connection` already does that); it just reports whether the
    /// reconnect loop currently has a live connection.
    pub async fn ping(&self) -> Result<bool> {
        Ok(self.outbound.lock().await.is_some())
    }

    pub async fn call(&self, action: &str, params: Value) -> Result<Value> {
        let correlation_id = Uuid::new_v4().to_string();
        let request = RealtimeRequest {
            correlation_id: correlation_id.clone(),
            action: action.to_string(),
            params,
        };
        let payload = serde_json::to_string(&request)
            .map_err(|e| OrchestratorError::Internal(format!("failed to encode request: {e}")))?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(correlation_id.clone(), tx);

        let sender = self
            .outbound
            .lock()
            .await
            .clone()
            .ok_or_else(|| OrchestratorError::Transient("realtime connection not ready".to_string()))?;
        sender
            .send(WsMessage::Text(payload))
            .map_err(|_| OrchestratorError::Transient("realtime connection closed".to_string()))?;

        match tokio::time::timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(OrchestratorError::Transient("realtime reply channel dropped".to_string())),
            Err(_) => {
                self.pending.lock().await.remove(&correlation_id);
                Err(OrchestratorError::Timeout(REQUEST_TIMEOUT.as_millis() as u64))
            }
        }
    }
}
