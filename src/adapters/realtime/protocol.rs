use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire format for the realtime adapter's JSON-over-WebSocket protocol.
/// Every request carries a `correlation_id` so the transport can match a
/// reply to the caller that is awaiting it, the same id pattern
/// `Message::correlation_id` uses for in-process messages.
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeRequest {
    pub correlation_id: String,
    pub action: String,
    pub params: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeFrame {
    Response {
        correlation_id: String,
        #[serde(default)]
        data: Option<Value>,
        #[serde(default)]
        error: Option<String>,
    },
    Push {
        topic: String,
        data: Value,
    },
    Pong,
}

pub fn ping_frame() -> &'static str {
    r#"{"type":"ping"}"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_frame_deserializes() {
        let raw = r#"{"type":"response","correlation_id":"c1","data":{"ok":true}}"#;
        let frame: RealtimeFrame = serde_json::from_str(raw).unwrap();
        match frame {
            RealtimeFrame::Response { correlation_id, data, error } => {
                assert_eq!(correlation_id, "c1");
                assert_eq!(data.unwrap()["ok"], true);
                assert!(error.is_none());
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn push_frame_deserializes() {
        let raw = r#"{"type":"push","topic":"price","data":{"asset":"ETH"}}"#;
        let frame: RealtimeFrame = serde_json::from_str(raw).unwrap();
        assert!(matches!(frame, RealtimeFrame::Push { .. }));
    }
}
