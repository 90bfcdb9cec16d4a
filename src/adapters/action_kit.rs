use crate::error::{OrchestratorError, Result};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client for the actionKit adapter family: blockchain action
/// execution endpoints (supply, borrow, swap, ...). A thin wrapper over
/// `reqwest` — the interesting behavior (instance selection, retries,
/// health tracking) lives in `MessageRouter` and `AdapterRegistry`, not
/// here.
#[derive(Clone)]
pub struct ActionKitClient {
    http: Client,
    base_url: String,
}

impl ActionKitClient {
    pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| OrchestratorError::Configuration(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub async fn execute(&self, action: &str, params: &Value) -> Result<Value> {
        let url = format!("{}/actions/{}", self.base_url.trim_end_matches('/'), action);
        debug!(url, "dispatching actionKit request");

        let response = self
            .http
            .post(&url)
            .json(params)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body, "actionKit request failed");
            return Err(OrchestratorError::Transient(format!(
                "actionKit returned {status}: {body}"
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| OrchestratorError::Fatal(format!("invalid actionKit response: {e}")))
    }

    /// Liveness probe for the health monitor: a bare GET against the
    /// service root, treating any response (even a non-2xx one) as "the
    /// service is reachable" since actionKit has no dedicated health route.
    pub async fn ping(&self) -> Result<bool> {
        match self.http.get(&self.base_url).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                debug!(error = %e, "actionKit liveness probe failed");
                Ok(false)
            }
        }
    }
}

fn classify_reqwest_error(error: reqwest::Error) -> OrchestratorError {
    if error.is_timeout() {
        OrchestratorError::Timeout(0)
    } else if error.is_connect() {
        OrchestratorError::Transient(format!("actionKit connection failed: {error}"))
    } else {
        OrchestratorError::Fatal(format!("actionKit request error: {error}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn execute_returns_parsed_body_on_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/actions/supply")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"txHash":"0xabc"}"#)
            .create_async()
            .await;

        let client = ActionKitClient::new(server.url(), 1_000).unwrap();
        let result = client.execute("supply", &json!({"amount": 10})).await.unwrap();
        assert_eq!(result["txHash"], "0xabc");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_2xx_status_is_transient() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/actions/supply")
            .with_status(503)
            .with_body("service unavailable")
            .create_async()
            .await;

        let client = ActionKitClient::new(server.url(), 1_000).unwrap();
        let error = client.execute("supply", &json!({})).await.unwrap_err();
        assert!(matches!(error, OrchestratorError::Transient(_)));
    }
}
