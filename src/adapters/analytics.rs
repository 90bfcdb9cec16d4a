use crate::error::{OrchestratorError, Result};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// HTTP client for the analytics adapter family: read-only portfolio and
/// market data queries. Mirrors `ActionKitClient`'s shape with a GET
/// instead of a POST since analytics calls carry query parameters, not a
/// transaction payload.
#[derive(Clone)]
pub struct AnalyticsClient {
    http: Client,
    base_url: String,
}

impl AnalyticsClient {
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

    pub async fn query(&self, action: &str, params: &Value) -> Result<Value> {
        let url = format!("{}/analytics/{}", self.base_url.trim_end_matches('/'), action);
        debug!(url, "dispatching analytics request");

        let response = self
            .http
            .get(&url)
            .query(&flatten_query(params))
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(OrchestratorError::Transient(format!(
                "analytics adapter returned {status}"
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| OrchestratorError::Fatal(format!("invalid analytics response: {e}")))
    }

    /// Liveness probe for the health monitor, same shape as
    /// `ActionKitClient::ping`.
    pub async fn ping(&self) -> Result<bool> {
        match self.http.get(&self.base_url).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                debug!(error = %e, "analytics liveness probe failed");
                Ok(false)
            }
        }
    }
}

fn flatten_query(params: &Value) -> Vec<(String, String)> {
    match params.as_object() {
        Some(map) => map
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), value)
            })
            .collect(),
        None => Vec::new(),
    }
}

fn classify_reqwest_error(error: reqwest::Error) -> OrchestratorError {
    if error.is_timeout() {
        OrchestratorError::Timeout(0)
    } else if error.is_connect() {
        OrchestratorError::Transient(format!("analytics connection failed: {error}"))
    } else {
        OrchestratorError::Fatal(format!("analytics request error: {error}"))
    }
}
