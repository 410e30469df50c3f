use crate::domain::model::{Classification, ClassificationRequest};
use crate::domain::ports::RelevanceOracle;
use crate::utils::error::{ReliefError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ZeroShotPayload<'a> {
    inputs: &'a str,
    parameters: ZeroShotParameters<'a>,
}

#[derive(Debug, Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [String],
    multi_label: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    hypothesis_template: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ZeroShotResponse {
    labels: Vec<String>,
    scores: Vec<f32>,
}

/// Zero-shot classification over HTTP, in the shape served by hosted NLI
/// models: POST `{"inputs", "parameters": {...}}`, answer
/// `{"sequence", "labels", "scores"}`. Labels usually come back sorted by
/// score, so callers must match scores by label.
#[derive(Debug, Clone)]
pub struct HttpOracle {
    client: Client,
    endpoint: String,
    api_token: Option<String>,
    timeout: Option<Duration>,
}

impl HttpOracle {
    pub fn new(endpoint: impl Into<String>, api_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_token,
            timeout: None,
        }
    }

    /// Same as `new` with a transport-level timeout on every request. Expiry
    /// surfaces as `OracleTimeout`, like the engine's own deadline.
    pub fn with_timeout(
        endpoint: impl Into<String>,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_token,
            timeout: Some(timeout),
        })
    }

    fn transport_error(&self, error: reqwest::Error) -> ReliefError {
        match self.timeout {
            Some(after) if error.is_timeout() => ReliefError::OracleTimeout { after },
            _ => ReliefError::OracleRequestError(error),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RelevanceOracle for HttpOracle {
    async fn classify(&self, request: ClassificationRequest) -> Result<Classification> {
        let payload = ZeroShotPayload {
            inputs: &request.sequence,
            parameters: ZeroShotParameters {
                candidate_labels: &request.candidate_labels,
                multi_label: request.multi_label,
                hypothesis_template: request.hypothesis_template.as_deref(),
            },
        };

        tracing::debug!(
            "Making classification request to: {} ({} labels)",
            self.endpoint,
            request.candidate_labels.len()
        );

        let mut builder = self.client.post(&self.endpoint).json(&payload);
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        tracing::debug!("Oracle response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReliefError::OracleStatusError {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        let parsed: ZeroShotResponse =
            serde_json::from_slice(&bytes).map_err(|e| ReliefError::OracleResponseError {
                reason: format!("unexpected response body: {}", e),
            })?;

        Ok(Classification {
            labels: parsed.labels,
            scores: parsed.scores,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn request(labels: &[&str]) -> ClassificationRequest {
        ClassificationRequest {
            sequence: "I clean my own uniform".to_string(),
            candidate_labels: labels.iter().map(|l| l.to_string()).collect(),
            multi_label: true,
            hypothesis_template: Some("This expense relates to {}.".to_string()),
        }
    }

    #[tokio::test]
    async fn test_classify_posts_payload_and_parses_scores() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/classify")
                .header("authorization", "Bearer secret")
                .json_body(serde_json::json!({
                    "inputs": "I clean my own uniform",
                    "parameters": {
                        "candidate_labels": ["uniform", "tools"],
                        "multi_label": true,
                        "hypothesis_template": "This expense relates to {}."
                    }
                }));
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "sequence": "I clean my own uniform",
                    "labels": ["uniform", "tools"],
                    "scores": [0.92, 0.04]
                }));
        });

        let oracle = HttpOracle::new(server.url("/classify"), Some("secret".to_string()));
        let result = oracle.classify(request(&["uniform", "tools"])).await.unwrap();

        api_mock.assert();
        assert_eq!(result.labels, vec!["uniform", "tools"]);
        assert_eq!(result.scores, vec![0.92, 0.04]);
    }

    #[tokio::test]
    async fn test_classify_surfaces_status_errors() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path("/classify");
            then.status(503).body("model loading");
        });

        let oracle = HttpOracle::new(server.url("/classify"), None);
        let err = oracle.classify(request(&["uniform"])).await.unwrap_err();

        api_mock.assert();
        match err {
            ReliefError::OracleStatusError { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "model loading");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_timeout_is_reported_as_timeout() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/classify");
            then.status(200)
                .delay(Duration::from_millis(500))
                .json_body(serde_json::json!({"labels": ["uniform"], "scores": [0.9]}));
        });

        let oracle =
            HttpOracle::with_timeout(server.url("/classify"), None, Duration::from_millis(50))
                .unwrap();
        let err = oracle.classify(request(&["uniform"])).await.unwrap_err();

        match err {
            ReliefError::OracleTimeout { after } => {
                assert_eq!(after, Duration::from_millis(50));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_classify_rejects_unexpected_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/classify");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"error": "nope"}));
        });

        let oracle = HttpOracle::new(server.url("/classify"), None);
        let err = oracle.classify(request(&["uniform"])).await.unwrap_err();
        assert!(matches!(err, ReliefError::OracleResponseError { .. }));
    }
}
