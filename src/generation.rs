//! Client for the local reply generation service

use crate::config::AssistConfig;
use crate::error::{AssistError, AssistResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;

/// Body of the generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub email_content: String,
    pub tone: String,
}

impl GenerationRequest {
    pub fn new(email_content: impl Into<String>, tone: impl Into<String>) -> Self {
        Self {
            email_content: email_content.into(),
            tone: tone.into(),
        }
    }
}

/// Anything that can turn an email into a reply
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Produce reply text for the request
    async fn generate(&self, request: &GenerationRequest) -> AssistResult<String>;
}

/// Generator backed by the HTTP endpoint
pub struct HttpReplyGenerator {
    client: Client,
    endpoint: String,
    request_timeout: Duration,
}

impl HttpReplyGenerator {
    pub fn new(endpoint: String, request_timeout: Duration) -> Self {
        let client = match Client::builder().timeout(request_timeout).build() {
            Ok(client) => client,
            Err(e) => {
                // The outer tokio timeout in `generate` still bounds every request.
                tracing::warn!("Failed to build HTTP client, using defaults: {}", e);
                Client::new()
            }
        };

        Self {
            client,
            endpoint,
            request_timeout,
        }
    }

    pub fn from_config(config: &AssistConfig) -> Self {
        Self::new(config.endpoint.clone(), config.request_timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn timed_out(&self) -> AssistError {
        AssistError::Timeout {
            timeout: self.request_timeout,
        }
    }

    /// The client and the outer timer share one deadline; whichever fires reports it
    fn request_error(&self, err: reqwest::Error) -> AssistError {
        if err.is_timeout() {
            self.timed_out()
        } else {
            AssistError::from(err)
        }
    }
}

#[async_trait]
impl ReplyGenerator for HttpReplyGenerator {
    fn name(&self) -> &str {
        "http"
    }

    async fn generate(&self, request: &GenerationRequest) -> AssistResult<String> {
        tracing::debug!(
            "POST {} ({} chars of email content, tone {})",
            self.endpoint,
            request.email_content.len(),
            request.tone
        );

        let response = timeout(
            self.request_timeout,
            self.client.post(&self.endpoint).json(request).send(),
        )
        .await
        .map_err(|_| self.timed_out())?
        .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssistError::HttpStatus {
                status: status.as_u16(),
            });
        }

        // The whole body is the reply; no further parsing.
        let reply = response.text().await.map_err(|e| self.request_error(e))?;
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_camel_case_keys() {
        let request = GenerationRequest::new("Hello", "professional");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "emailContent": "Hello", "tone": "professional" })
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_failure() {
        // Port 9 (discard) is almost never listening on loopback.
        let generator = HttpReplyGenerator::new(
            "http://127.0.0.1:9/api/email/generate".to_string(),
            Duration::from_secs(2),
        );
        let err = generator
            .generate(&GenerationRequest::new("", "professional"))
            .await
            .unwrap_err();
        assert!(err.is_network_failure());
    }

    #[tokio::test]
    async fn test_silent_endpoint_reports_configured_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let generator = HttpReplyGenerator::new(
            format!("http://{}/api/email/generate", addr),
            Duration::from_millis(200),
        );
        let err = generator
            .generate(&GenerationRequest::new("", "professional"))
            .await
            .unwrap_err();

        match err {
            AssistError::Timeout { timeout } => assert_eq!(timeout, Duration::from_millis(200)),
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
