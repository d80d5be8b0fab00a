//! Remote Model Classifier (Layer A)
//!
//! Sends one structured-output request per post to an OpenAI-compatible
//! chat-completions endpoint and parses the JSON answer.
//!
//! # Confidence
//! Taken from the model answer (clamped to 0.0-1.0). Voting weight 3.
//!
//! # Failure
//! Transport errors, non-success status codes and unparseable answers are all
//! returned as `ClassifierError` so the consensus engine can exclude the layer.

use super::{build_prompt, parse_model_output};
use crate::error::ClassifierError;
use crate::rate_limiter::{ProviderRateLimiter, REMOTE_PROVIDER};
use crate::types::{Classifier, ClassifierOutput, LayerKind};
use async_trait::async_trait;
use posint_common::config::RemoteProviderConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const SOURCE_ID: &str = "remote_model";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    response_format: ResponseFormat,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatAnswer,
}

#[derive(Debug, Deserialize)]
struct ChatAnswer {
    #[serde(default)]
    content: Option<String>,
}

/// Hosted model layer
pub struct RemoteModelClassifier {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: String,
    rate_limiter: Arc<ProviderRateLimiter>,
}

impl RemoteModelClassifier {
    /// Create remote classifier
    ///
    /// # Errors
    /// `ClassifierError::NotAvailable` if no API key is configured or the HTTP
    /// client cannot be built.
    pub fn new(
        config: &RemoteProviderConfig,
        api_key: Option<&str>,
        rate_limiter: Arc<ProviderRateLimiter>,
    ) -> Result<Self, ClassifierError> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ClassifierError::NotAvailable("remote provider API key not configured".to_string())
            })?
            .to_string();

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ClassifierError::NotAvailable(format!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            rate_limiter,
        })
    }

    async fn request_completion(&self, text: &str) -> Result<String, ClassifierError> {
        let prompt = build_prompt(text);
        let request = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You are a precise information extraction engine. Output JSON only.",
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Api(format!(
                "remote provider returned {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                ClassifierError::Parse("remote provider returned no content".to_string())
            })
    }
}

#[async_trait]
impl Classifier for RemoteModelClassifier {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Remote
    }

    async fn classify(&self, text: &str) -> Result<ClassifierOutput, ClassifierError> {
        self.rate_limiter.acquire_permit(REMOTE_PROVIDER).await;

        debug!(model = %self.model, "Requesting remote classification");
        let content = self.request_completion(text).await?;
        let output = parse_model_output(SOURCE_ID, &content)?;

        debug!(
            event_type = %output.event_type,
            confidence = output.confidence,
            locations = output.locations.len(),
            "Remote classification complete"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        let result = RemoteModelClassifier::new(
            &RemoteProviderConfig::default(),
            None,
            Arc::new(ProviderRateLimiter::new()),
        );
        assert!(matches!(result, Err(ClassifierError::NotAvailable(_))));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = RemoteProviderConfig {
            base_url: "https://example.invalid/v1/".to_string(),
            ..Default::default()
        };
        let client =
            RemoteModelClassifier::new(&config, Some("k"), Arc::new(ProviderRateLimiter::new()))
                .unwrap();
        assert_eq!(client.base_url, "https://example.invalid/v1");
        assert_eq!(client.kind(), LayerKind::Remote);
    }

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest {
            model: "m",
            temperature: 0.0,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_error() {
        let config = RemoteProviderConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..Default::default()
        };
        let client =
            RemoteModelClassifier::new(&config, Some("k"), Arc::new(ProviderRateLimiter::new()))
                .unwrap();
        let result = client.classify("रायपुर में रैली").await;
        assert!(matches!(result, Err(ClassifierError::Network(_))));
    }
}
