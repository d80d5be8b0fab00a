//! Local Model Classifier (Layer B)
//!
//! Self-hosted model behind an Ollama-compatible `/api/generate` endpoint.
//! Same contract as the remote layer, separate permit bucket, voting weight 2.

use super::{build_prompt, parse_model_output};
use crate::error::ClassifierError;
use crate::rate_limiter::{ProviderRateLimiter, LOCAL_PROVIDER};
use crate::types::{Classifier, ClassifierOutput, LayerKind};
use async_trait::async_trait;
use posint_common::config::LocalProviderConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const SOURCE_ID: &str = "local_model";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'static str,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Self-hosted model layer
pub struct LocalModelClassifier {
    http_client: Client,
    base_url: String,
    model: String,
    rate_limiter: Arc<ProviderRateLimiter>,
}

impl LocalModelClassifier {
    /// Create local classifier
    ///
    /// # Errors
    /// `ClassifierError::NotAvailable` if the HTTP client cannot be built
    pub fn new(
        config: &LocalProviderConfig,
        rate_limiter: Arc<ProviderRateLimiter>,
    ) -> Result<Self, ClassifierError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(2))
            .build()
            .map_err(|e| ClassifierError::NotAvailable(format!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            rate_limiter,
        })
    }
}

#[async_trait]
impl Classifier for LocalModelClassifier {
    fn source_id(&self) -> &'static str {
        SOURCE_ID
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Local
    }

    async fn classify(&self, text: &str) -> Result<ClassifierOutput, ClassifierError> {
        self.rate_limiter.acquire_permit(LOCAL_PROVIDER).await;

        let prompt = build_prompt(text);
        let request = GenerateRequest {
            model: &self.model,
            prompt: &prompt,
            stream: false,
            format: "json",
            options: GenerateOptions { temperature: 0.0 },
        };

        debug!(model = %self.model, "Requesting local classification");
        let response = self
            .http_client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Api(format!(
                "local provider returned {}: {}",
                status, body
            )));
        }

        let generated: GenerateResponse = response.json().await?;
        if generated.response.trim().is_empty() {
            return Err(ClassifierError::Parse(
                "local provider returned an empty response".to_string(),
            ));
        }

        let output = parse_model_output(SOURCE_ID, &generated.response)?;
        debug!(
            event_type = %output.event_type,
            confidence = output.confidence,
            "Local classification complete"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = GenerateRequest {
            model: "llama",
            prompt: "p",
            stream: false,
            format: "json",
            options: GenerateOptions { temperature: 0.0 },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["format"], "json");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_error() {
        let config = LocalProviderConfig {
            base_url: "http://127.0.0.1:9/".to_string(),
            timeout_secs: 2,
            ..Default::default()
        };
        let client =
            LocalModelClassifier::new(&config, Arc::new(ProviderRateLimiter::new())).unwrap();
        assert_eq!(client.kind(), LayerKind::Local);
        assert!(client.classify("बैठक").await.is_err());
    }
}
