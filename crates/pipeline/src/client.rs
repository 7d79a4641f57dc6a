//! Augmentation backend client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use relaycast_config::AugmentationConfig;

#[derive(Debug, Error)]
pub enum AugmentationError {
    #[error("augmentation deployment is not configured")]
    DeploymentMissing,
    #[error("augmentation api key is not configured")]
    ApiKeyMissing,
    #[error("augmentation request timed out")]
    DeadlineExceeded,
    #[error("augmentation request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl AugmentationError {
    /// Configuration errors skip the call entirely and consume no retry
    /// budget.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::DeploymentMissing | Self::ApiKeyMissing)
    }

    pub fn is_deadline(&self) -> bool {
        matches!(self, Self::DeadlineExceeded)
    }
}

/// One completion request: the full message text (marker included, the
/// backend sees what the user typed) and the response-length budget.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: u32,
}

/// Capability for one bounded completion call against the generative-text
/// backend. `Ok(None)` means the service answered without content, which is
/// non-fatal for the caller.
#[async_trait]
pub trait AugmentationClient: Send + Sync {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<Option<String>, AugmentationError>;
}

/// HTTP client for an OpenAI-compatible chat-completions endpoint.
///
/// Constructed once at process start and shared read-only across all
/// pipeline workers. Missing credentials or deployment are reported on the
/// first call rather than at construction, so the relay keeps serving
/// pass-through traffic when augmentation is unconfigured.
pub struct HttpAugmentationClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    deployment: Option<String>,
}

impl HttpAugmentationClient {
    pub fn from_config(config: &AugmentationConfig) -> Result<Self, AugmentationError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            deployment: config.deployment.clone(),
        })
    }
}

#[async_trait]
impl AugmentationClient for HttpAugmentationClient {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<Option<String>, AugmentationError> {
        let deployment = self
            .deployment
            .as_deref()
            .ok_or(AugmentationError::DeploymentMissing)?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AugmentationError::ApiKeyMissing)?;

        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionBody {
            model: deployment,
            messages: vec![ChatMessageBody {
                role: "user",
                content: &request.prompt,
            }],
            max_tokens: request.max_tokens,
        };

        debug!(model = deployment, "sending completion request");

        let response = self
            .http
            .post(url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify)?
            .error_for_status()
            .map_err(classify)?;

        let parsed: ChatCompletionResponse = response.json().await.map_err(classify)?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.is_empty());

        Ok(content)
    }
}

fn classify(error: reqwest::Error) -> AugmentationError {
    if error.is_timeout() {
        AugmentationError::DeadlineExceeded
    } else {
        AugmentationError::Http(error)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessageBody<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessageBody<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
