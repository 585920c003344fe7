//! OpenAI provider.
//!
//! Covers both API flavors still seen in the wild: chat completions
//! (`choices[0].message.content`) and legacy completions
//! (`choices[0].text`). Credential travels as a bearer token.

use super::{
    check_status, transport_error, FinishReason, GenerationParams, ProviderError,
    ProviderResponse, TextProvider,
};
use async_trait::async_trait;
use reqwest::header;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenAI provider configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

/// Which OpenAI endpoint family to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAiFlavor {
    Chat,
    Completions,
}

pub struct OpenAiTextProvider {
    config: OpenAiConfig,
    flavor: OpenAiFlavor,
    client: Client,
}

impl OpenAiTextProvider {
    pub fn new(config: OpenAiConfig, flavor: OpenAiFlavor) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            flavor,
            client,
        }
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ProviderError::NotConfigured("OpenAI API key not set".to_string()))
    }
}

#[async_trait]
impl TextProvider for OpenAiTextProvider {
    fn name(&self) -> &'static str {
        match self.flavor {
            OpenAiFlavor::Chat => "openai-chat",
            OpenAiFlavor::Completions => "openai-completions",
        }
    }

    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        // Credential check must precede any network attempt.
        let api_key = self.api_key()?;

        tracing::debug!(
            model = %self.config.model,
            flavor = self.name(),
            prompt_len = prompt.len(),
            "Sending request to OpenAI API"
        );

        let response = match self.flavor {
            OpenAiFlavor::Chat => {
                let request = ChatRequest {
                    model: self.config.model.clone(),
                    messages: vec![ChatMessage {
                        role: "user".to_string(),
                        content: prompt.to_string(),
                    }],
                    max_tokens: params.max_output_tokens,
                    temperature: params.temperature,
                };
                self.client
                    .post(format!("{}/chat/completions", self.config.base_url))
                    .header(header::AUTHORIZATION, format!("Bearer {}", api_key))
                    .json(&request)
                    .send()
                    .await
            }
            OpenAiFlavor::Completions => {
                let request = CompletionRequest {
                    model: self.config.model.clone(),
                    prompt: prompt.to_string(),
                    max_tokens: params.max_output_tokens,
                    temperature: params.temperature,
                };
                self.client
                    .post(format!("{}/completions", self.config.base_url))
                    .header(header::AUTHORIZATION, format!("Bearer {}", api_key))
                    .json(&request)
                    .send()
                    .await
            }
        }
        .map_err(transport_error)?;

        let response = check_status(response, "OpenAI").await?;

        let (text, finish_reason) = match self.flavor {
            OpenAiFlavor::Chat => {
                let api_response: ChatResponse = response.json().await.map_err(|e| {
                    ProviderError::Network(format!("failed to decode OpenAI response: {}", e))
                })?;
                let choice = api_response.choices.into_iter().next();
                (
                    choice
                        .as_ref()
                        .and_then(|c| c.message.content.as_deref())
                        .map(|text| text.trim().to_string()),
                    choice.and_then(|c| c.finish_reason),
                )
            }
            OpenAiFlavor::Completions => {
                let api_response: CompletionResponse = response.json().await.map_err(|e| {
                    ProviderError::Network(format!("failed to decode OpenAI response: {}", e))
                })?;
                let choice = api_response.choices.into_iter().next();
                (
                    choice
                        .as_ref()
                        .and_then(|c| c.text.as_deref())
                        .map(|text| text.trim().to_string()),
                    choice.and_then(|c| c.finish_reason),
                )
            }
        };

        Ok(ProviderResponse {
            text: text.filter(|t| !t.is_empty()),
            finish_reason: map_finish_reason(finish_reason.as_deref()),
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        self.api_key().map(|_| ())
    }
}

fn map_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("length") => FinishReason::Length,
        Some("content_filter") => FinishReason::ContentFilter,
        _ => FinishReason::Complete,
    }
}

// ============================================================================
// OpenAI API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    prompt: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    finish_reason: Option<String>,
}
