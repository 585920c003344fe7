//! Generative-text provider abstractions and implementations.
//!
//! One trait, one implementation per response-extraction path (Gemini,
//! OpenAI chat, OpenAI legacy completions, mock). Every call is a single
//! outbound attempt with a bounded wait; there is no retry edge anywhere.

pub mod gemini;
pub mod mock;
pub mod openai;

use async_trait::async_trait;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Credential or endpoint missing. Raised before any network attempt.
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// Non-2xx from the provider; the remote status is carried through.
    #[error("Provider API error {status}: {message}")]
    Api {
        status: u16,
        message: String,
        /// Raw provider error body, opaque diagnostic detail only.
        body: Option<String>,
    },

    #[error("Rate limited")]
    RateLimited,

    #[error("Provider call timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotConfigured(_) => "not_configured",
            Self::Api { .. } => "api",
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::Network(_) => "network",
        }
    }
}

/// Result of one provider call.
#[derive(Debug)]
pub struct ProviderResponse {
    /// First generated candidate, trimmed. `None` means the provider
    /// answered successfully but produced no usable text.
    pub text: Option<String>,
    pub finish_reason: FinishReason,
}

/// Reason why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Complete,
    Length,
    ContentFilter,
}

impl FinishReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Length => "length",
            Self::ContentFilter => "content_filter",
        }
    }
}

/// Generation parameters forwarded on every request.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// Trait for text generation providers.
#[async_trait]
pub trait TextProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Issue exactly one generation request for the prompt.
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError>;

    /// Configuration check; must not consume provider quota.
    async fn health_check(&self) -> Result<(), ProviderError>;
}

/// Map a transport-level failure; a client timeout is its own class.
pub(crate) fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Network(err.to_string())
    }
}

/// Reject non-2xx responses, carrying the remote status verbatim and the
/// raw error body as opaque detail.
pub(crate) async fn check_status(
    response: reqwest::Response,
    provider: &str,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status.as_u16() == 429 {
        return Err(ProviderError::RateLimited);
    }

    let error_text = response.text().await.unwrap_or_default();
    Err(ProviderError::Api {
        status: status.as_u16(),
        message: format!("{} API error {}", provider, status),
        body: (!error_text.is_empty()).then_some(error_text),
    })
}

/// Strip control characters so candidate text is safe to hand back as plain
/// text. Line breaks, tabs and printable non-ASCII are kept.
pub fn sanitize_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect()
}
