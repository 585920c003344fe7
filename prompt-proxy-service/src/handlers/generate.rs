//! The proxy pipeline: normalize the body, call the provider once, shape
//! the response.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::time::Instant;

use crate::services::metrics;
use crate::services::normalizer;
use crate::services::providers::{sanitize_text, GenerationParams, ProviderError};
use crate::startup::AppState;
use service_core::error::AppError;

/// Sentinel returned when the provider answered but produced no usable
/// text. Deliberately a 200: the request itself completed correctly.
pub const EMPTY_CONTENT_FALLBACK: &str = "No content generated.";

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub output: String,
}

#[tracing::instrument(skip(state, body), fields(body_len = body.len()))]
pub async fn generate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<GenerateResponse>), AppError> {
    let prompt = normalizer::extract_prompt(&body).map_err(|failure| {
        tracing::warn!(reason = failure.reason(), "Rejected request payload");
        metrics::record_rejected_payload(failure.reason());
        AppError::BadRequest(anyhow::anyhow!("Missing or invalid inputText: {}", failure))
    })?;

    tracing::debug!(prompt_len = prompt.len(), "Extracted prompt");

    let params = GenerationParams {
        temperature: state.config.generation.temperature,
        max_output_tokens: state.config.generation.max_output_tokens,
    };

    let provider = state.text_provider.as_ref();
    let started = Instant::now();
    let result = provider.generate(&prompt, &params).await;
    metrics::record_provider_latency(provider.name(), started.elapsed().as_secs_f64());

    match result {
        Ok(response) => {
            let output = response
                .text
                .as_deref()
                .map(sanitize_text)
                .filter(|text| !text.is_empty());

            let outcome = if output.is_some() { "success" } else { "empty" };
            metrics::record_proxy_request(provider.name(), outcome);

            tracing::info!(
                provider = provider.name(),
                finish_reason = response.finish_reason.as_str(),
                outcome,
                "Proxied generation request"
            );

            Ok((
                StatusCode::OK,
                Json(GenerateResponse {
                    output: output.unwrap_or_else(|| EMPTY_CONTENT_FALLBACK.to_string()),
                }),
            ))
        }
        Err(err) => {
            metrics::record_proxy_request(provider.name(), "error");
            metrics::record_provider_error(provider.name(), err.kind());

            tracing::error!(
                provider = provider.name(),
                error_type = err.kind(),
                "Provider call failed: {}",
                err
            );

            Err(provider_error_to_app(err))
        }
    }
}

/// Convert a provider failure to the response-level error taxonomy.
fn provider_error_to_app(error: ProviderError) -> AppError {
    match error {
        ProviderError::NotConfigured(msg) => AppError::ConfigError(anyhow::anyhow!(msg)),
        ProviderError::Api {
            status,
            message,
            body,
        } => AppError::UpstreamStatus {
            status,
            message,
            details: body,
        },
        ProviderError::RateLimited => AppError::UpstreamStatus {
            status: 429,
            message: "Rate limited by AI provider".to_string(),
            details: None,
        },
        ProviderError::Timeout => AppError::BadGateway("provider call timed out".to_string()),
        ProviderError::Network(msg) => AppError::BadGateway(msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_configured_maps_to_config_error() {
        let app_error = provider_error_to_app(ProviderError::NotConfigured("no key".to_string()));
        assert!(matches!(app_error, AppError::ConfigError(_)));
    }

    #[test]
    fn test_api_error_keeps_remote_status_and_body() {
        let app_error = provider_error_to_app(ProviderError::Api {
            status: 503,
            message: "Gemini API error 503".to_string(),
            body: Some("overloaded".to_string()),
        });
        match app_error {
            AppError::UpstreamStatus {
                status, details, ..
            } => {
                assert_eq!(status, 503);
                assert_eq!(details.as_deref(), Some("overloaded"));
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn test_timeout_maps_to_bad_gateway() {
        let app_error = provider_error_to_app(ProviderError::Timeout);
        assert!(matches!(app_error, AppError::BadGateway(_)));
    }
}
