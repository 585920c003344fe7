//! Application startup and lifecycle management.

use crate::config::{ProviderKind, ProxyConfig};
use crate::handlers::generate::generate;
use crate::handlers::health::{health_check, readiness_check};
use crate::handlers::metrics::metrics_exposition;
use crate::services::metrics;
use crate::services::providers::gemini::{GeminiConfig, GeminiTextProvider};
use crate::services::providers::mock::MockTextProvider;
use crate::services::providers::openai::{OpenAiConfig, OpenAiFlavor, OpenAiTextProvider};
use crate::services::providers::TextProvider;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use service_core::error::AppError;
use service_core::middleware::cors::{cors_middleware, CorsPolicy};
use service_core::middleware::request_id::request_id_middleware;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Shared application state. Immutable after build; invocations only read.
#[derive(Clone)]
pub struct AppState {
    pub config: ProxyConfig,
    pub text_provider: Arc<dyn TextProvider>,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: ProxyConfig) -> Result<Self, AppError> {
        metrics::init_metrics();

        let text_provider = build_text_provider(&config);
        tracing::info!(
            provider = text_provider.name(),
            "Initialized text provider"
        );

        let state = AppState {
            config: config.clone(),
            text_provider,
        };

        // Bind listener (port 0 = random port for testing)
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let cors_policy = Arc::new(CorsPolicy::new(
            self.state.config.security.allowed_origins.clone(),
        ));

        let router = Router::new()
            .route("/api/generate", post(generate))
            .route("/health", get(health_check))
            .route("/ready", get(readiness_check))
            .route("/metrics", get(metrics_exposition))
            .layer(from_fn(request_id_middleware))
            .layer(from_fn_with_state(cors_policy, cors_middleware))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state);

        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

/// Select the provider implementation for the configured kind.
pub fn build_text_provider(config: &ProxyConfig) -> Arc<dyn TextProvider> {
    let timeout = Duration::from_secs(config.generation.timeout_secs);

    match config.provider {
        ProviderKind::Gemini => Arc::new(GeminiTextProvider::new(GeminiConfig {
            api_key: config.gemini.api_key.clone(),
            model: config.gemini.model.clone(),
            base_url: config.gemini.base_url.clone(),
            timeout,
        })),
        ProviderKind::OpenAiChat => Arc::new(OpenAiTextProvider::new(
            OpenAiConfig {
                api_key: config.openai.api_key.clone(),
                model: config.openai.model.clone(),
                base_url: config.openai.base_url.clone(),
                timeout,
            },
            OpenAiFlavor::Chat,
        )),
        ProviderKind::OpenAiCompletions => Arc::new(OpenAiTextProvider::new(
            OpenAiConfig {
                api_key: config.openai.api_key.clone(),
                model: config.openai.model.clone(),
                base_url: config.openai.base_url.clone(),
                timeout,
            },
            OpenAiFlavor::Completions,
        )),
        ProviderKind::Mock => Arc::new(MockTextProvider::new(true)),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
