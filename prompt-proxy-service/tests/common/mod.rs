//! Shared helpers for prompt-proxy-service integration tests.

#![allow(dead_code)]

use prompt_proxy_service::config::{
    GeminiSettings, GenerationSettings, OpenAiSettings, ProviderKind, ProxyConfig,
    SecuritySettings, DEFAULT_GEMINI_API_BASE, DEFAULT_OPENAI_API_BASE,
};
use prompt_proxy_service::startup::Application;
use reqwest::Client;
use std::time::Duration;

pub const TEST_ORIGIN: &str = "https://app.example.com";

pub struct TestApp {
    pub port: u16,
    pub address: String,
    client: Client,
}

impl TestApp {
    /// Spawn the application on a random port.
    pub async fn spawn(config: ProxyConfig) -> TestApp {
        let app = Application::build(config)
            .await
            .expect("Failed to build application");
        let port = app.port();

        tokio::spawn(async move {
            let _ = app.run_until_stopped().await;
        });

        // Wait for the server to start
        tokio::time::sleep(Duration::from_millis(100)).await;

        TestApp {
            port,
            address: format!("http://127.0.0.1:{}", port),
            client: Client::new(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Baseline configuration: mock provider, random port, one allowed origin.
/// Tests adjust fields instead of going through the environment so they can
/// run in parallel.
pub fn test_config() -> ProxyConfig {
    ProxyConfig {
        common: service_core::config::Config {
            port: 0,
            log_level: "info".to_string(),
        },
        provider: ProviderKind::Mock,
        gemini: GeminiSettings {
            api_key: None,
            model: "gemini-1.5-flash".to_string(),
            base_url: DEFAULT_GEMINI_API_BASE.to_string(),
        },
        openai: OpenAiSettings {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            base_url: DEFAULT_OPENAI_API_BASE.to_string(),
        },
        generation: GenerationSettings {
            max_output_tokens: 64,
            temperature: 0.0,
            timeout_secs: 2,
        },
        security: SecuritySettings {
            allowed_origins: vec![TEST_ORIGIN.to_string()],
        },
    }
}

/// Spawn a stub upstream standing in for the provider API. Returns the port.
pub async fn spawn_upstream(router: axum::Router) -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub upstream");
    let port = listener.local_addr().expect("No local addr").port();

    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    port
}

/// Gemini configuration pointed at a local stub upstream.
pub fn gemini_config(upstream_port: u16, api_key: Option<&str>, timeout_secs: u64) -> ProxyConfig {
    let mut config = test_config();
    config.provider = ProviderKind::Gemini;
    config.gemini.api_key = api_key.map(String::from);
    config.gemini.base_url = format!("http://127.0.0.1:{}", upstream_port);
    config.generation.timeout_secs = timeout_secs;
    config
}
