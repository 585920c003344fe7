//! Prometheus metrics for the prompt proxy.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

// Global registry
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub static PROXY_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static REJECTED_PAYLOADS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static PROVIDER_LATENCY_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
pub static PROVIDER_ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Must be called once at startup.
pub fn init_metrics() {
    let registry = Registry::new();

    let proxy_requests = IntCounterVec::new(
        Opts::new("proxy_requests_total", "Total proxied generation requests"),
        &["provider", "outcome"], // outcome: success, empty, error
    )
    .expect("Failed to create proxy_requests_total metric");

    let rejected_payloads = IntCounterVec::new(
        Opts::new(
            "rejected_payloads_total",
            "Request bodies rejected by the payload normalizer",
        ),
        &["reason"],
    )
    .expect("Failed to create rejected_payloads_total metric");

    let provider_latency = HistogramVec::new(
        HistogramOpts::new(
            "provider_latency_seconds",
            "AI provider API latency in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["provider"],
    )
    .expect("Failed to create provider_latency_seconds metric");

    let provider_errors = IntCounterVec::new(
        Opts::new("provider_errors_total", "Total AI provider errors"),
        &["provider", "error_type"],
    )
    .expect("Failed to create provider_errors_total metric");

    registry
        .register(Box::new(proxy_requests.clone()))
        .expect("Failed to register proxy_requests_total");
    registry
        .register(Box::new(rejected_payloads.clone()))
        .expect("Failed to register rejected_payloads_total");
    registry
        .register(Box::new(provider_latency.clone()))
        .expect("Failed to register provider_latency_seconds");
    registry
        .register(Box::new(provider_errors.clone()))
        .expect("Failed to register provider_errors_total");

    // Initialize globals; repeated calls keep the first registry.
    let _ = REGISTRY.set(registry);
    let _ = PROXY_REQUESTS_TOTAL.set(proxy_requests);
    let _ = REJECTED_PAYLOADS_TOTAL.set(rejected_payloads);
    let _ = PROVIDER_LATENCY_SECONDS.set(provider_latency);
    let _ = PROVIDER_ERRORS_TOTAL.set(provider_errors);

    tracing::info!("Prometheus metrics initialized");
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    let registry = match REGISTRY.get() {
        Some(r) => r,
        None => {
            tracing::error!("Metrics registry not initialized");
            return "# Metrics registry not initialized\n".to_string();
        }
    };

    let metric_families = registry.gather();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return format!("# Failed to encode metrics: {}\n", e);
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to convert metrics to UTF-8");
            format!("# Failed to convert metrics to UTF-8: {}\n", e)
        }
    }
}

// Helper functions for recording metrics

/// Record a completed proxy request.
pub fn record_proxy_request(provider: &str, outcome: &str) {
    if let Some(counter) = PROXY_REQUESTS_TOTAL.get() {
        counter.with_label_values(&[provider, outcome]).inc();
    }
}

/// Record a body the normalizer refused.
pub fn record_rejected_payload(reason: &str) {
    if let Some(counter) = REJECTED_PAYLOADS_TOTAL.get() {
        counter.with_label_values(&[reason]).inc();
    }
}

/// Record provider latency.
pub fn record_provider_latency(provider: &str, duration_secs: f64) {
    if let Some(histogram) = PROVIDER_LATENCY_SECONDS.get() {
        histogram.with_label_values(&[provider]).observe(duration_secs);
    }
}

/// Record a provider error.
pub fn record_provider_error(provider: &str, error_type: &str) {
    if let Some(counter) = PROVIDER_ERRORS_TOTAL.get() {
        counter.with_label_values(&[provider, error_type]).inc();
    }
}
