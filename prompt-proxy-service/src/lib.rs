//! prompt-proxy-service: one HTTP service in front of the generative-text
//! providers (Gemini, OpenAI chat, OpenAI legacy completions).
//!
//! Per request: a loosely-shaped body is normalized into a prompt, the
//! prompt is forwarded with exactly one outbound call, and the provider's
//! answer (or failure) is mapped onto a stable JSON response.

pub mod config;
pub mod handlers;
pub mod services;
pub mod startup;
