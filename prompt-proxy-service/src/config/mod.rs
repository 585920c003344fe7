use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";

const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1024;
const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Upper bound on one provider call. On expiry the invocation still
/// produces a terminated response; there is no retry edge.
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub provider: ProviderKind,
    pub gemini: GeminiSettings,
    pub openai: OpenAiSettings,
    pub generation: GenerationSettings,
    pub security: SecuritySettings,
}

/// Which provider this deployment proxies to. One entry per supported
/// response-extraction path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "openai-chat")]
    OpenAiChat,
    #[serde(rename = "openai-completions")]
    OpenAiCompletions,
    #[serde(rename = "mock")]
    Mock,
}

impl ProviderKind {
    fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "gemini" => Ok(Self::Gemini),
            "openai-chat" => Ok(Self::OpenAiChat),
            "openai-completions" => Ok(Self::OpenAiCompletions),
            "mock" => Ok(Self::Mock),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "unknown provider '{}' (expected gemini, openai-chat, openai-completions or mock)",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAiChat => "openai-chat",
            Self::OpenAiCompletions => "openai-completions",
            Self::Mock => "mock",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiSettings {
    /// Missing key is a per-invocation configuration failure, never a
    /// startup crash.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationSettings {
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecuritySettings {
    /// Exact-match origin allow-list; empty denies every cross-origin caller.
    pub allowed_origins: Vec<String>,
}

impl ProxyConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(ProxyConfig {
            common: common_config,
            provider: ProviderKind::parse(&get_env("PROVIDER", Some("gemini"), is_prod)?)?,
            gemini: GeminiSettings {
                api_key: get_env_optional("GEMINI_API_KEY"),
                model: get_env("GEMINI_MODEL", Some("gemini-1.5-flash"), is_prod)?,
                base_url: get_env("GEMINI_API_BASE", Some(DEFAULT_GEMINI_API_BASE), is_prod)?,
            },
            openai: OpenAiSettings {
                api_key: get_env_optional("OPENAI_API_KEY"),
                model: get_env("OPENAI_MODEL", Some("gpt-4o-mini"), is_prod)?,
                base_url: get_env("OPENAI_API_BASE", Some(DEFAULT_OPENAI_API_BASE), is_prod)?,
            },
            generation: GenerationSettings {
                max_output_tokens: get_env(
                    "MAX_OUTPUT_TOKENS",
                    Some(&DEFAULT_MAX_OUTPUT_TOKENS.to_string()),
                    is_prod,
                )?
                .parse()
                .unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS),
                temperature: get_env(
                    "TEMPERATURE",
                    Some(&DEFAULT_TEMPERATURE.to_string()),
                    is_prod,
                )?
                .parse()
                .unwrap_or(DEFAULT_TEMPERATURE),
                timeout_secs: get_env(
                    "PROVIDER_TIMEOUT_SECS",
                    Some(&DEFAULT_PROVIDER_TIMEOUT_SECS.to_string()),
                    is_prod,
                )?
                .parse()
                .unwrap_or(DEFAULT_PROVIDER_TIMEOUT_SECS),
            },
            security: SecuritySettings {
                allowed_origins: parse_origins(&get_env("ALLOWED_ORIGINS", Some(""), is_prod)?),
            },
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn get_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|val| !val.is_empty())
}
