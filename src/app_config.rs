// Runtime configuration, read once in `main` from the process environment
// (after `.env` has been loaded) and passed down explicitly.

use crate::core::moderation::ClassifierConfig;
use crate::infra::ai::openrouter_client::DEFAULT_BASE_URL;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_OPENROUTER_MODEL: &str = "openai/gpt-5.1";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing {0} environment variable")]
    Missing(&'static str),

    #[error("Invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Which judgment capability backs the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderSettings {
    OpenRouter { api_key: String, base_url: String },
    Gemini { api_key: String },
}

impl ProviderSettings {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderSettings::OpenRouter { .. } => "openrouter",
            ProviderSettings::Gemini { .. } => "gemini",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub provider: ProviderSettings,
    pub classifier: ClassifierConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider_name = get("MODERATION_PROVIDER").unwrap_or_else(|| "openrouter".to_string());
        let (provider, model) = match provider_name.trim().to_lowercase().as_str() {
            "openrouter" => {
                let api_key =
                    get("OPENROUTER_API_KEY").ok_or(ConfigError::Missing("OPENROUTER_API_KEY"))?;
                let base_url =
                    get("OPENROUTER_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
                let model =
                    get("OPENROUTER_MODEL").unwrap_or_else(|| DEFAULT_OPENROUTER_MODEL.to_string());
                (ProviderSettings::OpenRouter { api_key, base_url }, model)
            }
            "gemini" => {
                let api_key = get("GEMINI_API_KEY").ok_or(ConfigError::Missing("GEMINI_API_KEY"))?;
                let model = get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
                (ProviderSettings::Gemini { api_key }, model)
            }
            _ => {
                return Err(ConfigError::Invalid {
                    key: "MODERATION_PROVIDER",
                    value: provider_name,
                    reason: "expected \"openrouter\" or \"gemini\"".to_string(),
                })
            }
        };

        let mut classifier = ClassifierConfig::new(model);

        if let Some(raw) = get("MODERATION_TIMEOUT_SECS") {
            let secs = parse_positive("MODERATION_TIMEOUT_SECS", &raw)?;
            classifier.timeout = Duration::from_secs(secs);
        }

        if let Some(raw) = get("MODERATION_MAX_TOKENS") {
            let tokens = parse_positive("MODERATION_MAX_TOKENS", &raw)?;
            let tokens = u32::try_from(tokens).map_err(|_| ConfigError::Invalid {
                key: "MODERATION_MAX_TOKENS",
                value: raw.clone(),
                reason: "too large".to_string(),
            })?;
            classifier.max_tokens = Some(tokens);
        }

        Ok(Self {
            provider,
            classifier,
        })
    }
}

fn parse_positive(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: "must be greater than zero".to_string(),
        }),
        Ok(value) => Ok(value),
        Err(e) => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: e.to_string(),
        }),
    }
}
