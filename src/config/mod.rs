//! Configuration module for the content API

use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};
use std::path::PathBuf;

/// Main application settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub generation: GenerationSettings,
    #[serde(default)]
    pub providers: ProvidersSettings,
    #[serde(default)]
    pub cors: CorsSettings,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    /// Public site URL, sent to OpenRouter as `HTTP-Referer`
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

fn default_public_url() -> String {
    "https://vietvan.vn".to_string()
}

/// Database configuration for PostgreSQL
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
}

/// Defaults applied to generation requests that leave fields out
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Model code used when the request names none (or an unknown one)
    pub default_model: String,
    pub default_temperature: f32,
    pub default_max_tokens: i32,
    /// Upper bound on accepted prompt length, in characters
    pub max_prompt_chars: usize,
    /// Whole-request timeout for provider calls
    pub request_timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        GenerationSettings {
            default_model: "claude".to_string(),
            default_temperature: 0.7,
            default_max_tokens: 1024,
            max_prompt_chars: 20_000,
            request_timeout_secs: 120,
        }
    }
}

/// Credentials and endpoints for a single hosted model provider
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub rate_limit_per_minute: Option<u32>,
}

/// Hosted LLM provider configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProvidersSettings {
    pub anthropic: ProviderSettings,
    pub openai: ProviderSettings,
    pub openrouter: ProviderSettings,
    /// Image model settings; falls back to the OpenAI key when unset
    pub images: ProviderSettings,
}

impl ProvidersSettings {
    /// Fill missing API keys from the conventional provider env vars
    /// (`CLAUDE_API_KEY`, `OPENAI_API_KEY`, `OPENROUTER_API_KEY`).
    pub fn with_env_fallbacks(mut self) -> Self {
        fill_from_env(&mut self.anthropic.api_key, "CLAUDE_API_KEY");
        fill_from_env(&mut self.openai.api_key, "OPENAI_API_KEY");
        fill_from_env(&mut self.openrouter.api_key, "OPENROUTER_API_KEY");
        if self.images.api_key.is_none() {
            self.images.api_key = self.openai.api_key.clone();
        }
        self
    }
}

fn fill_from_env(slot: &mut Option<String>, var: &str) {
    if slot.as_deref().map_or(true, str::is_empty) {
        *slot = std::env::var(var).ok().filter(|v| !v.is_empty());
    }
}

/// Cross-origin settings for browser clients
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsSettings {
    pub allow_origin: String,
    pub allow_headers: String,
}

impl Default for CorsSettings {
    fn default() -> Self {
        CorsSettings {
            allow_origin: "*".to_string(),
            allow_headers: "authorization, x-client-info, apikey, content-type".to_string(),
        }
    }
}

impl Settings {
    /// Load configuration from files and environment variables
    ///
    /// Configuration priority (highest to lowest):
    /// 1. Environment variables (prefixed with VIETVAN_)
    /// 2. config/local.toml (gitignored)
    /// 3. config/default.toml
    pub fn load() -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"));

        let defaults = Settings::default();

        let builder = Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port as i64)?
            .set_default("database.url", defaults.database.url)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // VIETVAN_SERVER__PORT, VIETVAN_PROVIDERS__OPENAI__API_KEY, ...
            .add_source(
                Environment::with_prefix("VIETVAN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
            );

        let mut settings: Settings = builder.build()?.try_deserialize()?;
        if settings.database.url.is_empty() {
            if let Ok(url) = std::env::var("DATABASE_URL") {
                settings.database.url = url;
            }
        }
        settings.providers = settings.providers.with_env_fallbacks();
        Ok(settings)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 8080,
                workers: None,
                public_url: default_public_url(),
            },
            database: DatabaseSettings {
                url: String::new(),
                max_connections: Some(10),
            },
            generation: GenerationSettings::default(),
            providers: ProvidersSettings::default(),
            cors: CorsSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.generation.default_model, "claude");
        assert_eq!(settings.generation.default_max_tokens, 1024);
        assert!((settings.generation.default_temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_image_key_falls_back_to_openai() {
        let providers = ProvidersSettings {
            openai: ProviderSettings {
                api_key: Some("sk-test".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
        .with_env_fallbacks();

        assert_eq!(providers.images.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_env_override_uses_single_underscore_prefix() {
        std::env::set_var("VIETVAN_SERVER__PORT", "9292");
        let loaded = Settings::load();
        std::env::remove_var("VIETVAN_SERVER__PORT");

        assert_eq!(loaded.unwrap().server.port, 9292);
    }

    #[test]
    fn test_explicit_key_is_kept() {
        let mut slot = Some("configured".to_string());
        fill_from_env(&mut slot, "VIETVAN_TEST_UNSET_VARIABLE");
        assert_eq!(slot.as_deref(), Some("configured"));
    }
}
