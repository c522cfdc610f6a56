use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounds for the single deadline placed on a generator call
pub const MIN_GENERATOR_TIMEOUT_SECS: u64 = 15;
pub const MAX_GENERATOR_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub cache: CacheConfig,
    pub generator: GeneratorConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    /// Idle time after which a session is treated as absent
    pub ttl_seconds: u64,
    /// Most recent turns kept per session
    pub max_history: usize,
    /// Period of the background expiry sweep
    pub sweep_interval_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
    /// TTL for answers produced by the local fallback responder
    pub fallback_ttl_seconds: u64,
    pub max_size: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    pub timeout_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 24 * 60 * 60,
            max_history: 50,
            sweep_interval_seconds: 60 * 60,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 24 * 60 * 60,
            fallback_ttl_seconds: 60 * 60,
            max_size: 500,
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key: String::new(),
            timeout_seconds: 20,
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl_seconds as i64)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds.max(1))
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl_seconds as i64)
    }

    pub fn fallback_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.fallback_ttl_seconds as i64)
    }
}

impl GeneratorConfig {
    /// Deadline for one generator call, clamped to 15..=30 seconds
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(
            self.timeout_seconds
                .clamp(MIN_GENERATOR_TIMEOUT_SECS, MAX_GENERATOR_TIMEOUT_SECS),
        )
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let session = SessionConfig::default();
        let cache = CacheConfig::default();
        let generator = GeneratorConfig::default();

        let config = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("session.ttl_seconds", session.ttl_seconds)?
            .set_default("session.max_history", session.max_history as u64)?
            .set_default("session.sweep_interval_seconds", session.sweep_interval_seconds)?
            .set_default("cache.ttl_seconds", cache.ttl_seconds)?
            .set_default("cache.fallback_ttl_seconds", cache.fallback_ttl_seconds)?
            .set_default("cache.max_size", cache.max_size as u64)?
            .set_default("generator.base_url", generator.base_url)?
            .set_default("generator.model", generator.model)?
            .set_default("generator.api_key", generator.api_key)?
            .set_default("generator.timeout_seconds", generator.timeout_seconds)?
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut settings: Settings = config.try_deserialize()?;
        settings.apply_legacy_env();
        settings.normalize();
        Ok(settings)
    }

    /// Honour the plain `GOOGLE_AI_API_KEY` / `GEMINI_MODEL` variables when the
    /// prefixed keys were left empty.
    fn apply_legacy_env(&mut self) {
        if self.generator.api_key.trim().is_empty() {
            if let Ok(key) = std::env::var("GOOGLE_AI_API_KEY") {
                self.generator.api_key = key;
            }
        }
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            if !model.trim().is_empty() && std::env::var("APP__GENERATOR__MODEL").is_err() {
                self.generator.model = model;
            }
        }
    }

    fn normalize(&mut self) {
        self.session.max_history = self.session.max_history.max(1);
        self.cache.max_size = self.cache.max_size.max(1);
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            session: SessionConfig::default(),
            cache: CacheConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_limits() {
        let settings = Settings::default();
        assert_eq!(settings.session.ttl(), chrono::Duration::hours(24));
        assert_eq!(settings.session.max_history, 50);
        assert_eq!(settings.cache.ttl(), chrono::Duration::hours(24));
        assert_eq!(settings.cache.max_size, 500);
        assert!(!settings.generator.is_configured());
    }

    #[test]
    fn test_generator_timeout_is_clamped() {
        let mut generator = GeneratorConfig::default();
        assert_eq!(generator.timeout(), Duration::from_secs(20));

        generator.timeout_seconds = 2;
        assert_eq!(generator.timeout(), Duration::from_secs(15));

        generator.timeout_seconds = 120;
        assert_eq!(generator.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_normalize_clamps_zero_sizes() {
        let mut settings = Settings::default();
        settings.session.max_history = 0;
        settings.cache.max_size = 0;
        settings.normalize();
        assert_eq!(settings.session.max_history, 1);
        assert_eq!(settings.cache.max_size, 1);
    }
}
