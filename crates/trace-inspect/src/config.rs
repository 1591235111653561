use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SourceConfig {
    /// JSON snapshot of account facts. Without one, traces are reported
    /// without collecting additional info.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    /// Traces with more nodes than this are rejected
    pub max_trace_length: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_trace_length: 10_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached lookups per category
    pub max_capacity: u64,
    /// TTL for cached lookups in seconds
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            ttl_seconds: 60,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Limits defaults
            .set_default("limits.max_trace_length", 10_000)?
            // Cache defaults
            .set_default("cache.max_capacity", 10_000)?
            .set_default("cache.ttl_seconds", 60)?
            // Load from config files if they exist
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables
            // TRACE_INSPECT__SOURCE__PATH, etc.
            .add_source(
                Environment::with_prefix("TRACE_INSPECT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
