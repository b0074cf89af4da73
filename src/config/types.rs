use std::path::Path;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use super::store::TokenStoreConfig;

/// Prefix for environment overrides, e.g. `TODOCLIENT_API__BASE_URL`.
pub const ENV_PREFIX: &str = "TODOCLIENT_";

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0. Every section has defaults, so a document holding
/// only the version is valid.
#[derive(Deserialize, Serialize, Debug, Clone, Default, JsonSchema)]
pub struct ConfigV1 {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub token_store: TokenStoreConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Load config from a YAML file over `defaults`, with `TODOCLIENT_`-prefixed
/// environment variables layered on top (`__` separates nested keys).
/// A missing file leaves the defaults in place.
pub fn load_config(path: &Path, defaults: ConfigV1) -> Result<ConfigV1, figment::Error> {
    let figment = Figment::from(Serialized::defaults(Config::ConfigV1(defaults)))
        .merge(Yaml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));
    extract(figment)
}

/// Parse a config document held in memory.
pub fn parse_config(yaml: &str) -> Result<ConfigV1, figment::Error> {
    extract(Figment::new().merge(Yaml::string(yaml)))
}

fn extract(figment: Figment) -> Result<ConfigV1, figment::Error> {
    match figment.extract::<Config>()? {
        Config::ConfigV1(c) => Ok(c),
    }
    // handle configuration migration between versions here when necessary
}

/// Render the JSON schema for the configuration.
pub fn config_schema() -> Result<String, serde_json::Error> {
    let schema = schema_for!(Config);
    serde_json::to_string_pretty(&schema)
}

/// Remote API location and transport settings.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_in_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: "http://localhost:3001".to_string(),
            timeout_in_ms: 10_000,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_in_ms)
    }
}

/// How concurrent 401 responses share a token refresh.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RefreshMode {
    /// One refresh at a time; requests that were waiting reuse its result.
    #[default]
    SingleFlight,
    /// Every rejected request refreshes on its own.
    Independent,
}

#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(default)]
pub struct AuthConfig {
    pub refresh_mode: RefreshMode,
    /// Route the navigator is sent to once the session expires.
    pub login_route: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            refresh_mode: RefreshMode::default(),
            login_route: "/login".to_string(),
        }
    }
}

/// Server-state cache defaults.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(default)]
pub struct CacheConfig {
    pub stale_time_in_ms: u64,
    pub gc_time_in_ms: u64,
    /// Retries after the first failed attempt of a read.
    pub retry: u32,
    pub retry_base_delay_in_ms: u64,
    pub retry_max_delay_in_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            stale_time_in_ms: 5 * 60 * 1000,
            gc_time_in_ms: 10 * 60 * 1000,
            retry: 3,
            retry_base_delay_in_ms: 1000,
            retry_max_delay_in_ms: 30_000,
        }
    }
}

impl CacheConfig {
    pub fn stale_time(&self) -> Duration {
        Duration::from_millis(self.stale_time_in_ms)
    }

    pub fn gc_time(&self) -> Duration {
        Duration::from_millis(self.gc_time_in_ms)
    }
}
