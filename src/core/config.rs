//! Configuration management for Storefront Insights
//!
//! Defaults point at the public demo APIs; a TOML file and `SI_*` environment
//! variables override them, in that order.

use crate::core::error::{Error, Result};
use crate::core::types::EntityType;
use crate::pipeline::envelope::BatchPolicy;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default configuration file looked up by [`Config::load`]
pub const DEFAULT_CONFIG_FILE: &str = "storefront-insights.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Upstream sources
    pub sources: SourcesConfig,

    /// Pipeline behaviour
    pub pipeline: PipelineConfig,

    /// Metrics and monitoring
    pub metrics: MetricsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP server bind address
    pub http_addr: SocketAddr,

    /// Request timeout
    #[serde(serialize_with = "serialize_duration", deserialize_with = "deserialize_duration")]
    pub request_timeout: Duration,
}

/// One upstream endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// URL fetched with a single GET
    pub url: String,

    /// Field of the response object holding the item array (None = body is the array)
    #[serde(default)]
    pub results_field: Option<String>,
}

/// Upstream source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Product catalogue
    pub products: EndpointConfig,

    /// User directory
    pub users: EndpointConfig,

    /// Transaction feed
    pub transactions: EndpointConfig,

    /// Per-request timeout for upstream calls
    #[serde(serialize_with = "serialize_duration", deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

/// Where `/insights/products` reads its data from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightsMode {
    /// Re-acquire and enrich on every request
    Live,
    /// Read the current snapshot
    Snapshot,
}

impl std::str::FromStr for InsightsMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "live" => Ok(InsightsMode::Live),
            "snapshot" => Ok(InsightsMode::Snapshot),
            other => Err(Error::config(format!(
                "Invalid insights mode: {}. Valid options: live, snapshot",
                other
            ))),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Handling of items that cannot be enveloped
    pub batch_policy: BatchPolicy,

    /// Data freshness of the product insights endpoint
    pub product_insights: InsightsMode,
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Expose Prometheus metrics on `/metrics`
    pub enable_prometheus: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (pretty, compact, json)
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            products: EndpointConfig {
                url: "https://fakestoreapi.com/products".to_string(),
                results_field: None,
            },
            users: EndpointConfig {
                url: "https://randomuser.me/api/?results=20".to_string(),
                results_field: Some("results".to_string()),
            },
            transactions: EndpointConfig {
                url: "https://my.api.mockaroo.com/orders.json?key=e49e6840".to_string(),
                results_field: None,
            },
            timeout: Duration::from_secs(10),
        }
    }
}

impl SourcesConfig {
    /// Endpoint serving `entity_type`
    pub fn endpoint(&self, entity_type: EntityType) -> &EndpointConfig {
        match entity_type {
            EntityType::Product => &self.products,
            EntityType::User => &self.users,
            EntityType::Transaction => &self.transactions,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_policy: BatchPolicy::DropBatch,
            product_insights: InsightsMode::Live,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enable_prometheus: true }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default file (if present) and environment variables
    pub fn load() -> Result<Self> {
        let mut config = if std::path::Path::new(DEFAULT_CONFIG_FILE).exists() {
            Self::from_file(DEFAULT_CONFIG_FILE)?
        } else {
            Config::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path: PathBuf = path.as_ref().into();
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| Error::config(format!("Failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(addr) = var("SI_HTTP_ADDR") {
            self.server.http_addr = addr
                .parse()
                .map_err(|e| Error::config(format!("Invalid HTTP address: {}", e)))?;
        }

        if let Some(url) = var("SI_PRODUCTS_URL") {
            self.sources.products.url = url;
        }

        if let Some(url) = var("SI_USERS_URL") {
            self.sources.users.url = url;
        }

        if let Some(url) = var("SI_TRANSACTIONS_URL") {
            self.sources.transactions.url = url;
        }

        if let Some(timeout) = var("SI_FETCH_TIMEOUT") {
            self.sources.timeout = parse_duration(&timeout)
                .map_err(|e| Error::config(format!("Invalid fetch timeout: {}", e)))?;
        }

        if let Some(policy) = var("SI_BATCH_POLICY") {
            self.pipeline.batch_policy = policy.parse().map_err(Error::config)?;
        }

        if let Some(mode) = var("SI_PRODUCT_INSIGHTS") {
            self.pipeline.product_insights = mode.parse()?;
        }

        if let Some(level) = var("SI_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Some(format) = var("SI_LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        for entity_type in EntityType::ALL {
            let endpoint = self.sources.endpoint(entity_type);
            if !(endpoint.url.starts_with("http://") || endpoint.url.starts_with("https://")) {
                return Err(Error::config(format!(
                    "Invalid {} source URL: {}",
                    entity_type, endpoint.url
                )));
            }
        }

        if self.sources.timeout.is_zero() {
            return Err(Error::config("Fetch timeout must be greater than zero"));
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => return Err(Error::config("Invalid log level")),
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" | "json" => {}
            _ => return Err(Error::config("Invalid log format")),
        }

        Ok(())
    }
}

// Durations are written as strings like "30s" in TOML
fn serialize_duration<S>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if duration.subsec_nanos() == 0 {
        serializer.serialize_str(&format!("{}s", duration.as_secs()))
    } else {
        serializer.serialize_str(&format!("{}ms", duration.as_millis()))
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct DurationVisitor;

    impl<'de> Visitor<'de> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a duration string like '30s' or '5m'")
        }

        fn visit_str<E>(self, value: &str) -> std::result::Result<Duration, E>
        where
            E: de::Error,
        {
            parse_duration(value).map_err(E::custom)
        }

        fn visit_i64<E>(self, value: i64) -> std::result::Result<Duration, E>
        where
            E: de::Error,
        {
            u64::try_from(value)
                .map(Duration::from_secs)
                .map_err(|_| E::custom("negative duration"))
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}

/// Parse `"500ms"`, `"30s"`, `"5m"`, `"1h"` or a bare number of seconds
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        let ms: u64 = ms.parse().map_err(|_| "Invalid milliseconds")?;
        Ok(Duration::from_millis(ms))
    } else if let Some(secs) = s.strip_suffix('s') {
        let secs: u64 = secs.parse().map_err(|_| "Invalid seconds")?;
        Ok(Duration::from_secs(secs))
    } else if let Some(mins) = s.strip_suffix('m') {
        let mins: u64 = mins.parse().map_err(|_| "Invalid minutes")?;
        let secs = mins.checked_mul(60).ok_or("Duration too large")?;
        Ok(Duration::from_secs(secs))
    } else if let Some(hours) = s.strip_suffix('h') {
        let hours: u64 = hours.parse().map_err(|_| "Invalid hours")?;
        let secs = hours.checked_mul(3600).ok_or("Duration too large")?;
        Ok(Duration::from_secs(secs))
    } else {
        let secs: u64 = s.parse().map_err(|_| "Invalid duration format")?;
        Ok(Duration::from_secs(secs))
    }
}
