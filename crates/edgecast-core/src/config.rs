use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "EDGECAST_CONFIG";
/// Environment variable overriding `server.bind_addr`
pub const BIND_ADDR_ENV: &str = "EDGECAST_BIND";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Summarize all errors on one line
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    /// Geolocation and weather endpoints
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Edge cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Values substituted when a request or upstream leaves them out
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the HTTP server listens on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Directory served at `/` (the browser page), if any
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            static_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the IP geolocation service (ipapi.co format)
    #[serde(default = "default_geolocation_url")]
    pub geolocation_url: String,

    /// Base URL of the forecast service (Open-Meteo format)
    #[serde(default = "default_weather_url")]
    pub weather_url: String,

    /// Per-request timeout. Unset leaves the HTTP client's default in place.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_geolocation_url() -> String {
    "https://ipapi.co".to_string()
}

fn default_weather_url() -> String {
    "https://api.open-meteo.com".to_string()
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            geolocation_url: default_geolocation_url(),
            weather_url: default_weather_url(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Freshness window for cached records
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_key_prefix() -> String {
    "weather:".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            key_prefix: default_key_prefix(),
        }
    }
}

impl CacheConfig {
    pub fn ttl_millis(&self) -> i64 {
        i64::try_from(self.ttl_secs.saturating_mul(1000)).unwrap_or(i64::MAX)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Client IP used when no forwarding header is present
    #[serde(default = "default_client_ip")]
    pub client_ip: String,

    /// Location used when geolocation returns no coordinates (Beijing)
    #[serde(default = "default_latitude")]
    pub latitude: f64,

    #[serde(default = "default_longitude")]
    pub longitude: f64,

    /// Timezone used when the forecast omits one
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_client_ip() -> String {
    "8.8.8.8".to_string()
}

fn default_latitude() -> f64 {
    39.9042
}

fn default_longitude() -> f64 {
    116.4074
}

fn default_timezone() -> String {
    "Asia/Shanghai".to_string()
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            client_ip: default_client_ip(),
            latitude: default_latitude(),
            longitude: default_longitude(),
            timezone: default_timezone(),
        }
    }
}

impl Config {
    /// Load configuration from `EDGECAST_CONFIG` or the user config directory.
    ///
    /// A missing file yields defaults; `EDGECAST_BIND` is applied last.
    pub fn load() -> Result<Self> {
        let path = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(p) => Some(PathBuf::from(p)),
            None => Self::config_path(),
        };

        let mut config = match path {
            Some(p) if p.exists() => Self::load_from(&p)?,
            Some(p) => {
                tracing::info!("No config at {}, using defaults", p.display());
                Self::default()
            }
            None => Self::default(),
        };

        if let Ok(bind) = std::env::var(BIND_ADDR_ENV) {
            tracing::debug!("Bind address overridden by {}: {}", BIND_ADDR_ENV, bind);
            config.server.bind_addr = bind;
        }

        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Warnings are logged; any error fails the load.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.server.bind_addr.parse::<SocketAddr>().is_err() {
            result.add_error(
                "server.bind_addr",
                format!("Not a socket address: {}", self.server.bind_addr),
            );
        }

        if let Some(dir) = &self.server.static_dir {
            if !dir.is_dir() {
                result.add_warning(
                    "server.static_dir",
                    format!("Not a directory, static page disabled: {}", dir.display()),
                );
            }
        }

        self.validate_url(
            &self.upstream.geolocation_url,
            "upstream.geolocation_url",
            &mut result,
        );
        self.validate_url(&self.upstream.weather_url, "upstream.weather_url", &mut result);

        if self.upstream.timeout_secs == Some(0) {
            result.add_error("upstream.timeout_secs", "Timeout must be greater than 0");
        }

        if self.cache.ttl_secs == 0 {
            result.add_error("cache.ttl_secs", "TTL must be greater than 0");
        } else if self.cache.ttl_secs > 3600 {
            result.add_warning("cache.ttl_secs", "TTL is more than one hour");
        }

        if self.cache.key_prefix.is_empty() {
            result.add_warning("cache.key_prefix", "Empty key prefix");
        }

        if !(-90.0..=90.0).contains(&self.defaults.latitude) {
            result.add_error("defaults.latitude", "Latitude must be within -90..=90");
        }
        if !(-180.0..=180.0).contains(&self.defaults.longitude) {
            result.add_error("defaults.longitude", "Longitude must be within -180..=180");
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("edgecast").join("config.toml"))
    }
}
