use edgecast_core::{NetworkError, ReqwestErrorExt};
use serde::{Deserialize, Serialize};

/// Coarse condition category reported as `weather.main`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WeatherCategory {
    #[default]
    Clear,
    Clouds,
}

impl WeatherCategory {
    /// WMO codes 0-3 (clear through overcast) are `Clear`, everything else `Clouds`.
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: i32) -> Self {
        if code < 4 {
            Self::Clear
        } else {
            Self::Clouds
        }
    }
}

/// Description used for WMO codes without a dedicated entry
pub const UNKNOWN_WEATHER: &str = "未知天气";

/// Human-readable description of a WMO weather code
pub fn describe_wmo_code(code: i32) -> &'static str {
    match code {
        0 => "晴朗",
        1 => "基本晴朗",
        2 => "局部多云",
        3 => "阴天",
        45 => "雾",
        48 => "冻雾",
        51 => "毛毛雨",
        61 => "小雨",
        80 => "阵雨",
        _ => UNKNOWN_WEATHER,
    }
}

/// Where a record handed to the caller came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordSource {
    EdgeCache,
    ApiCall,
    Fallback,
}

/// Current conditions at the visitor's location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub main: WeatherCategory,
    pub description: String,
}

/// Location plus weather for one client IP, as cached and as served
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationWeatherRecord {
    pub ip: String,
    pub country: String,
    pub city: String,
    pub timezone: String,
    pub latitude: f64,
    pub longitude: f64,
    pub weather: WeatherSnapshot,
    /// Epoch milliseconds when the upstream data was fetched
    pub timestamp: i64,
    pub cached: bool,
    pub source: RecordSource,
}

impl LocationWeatherRecord {
    /// Whether the record is still inside the freshness window at `now`
    pub fn is_fresh(&self, now: i64, ttl_millis: i64) -> bool {
        now.saturating_sub(self.timestamp) < ttl_millis
    }

    /// Copy of this record tagged as served from the edge cache
    pub fn as_cache_hit(&self) -> Self {
        Self {
            cached: true,
            source: RecordSource::EdgeCache,
            ..self.clone()
        }
    }
}

/// Response body: the record plus handler latency and, on fallback, the error text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherResponse {
    #[serde(flatten)]
    pub record: LocationWeatherRecord,
    /// Milliseconds spent producing this response
    pub latency: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WeatherResponse {
    pub fn is_fallback(&self) -> bool {
        self.record.source == RecordSource::Fallback
    }
}

/// Failure anywhere in the geolocation + weather sequence
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    #[error("{service} returned status {status}")]
    Upstream { service: &'static str, status: u16 },
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.into_network_error())
    }
}

/// Cache store errors
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache store unavailable: {0}")]
    Unavailable(String),
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
