//! Placeholder record served when live data can't be obtained.

use crate::types::{LocationWeatherRecord, RecordSource, WeatherCategory, WeatherSnapshot};

pub const FALLBACK_COUNTRY: &str = "中国";
pub const FALLBACK_CITY: &str = "北京";
pub const FALLBACK_TIMEZONE: &str = "Asia/Shanghai";
const FALLBACK_LATITUDE: f64 = 39.9042;
const FALLBACK_LONGITUDE: f64 = 116.4074;

/// Fixed Beijing/clear-sky record for `ip`, stamped with `timestamp`
pub fn fallback_record(ip: &str, timestamp: i64) -> LocationWeatherRecord {
    LocationWeatherRecord {
        ip: ip.to_string(),
        country: FALLBACK_COUNTRY.to_string(),
        city: FALLBACK_CITY.to_string(),
        timezone: FALLBACK_TIMEZONE.to_string(),
        latitude: FALLBACK_LATITUDE,
        longitude: FALLBACK_LONGITUDE,
        weather: WeatherSnapshot {
            temp: 22.0,
            feels_like: 23.0,
            humidity: 65.0,
            wind_speed: 3.2,
            main: WeatherCategory::Clear,
            description: "晴朗".to_string(),
        },
        timestamp,
        cached: false,
        source: RecordSource::Fallback,
    }
}
