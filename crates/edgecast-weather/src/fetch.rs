//! Geolocation followed by a forecast lookup, merged into one record.

use edgecast_core::{DefaultsConfig, UpstreamConfig};
use reqwest::Client;
use std::time::Duration;

use crate::geoip::GeoClient;
use crate::provider::WeatherProvider;
use crate::types::{FetchError, LocationWeatherRecord, RecordSource};

const USER_AGENT: &str = concat!("edgecast/", env!("CARGO_PKG_VERSION"));

pub const UNKNOWN_COUNTRY: &str = "未知";
pub const UNKNOWN_CITY: &str = "未知位置";

#[derive(Debug, Clone)]
pub struct LocationWeatherFetcher {
    geo: GeoClient,
    weather: WeatherProvider,
    defaults: DefaultsConfig,
}

impl LocationWeatherFetcher {
    /// Build both upstream clients over one shared connection pool.
    ///
    /// # Errors
    /// Returns `FetchError::Network` if the HTTP client can't be constructed.
    pub fn new(upstream: &UpstreamConfig, defaults: DefaultsConfig) -> Result<Self, FetchError> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(secs) = upstream.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        Ok(Self {
            geo: GeoClient::new(client.clone(), &upstream.geolocation_url),
            weather: WeatherProvider::new(client, &upstream.weather_url),
            defaults,
        })
    }

    /// Resolve `ip` and fetch its current weather. The record is stamped with
    /// `timestamp` and tagged as a fresh API call.
    ///
    /// # Errors
    /// Any failure of either upstream call.
    pub async fn fetch(&self, ip: &str, timestamp: i64) -> Result<LocationWeatherRecord, FetchError> {
        let location = self.geo.locate(ip).await?;

        let latitude = location.latitude.unwrap_or(self.defaults.latitude);
        let longitude = location.longitude.unwrap_or(self.defaults.longitude);
        if location.latitude.is_none() || location.longitude.is_none() {
            tracing::debug!(
                "No coordinates for {}, using default {}, {}",
                ip,
                latitude,
                longitude
            );
        }

        let conditions = self.weather.current(latitude, longitude).await?;

        Ok(LocationWeatherRecord {
            ip: ip.to_string(),
            country: location.country.unwrap_or_else(|| UNKNOWN_COUNTRY.to_string()),
            city: location.city.unwrap_or_else(|| UNKNOWN_CITY.to_string()),
            timezone: conditions
                .timezone
                .unwrap_or_else(|| self.defaults.timezone.clone()),
            latitude,
            longitude,
            weather: conditions.weather,
            timestamp,
            cached: false,
            source: RecordSource::ApiCall,
        })
    }
}
