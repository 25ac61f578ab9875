use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::types::{describe_wmo_code, FetchError, WeatherCategory, WeatherSnapshot};

const HOURLY_FIELDS: &str = "temperature_2m,relativehumidity_2m,windspeed_10m";

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    timezone: Option<String>,
    current_weather: CurrentWeatherBlock,
    hourly: HourlyBlock,
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherBlock {
    temperature: f64,
    windspeed: f64,
    weathercode: i32,
}

#[derive(Debug, Deserialize)]
struct HourlyBlock {
    relativehumidity_2m: Vec<f64>,
}

/// Current weather for a coordinate pair
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentConditions {
    /// Timezone resolved by the service (`timezone=auto`), if it sent one
    pub timezone: Option<String>,
    pub weather: WeatherSnapshot,
}

/// Open-Meteo forecast client
#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Client,
    base_url: String,
}

impl WeatherProvider {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch current conditions at the given coordinates.
    ///
    /// # Errors
    /// Network failures, non-success statuses, undecodable bodies and an empty
    /// humidity series.
    #[instrument(skip(self), level = "debug")]
    pub async fn current(&self, latitude: f64, longitude: f64) -> Result<CurrentConditions, FetchError> {
        let url = format!("{}/v1/forecast", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("current_weather", "true".to_string()),
                ("hourly", HOURLY_FIELDS.to_string()),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("Forecast returned status {}", status);
            return Err(FetchError::Upstream {
                service: "weather",
                status: status.as_u16(),
            });
        }

        let body: ForecastResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(format!("forecast body: {}", e)))?;

        let humidity = body
            .hourly
            .relativehumidity_2m
            .first()
            .copied()
            .ok_or_else(|| FetchError::Parse("forecast has no hourly humidity".to_string()))?;

        let current = body.current_weather;

        Ok(CurrentConditions {
            timezone: body.timezone.filter(|tz| !tz.is_empty()),
            weather: WeatherSnapshot {
                temp: current.temperature,
                // No apparent-temperature model; reported as the air temperature
                feels_like: current.temperature,
                humidity,
                wind_speed: current.windspeed,
                main: WeatherCategory::from_wmo_code(current.weathercode),
                description: describe_wmo_code(current.weathercode).to_string(),
            },
        })
    }
}
