//! IP geolocation: resolve a client IP to coordinates and a place name.
//! Uses ipapi.co - free, no API key required.

use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::types::FetchError;

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
    country_name: Option<String>,
    city: Option<String>,
    region: Option<String>,
    /// Set for reserved addresses (HTTP 200) and rate limiting (HTTP 429)
    #[serde(default)]
    error: bool,
    reason: Option<String>,
}

/// What the geolocation service knew about an IP. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoLocation {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub country: Option<String>,
    /// City, or the region when no city is known
    pub city: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[derive(Debug, Clone)]
pub struct GeoClient {
    client: Client,
    base_url: String,
}

impl GeoClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Look up `ip`.
    ///
    /// An answer flagged as an error by the service (reserved address, quota),
    /// whether sent with 200 or a 4xx status, is not a failure: it comes back
    /// as an empty `GeoLocation` so the caller substitutes its defaults.
    ///
    /// # Errors
    /// Network failures, 5xx statuses, 4xx statuses without an error body,
    /// and undecodable bodies.
    #[instrument(skip(self), level = "debug")]
    pub async fn locate(&self, ip: &str) -> Result<GeoLocation, FetchError> {
        let url = format!("{}/{}/json/", self.base_url, ip);

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if status.is_client_error() {
            // ipapi.co reports quota and lookup errors as 4xx with an error body
            return match response.json::<IpApiResponse>().await {
                Ok(body) if body.error => {
                    tracing::debug!(
                        "Geolocation refused {} with status {}: {}",
                        ip,
                        status,
                        body.reason.as_deref().unwrap_or("unspecified")
                    );
                    Ok(GeoLocation::default())
                }
                _ => {
                    tracing::debug!("Geolocation returned status {}", status);
                    Err(FetchError::Upstream {
                        service: "geolocation",
                        status: status.as_u16(),
                    })
                }
            };
        }
        if !status.is_success() {
            tracing::debug!("Geolocation returned status {}", status);
            return Err(FetchError::Upstream {
                service: "geolocation",
                status: status.as_u16(),
            });
        }

        let body: IpApiResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(format!("geolocation body: {}", e)))?;

        if body.error {
            tracing::debug!(
                "Geolocation has no answer for {}: {}",
                ip,
                body.reason.as_deref().unwrap_or("unspecified")
            );
            return Ok(GeoLocation::default());
        }

        let city = non_empty(body.city).or_else(|| non_empty(body.region));

        Ok(GeoLocation {
            latitude: body.latitude,
            longitude: body.longitude,
            country: non_empty(body.country_name),
            city,
        })
    }
}
