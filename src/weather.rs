//! Weather at the current position.
//!
//! The core only hands out the coordinate to query and takes back a
//! [`WeatherReport`]. Lookup failures never surface as errors: the caller
//! gets [`WeatherReport::fallback`] and a warning is logged.
//!
//! The live OpenWeatherMap client needs the `http` feature.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpeedSyncError};

/// Current conditions for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    /// Rounded temperature (°C)
    pub temperature_c: i32,
    /// Short condition group, e.g. "Clear", "Rain"
    pub condition: String,
    /// Provider icon code, e.g. "01d"
    pub icon: String,
    pub description: String,
}

impl WeatherReport {
    /// Shown whenever the lookup fails.
    pub fn fallback() -> Self {
        Self {
            temperature_c: 22,
            condition: "Clear".to_string(),
            icon: "01d".to_string(),
            description: "clear sky".to_string(),
        }
    }

    /// Daytime unless the provider icon code ends in `n`.
    pub fn is_day(&self) -> bool {
        !self.icon.ends_with('n')
    }

    /// Emoji for this report's condition.
    pub fn emoji(&self) -> &'static str {
        weather_icon(&self.condition, self.is_day())
    }
}

/// Emoji for a condition group.
pub fn weather_icon(condition: &str, is_day: bool) -> &'static str {
    match condition {
        "Clear" if is_day => "☀️",
        "Clear" => "🌙",
        "Clouds" => "☁️",
        "Rain" => "🌧️",
        "Drizzle" => "🌦️",
        "Thunderstorm" => "⛈️",
        "Snow" => "❄️",
        "Mist" | "Fog" => "🌫️",
        _ => "🌤️",
    }
}

/// Current-weather response, only the fields we read.
#[derive(Debug, Deserialize)]
struct OwmResponse {
    main: OwmMain,
    weather: Vec<OwmCondition>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    main: String,
    icon: String,
    description: String,
}

/// Parse an OpenWeatherMap current-weather body (metric units).
pub fn parse_openweather(body: &str) -> Result<WeatherReport> {
    let response: OwmResponse = serde_json::from_str(body)?;
    let condition = response
        .weather
        .into_iter()
        .next()
        .ok_or_else(|| SpeedSyncError::Http {
            message: "weather response has no conditions".to_string(),
            status_code: None,
        })?;

    Ok(WeatherReport {
        temperature_c: response.main.temp.round() as i32,
        condition: condition.main,
        icon: condition.icon,
        description: condition.description,
    })
}

#[cfg(feature = "http")]
pub use client::{fetch_weather_blocking, WeatherClient};

#[cfg(feature = "http")]
mod client {
    use std::time::Duration;

    use log::{debug, warn};
    use reqwest::Client;

    use super::{parse_openweather, WeatherReport};
    use crate::error::{Result, SpeedSyncError};
    use crate::Coordinate;

    const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

    /// OpenWeatherMap client.
    pub struct WeatherClient {
        client: Client,
        api_key: String,
        base_url: String,
    }

    impl WeatherClient {
        pub fn new(api_key: &str) -> Result<Self> {
            let client = Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .map_err(|e| SpeedSyncError::Http {
                    message: format!("Failed to create HTTP client: {}", e),
                    status_code: None,
                })?;

            Ok(Self {
                client,
                api_key: api_key.to_string(),
                base_url: DEFAULT_BASE_URL.to_string(),
            })
        }

        /// Point the client at another endpoint (proxies, tests).
        pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
            self.base_url = base_url.into();
            self
        }

        /// Current weather at `coordinate`, or the fallback on any failure.
        pub async fn fetch(&self, coordinate: Coordinate) -> WeatherReport {
            match self.try_fetch(coordinate).await {
                Ok(report) => {
                    debug!(
                        "[Weather] {} {}°C at {:.4}, {:.4}",
                        report.condition,
                        report.temperature_c,
                        coordinate.latitude,
                        coordinate.longitude
                    );
                    report
                }
                Err(e) => {
                    warn!("[Weather] Lookup failed, using fallback: {}", e);
                    WeatherReport::fallback()
                }
            }
        }

        async fn try_fetch(&self, coordinate: Coordinate) -> Result<WeatherReport> {
            let lat = coordinate.latitude.to_string();
            let lon = coordinate.longitude.to_string();
            let response = self
                .client
                .get(&self.base_url)
                .query(&[
                    ("lat", lat.as_str()),
                    ("lon", lon.as_str()),
                    ("appid", self.api_key.as_str()),
                    ("units", "metric"),
                ])
                .send()
                .await
                .map_err(|e| SpeedSyncError::Http {
                    message: e.to_string(),
                    status_code: e.status().map(|s| s.as_u16()),
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(SpeedSyncError::Http {
                    message: format!("HTTP {}", status),
                    status_code: Some(status.as_u16()),
                });
            }

            let body = response.text().await.map_err(|e| SpeedSyncError::Http {
                message: e.to_string(),
                status_code: Some(status.as_u16()),
            })?;
            parse_openweather(&body)
        }
    }

    /// Blocking lookup for hosts without an async runtime.
    pub fn fetch_weather_blocking(api_key: &str, coordinate: Coordinate) -> WeatherReport {
        use tokio::runtime::Runtime;

        let rt = match Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                warn!("[Weather] Failed to create runtime: {}", e);
                return WeatherReport::fallback();
            }
        };
        let client = match WeatherClient::new(api_key) {
            Ok(client) => client,
            Err(e) => {
                warn!("[Weather] {}", e);
                return WeatherReport::fallback();
            }
        };
        rt.block_on(client.fetch(coordinate))
    }
}
