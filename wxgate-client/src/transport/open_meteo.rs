//! Open-Meteo forecast and archive APIs.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::instrument;

use wxgate_core::constants::{
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_USER_AGENT, OPEN_METEO_ARCHIVE_URL, OPEN_METEO_BASE_URL,
};
use wxgate_core::error::{Result, WeatherError};
use wxgate_core::{Coordinates, ProviderId, Query, Transport};

use super::http::{join, HttpClient};

const DAILY_FORECAST_VARS: &str = "weather_code,temperature_2m_max,temperature_2m_min,\
precipitation_sum,precipitation_probability_max,wind_speed_10m_max";
const CURRENT_VARS: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,\
precipitation,weather_code,wind_speed_10m,wind_direction_10m";
const DAILY_ARCHIVE_VARS: &str = "weather_code,temperature_2m_max,temperature_2m_min,\
precipitation_sum,wind_speed_10m_max";

/// Open-Meteo transport configuration.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct OpenMeteoConfig {
    /// Forecast API root
    pub base_url: String,
    /// Historical archive API root
    pub archive_url: String,
    /// Sent on every request
    pub user_agent: String,
    /// Per-attempt timeout
    pub timeout: Duration,
}

impl Default for OpenMeteoConfig {
    fn default() -> Self {
        Self {
            base_url: OPEN_METEO_BASE_URL.to_string(),
            archive_url: OPEN_METEO_ARCHIVE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl OpenMeteoConfig {
    /// Points both the forecast and the archive API at one root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.archive_url = base_url.clone();
        self.base_url = base_url;
        self
    }
}

/// Transport for Open-Meteo.
#[derive(Clone, Debug)]
pub struct OpenMeteoTransport {
    config: OpenMeteoConfig,
    http: HttpClient,
}

impl OpenMeteoTransport {
    /// Creates a transport from config.
    pub fn new(config: OpenMeteoConfig) -> Result<Self> {
        let http = HttpClient::new(
            ProviderId::OpenMeteo,
            config.timeout,
            &config.user_agent,
            "application/json",
        )?;
        Ok(Self { config, http })
    }

    async fn forecast(&self, coords: Coordinates, days: u8) -> Result<Value> {
        let mut params = location(coords);
        params.push(("daily", DAILY_FORECAST_VARS.to_string()));
        params.push(("forecast_days", days.to_string()));
        params.push(("timezone", "auto".to_string()));

        let url = join(&self.config.base_url, "/v1/forecast");
        self.http.get_json(&url, &params, "forecast").await
    }

    async fn current(&self, coords: Coordinates) -> Result<Value> {
        let mut params = location(coords);
        params.push(("current", CURRENT_VARS.to_string()));
        params.push(("timezone", "auto".to_string()));

        let url = join(&self.config.base_url, "/v1/forecast");
        self.http.get_json(&url, &params, "current conditions").await
    }

    async fn archive(
        &self,
        coords: Coordinates,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Value> {
        let mut params = location(coords);
        params.push(("start_date", start.to_string()));
        params.push(("end_date", end.to_string()));
        params.push(("daily", DAILY_ARCHIVE_VARS.to_string()));
        params.push(("timezone", "auto".to_string()));

        let url = join(&self.config.archive_url, "/v1/archive");
        self.http.get_json(&url, &params, "historical records").await
    }
}

fn location(coords: Coordinates) -> Vec<(&'static str, String)> {
    vec![
        ("latitude", coords.latitude.to_string()),
        ("longitude", coords.longitude.to_string()),
    ]
}

fn unsupported(what: &str) -> WeatherError {
    WeatherError::validation(
        ProviderId::OpenMeteo,
        format!("{what} are not offered by Open-Meteo; use NOAA"),
    )
}

#[async_trait]
impl Transport for OpenMeteoTransport {
    fn provider(&self) -> ProviderId {
        ProviderId::OpenMeteo
    }

    fn supports(&self, query: &Query) -> bool {
        matches!(
            query,
            Query::Forecast { .. } | Query::CurrentConditions { .. } | Query::Historical { .. }
        )
    }

    #[instrument(skip(self, query), fields(query = query.name()))]
    async fn send(&self, query: &Query) -> Result<Value> {
        match *query {
            Query::Forecast { coords, days } => self.forecast(coords, days).await,
            Query::CurrentConditions { coords } => self.current(coords).await,
            Query::Historical { coords, start, end } => self.archive(coords, start, end).await,
            Query::GridPoint { .. } => Err(unsupported("forecast grid lookups")),
            Query::Stations { .. } => Err(unsupported("observation station lists")),
            Query::Alerts { .. } => Err(unsupported("weather alerts")),
        }
    }

    #[instrument(skip(self))]
    async fn probe(&self) -> Result<()> {
        let params = [
            ("latitude", "0".to_string()),
            ("longitude", "0".to_string()),
            ("current", "temperature_2m".to_string()),
            ("forecast_days", "1".to_string()),
        ];
        let url = join(&self.config.base_url, "/v1/forecast");
        self.http.get_json(&url, &params, "service status").await?;
        Ok(())
    }
}
