//! National Weather Service API (api.weather.gov).
//!
//! Most NOAA data hangs off the `/points/{lat},{lon}` document, which names
//! the forecast office grid and links to the forecast and station lists.
//! Coverage is limited to the United States; other points return 404.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use wxgate_core::constants::{DEFAULT_REQUEST_TIMEOUT, DEFAULT_USER_AGENT, NOAA_BASE_URL};
use wxgate_core::error::{Result, TransportFailure, WeatherError};
use wxgate_core::{Coordinates, ProviderId, Query, Transport};

use super::http::{join, HttpClient};

const GEO_JSON: &str = "application/geo+json";

/// NOAA transport configuration.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct NoaaConfig {
    /// API root, normally `https://api.weather.gov`
    pub base_url: String,
    /// Sent on every request; NOAA rejects anonymous clients
    pub user_agent: String,
    /// Per-attempt timeout
    pub timeout: Duration,
}

impl Default for NoaaConfig {
    fn default() -> Self {
        Self {
            base_url: NOAA_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl NoaaConfig {
    /// Config pointing at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Transport for api.weather.gov.
#[derive(Clone, Debug)]
pub struct NoaaTransport {
    config: NoaaConfig,
    http: HttpClient,
}

impl NoaaTransport {
    /// Creates a transport from config.
    pub fn new(config: NoaaConfig) -> Result<Self> {
        let http = HttpClient::new(
            ProviderId::Noaa,
            config.timeout,
            &config.user_agent,
            GEO_JSON,
        )?;
        Ok(Self { config, http })
    }

    fn url(&self, path: &str) -> String {
        join(&self.config.base_url, path)
    }

    async fn points(&self, coords: Coordinates) -> Result<Value> {
        let url = self.url(&format!(
            "/points/{:.4},{:.4}",
            coords.latitude, coords.longitude
        ));
        self.http.get_json(&url, &[], "gridpoint").await
    }

    async fn stations(&self, coords: Coordinates) -> Result<Value> {
        let points = self.points(coords).await?;
        let url = linked_url(&points, "/properties/observationStations")?;
        self.http.get_json(&url, &[], "observation stations").await
    }

    async fn forecast(&self, coords: Coordinates, days: u8) -> Result<Value> {
        let points = self.points(coords).await?;
        let url = linked_url(&points, "/properties/forecast")?;
        let mut forecast = self.http.get_json(&url, &[], "forecast").await?;

        // NOAA returns day and night periods for about a week.
        if let Some(periods) = forecast
            .pointer_mut("/properties/periods")
            .and_then(Value::as_array_mut)
        {
            periods.truncate(usize::from(days) * 2);
        }
        Ok(forecast)
    }

    async fn current_conditions(&self, coords: Coordinates) -> Result<Value> {
        let stations = self.stations(coords).await?;
        let station = stations
            .pointer("/features/0/properties/stationIdentifier")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                WeatherError::not_found(ProviderId::Noaa, "observation station")
            })?;

        debug!(station, "Using nearest observation station");
        let url = self.url(&format!("/stations/{station}/observations/latest"));
        self.http.get_json(&url, &[], "latest observation").await
    }

    async fn alerts(&self, coords: Coordinates) -> Result<Value> {
        let url = self.url("/alerts/active");
        let point = format!("{:.4},{:.4}", coords.latitude, coords.longitude);
        self.http.get_json(&url, &[("point", point)], "alerts").await
    }
}

/// Follows a link the points document advertises.
fn linked_url(document: &Value, pointer: &str) -> Result<String> {
    document
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            WeatherError::transport(ProviderId::Noaa, TransportFailure::MalformedResponse)
        })
}

#[async_trait]
impl Transport for NoaaTransport {
    fn provider(&self) -> ProviderId {
        ProviderId::Noaa
    }

    fn supports(&self, query: &Query) -> bool {
        !matches!(query, Query::Historical { .. })
    }

    #[instrument(skip(self, query), fields(query = query.name()))]
    async fn send(&self, query: &Query) -> Result<Value> {
        match *query {
            Query::GridPoint { coords } => self.points(coords).await,
            Query::Stations { coords } => self.stations(coords).await,
            Query::Forecast { coords, days } => self.forecast(coords, days).await,
            Query::CurrentConditions { coords } => self.current_conditions(coords).await,
            Query::Alerts { coords } => self.alerts(coords).await,
            Query::Historical { .. } => Err(WeatherError::validation(
                ProviderId::Noaa,
                "historical records are not offered by NOAA; use Open-Meteo",
            )),
        }
    }

    #[instrument(skip(self))]
    async fn probe(&self) -> Result<()> {
        self.http.get_json(&self.url("/"), &[], "service status").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use wxgate_core::ErrorKind;

    const LAT: f64 = 39.7456;
    const LON: f64 = -97.0892;

    async fn setup() -> (MockServer, NoaaTransport) {
        let server = MockServer::start().await;
        let transport = NoaaTransport::new(NoaaConfig::default().with_base_url(server.uri()))
            .unwrap();
        (server, transport)
    }

    async fn mount_points(server: &MockServer) {
        let uri = server.uri();
        Mock::given(method("GET"))
            .and(path("/points/39.7456,-97.0892"))
            .and(header("accept", GEO_JSON))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "properties": {
                    "gridId": "TOP",
                    "gridX": 32,
                    "gridY": 81,
                    "forecast": format!("{uri}/gridpoints/TOP/32,81/forecast"),
                    "observationStations": format!("{uri}/gridpoints/TOP/32,81/stations"),
                }
            })))
            .mount(server)
            .await;
    }

    fn coords() -> Coordinates {
        Coordinates::new(LAT, LON)
    }

    #[tokio::test]
    async fn test_gridpoint() {
        let (server, transport) = setup().await;
        mount_points(&server).await;

        let body = transport
            .send(&Query::GridPoint { coords: coords() })
            .await
            .unwrap();
        assert_eq!(body["properties"]["gridId"], "TOP");
    }

    #[tokio::test]
    async fn test_forecast_follows_link_and_truncates() {
        let (server, transport) = setup().await;
        mount_points(&server).await;

        let periods: Vec<Value> = (1..=14).map(|n| json!({"number": n})).collect();
        Mock::given(method("GET"))
            .and(path("/gridpoints/TOP/32,81/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "properties": {"periods": periods}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let body = transport
            .send(&Query::Forecast {
                coords: coords(),
                days: 2,
            })
            .await
            .unwrap();
        let periods = body["properties"]["periods"].as_array().unwrap();
        assert_eq!(periods.len(), 4);
        assert_eq!(periods[0]["number"], 1);
    }

    #[tokio::test]
    async fn test_current_conditions_uses_first_station() {
        let (server, transport) = setup().await;
        mount_points(&server).await;

        Mock::given(method("GET"))
            .and(path("/gridpoints/TOP/32,81/stations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "features": [
                    {"properties": {"stationIdentifier": "KMHK"}},
                    {"properties": {"stationIdentifier": "KCNK"}}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/stations/KMHK/observations/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "properties": {"temperature": {"value": 21.5}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let body = transport
            .send(&Query::CurrentConditions { coords: coords() })
            .await
            .unwrap();
        assert_eq!(body["properties"]["temperature"]["value"], 21.5);
    }

    #[tokio::test]
    async fn test_current_conditions_without_stations_is_not_found() {
        let (server, transport) = setup().await;
        mount_points(&server).await;

        Mock::given(method("GET"))
            .and(path("/gridpoints/TOP/32,81/stations"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"features": []})),
            )
            .mount(&server)
            .await;

        let err = transport
            .send(&Query::CurrentConditions { coords: coords() })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_alerts_by_point() {
        let (server, transport) = setup().await;
        Mock::given(method("GET"))
            .and(path("/alerts/active"))
            .and(query_param("point", "39.7456,-97.0892"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"features": []})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let body = transport
            .send(&Query::Alerts { coords: coords() })
            .await
            .unwrap();
        assert!(body["features"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_point_outside_coverage_is_not_found() {
        let (server, transport) = setup().await;
        Mock::given(method("GET"))
            .and(path("/points/51.5074,-0.1278"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "title": "Data Unavailable For Requested Point",
                "status": 404
            })))
            .mount(&server)
            .await;

        let err = transport
            .send(&Query::GridPoint {
                coords: Coordinates::new(51.5074, -0.1278),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_missing_forecast_link_is_malformed() {
        let (server, transport) = setup().await;
        Mock::given(method("GET"))
            .and(path("/points/39.7456,-97.0892"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"properties": {}})),
            )
            .mount(&server)
            .await;

        let err = transport
            .send(&Query::Forecast {
                coords: coords(),
                days: 1,
            })
            .await
            .unwrap_err();
        assert_eq!(
            err,
            WeatherError::transport(ProviderId::Noaa, TransportFailure::MalformedResponse)
        );
    }

    #[tokio::test]
    async fn test_historical_is_unsupported() {
        let (server, transport) = setup().await;
        let query = Query::Historical {
            coords: coords(),
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        };

        assert!(!transport.supports(&query));
        assert!(transport.supports(&Query::Alerts { coords: coords() }));

        let err = transport.send(&query).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_probe() {
        let (server, transport) = setup().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "OK"})),
            )
            .mount(&server)
            .await;

        assert!(transport.probe().await.is_ok());
    }
}
