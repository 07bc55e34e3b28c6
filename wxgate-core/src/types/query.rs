//! Semantic request model and cache-key generation.

use std::fmt::Write as _;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{COORDINATE_KEY_PRECISION, LATEST_UTC_OFFSET_HOURS, MAX_FORECAST_DAYS};
use crate::error::{Result, WeatherError};
use crate::types::{DataCategory, ProviderId};

/// A point on the globe in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude, `-90..=90`.
    pub latitude: f64,
    /// Longitude, `-180..=180`.
    pub longitude: f64,
}

impl Coordinates {
    /// Creates a coordinate pair. Use [`Coordinates::validate`] before sending upstream.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Checks both components are finite and in range.
    pub fn validate(&self, provider: ProviderId) -> Result<()> {
        check_range(provider, "latitude", self.latitude, 90.0)?;
        check_range(provider, "longitude", self.longitude, 180.0)
    }

    /// Coordinates rounded to the cache-key precision.
    ///
    /// Nearby queries collapse onto the same key, trading a little spatial
    /// precision for a higher hit rate.
    pub fn rounded(&self) -> (f64, f64) {
        (round_coordinate(self.latitude), round_coordinate(self.longitude))
    }
}

fn check_range(provider: ProviderId, field: &str, value: f64, bound: f64) -> Result<()> {
    if !value.is_finite() || value < -bound || value > bound {
        return Err(WeatherError::invalid_input(
            provider,
            field,
            value.to_string(),
            format!("must be between -{bound} and {bound}"),
        ));
    }
    Ok(())
}

fn round_coordinate(value: f64) -> f64 {
    let scale = 10f64.powi(COORDINATE_KEY_PRECISION);
    let rounded = (value * scale).round() / scale;
    // Fold -0.0 into 0.0 so both sides of the meridian/equator share a key.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// A semantic upstream request.
///
/// Every variant maps to exactly one [`DataCategory`] and produces a
/// deterministic cache key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "query", rename_all = "snake_case")]
pub enum Query {
    /// Forecast grid lookup for a location.
    GridPoint {
        /// Location
        coords: Coordinates,
    },
    /// Observation stations near a location.
    Stations {
        /// Location
        coords: Coordinates,
    },
    /// Daily forecast for the next `days` days.
    Forecast {
        /// Location
        coords: Coordinates,
        /// Forecast horizon in days
        days: u8,
    },
    /// Latest observed conditions.
    CurrentConditions {
        /// Location
        coords: Coordinates,
    },
    /// Active alerts covering a location.
    Alerts {
        /// Location
        coords: Coordinates,
    },
    /// Daily historical records for an inclusive date range.
    Historical {
        /// Location
        coords: Coordinates,
        /// First day (inclusive)
        start: NaiveDate,
        /// Last day (inclusive)
        end: NaiveDate,
    },
}

impl Query {
    /// The location the query targets.
    pub fn coords(&self) -> Coordinates {
        match self {
            Query::GridPoint { coords }
            | Query::Stations { coords }
            | Query::Forecast { coords, .. }
            | Query::CurrentConditions { coords }
            | Query::Alerts { coords }
            | Query::Historical { coords, .. } => *coords,
        }
    }

    /// The freshness category of the data this query returns.
    ///
    /// A historical range is aged by the moment its latest day has ended
    /// everywhere on Earth. Upstream archives bucket days in the location's
    /// local time, so the day can still be open west of UTC after midnight UTC.
    pub fn category(&self) -> DataCategory {
        match self {
            Query::GridPoint { .. } => DataCategory::GridPoint,
            Query::Stations { .. } => DataCategory::Stations,
            Query::Forecast { .. } => DataCategory::Forecast,
            Query::CurrentConditions { .. } => DataCategory::Observation,
            Query::Alerts { .. } => DataCategory::Alerts,
            Query::Historical { end, .. } => DataCategory::Historical {
                reference: latest_end_of_day(*end),
            },
        }
    }

    /// Deterministic cache key: `provider:category:param=value|...`.
    pub fn cache_key(&self, provider: ProviderId) -> String {
        let (lat, lon) = self.coords().rounded();
        let mut key = format!(
            "{}:{}:lat={lat:.2}|lon={lon:.2}",
            provider.as_str(),
            self.category().tag()
        );
        match self {
            Query::Forecast { days, .. } => {
                let _ = write!(key, "|days={days}");
            }
            Query::Historical { start, end, .. } => {
                let _ = write!(key, "|start={start}|end={end}");
            }
            Query::GridPoint { .. }
            | Query::Stations { .. }
            | Query::CurrentConditions { .. }
            | Query::Alerts { .. } => {}
        }
        key
    }

    /// Local precondition checks, evaluated against today's UTC date.
    pub fn validate(&self, provider: ProviderId) -> Result<()> {
        self.validate_at(provider, Utc::now().date_naive())
    }

    /// Local precondition checks against an explicit `today`.
    pub fn validate_at(&self, provider: ProviderId, today: NaiveDate) -> Result<()> {
        self.coords().validate(provider)?;
        match self {
            Query::Forecast { days, .. } if *days == 0 || *days > MAX_FORECAST_DAYS => {
                Err(WeatherError::invalid_input(
                    provider,
                    "days",
                    days.to_string(),
                    format!("must be between 1 and {MAX_FORECAST_DAYS}"),
                ))
            }
            Query::Historical { start, end, .. } if start > end => Err(WeatherError::validation(
                provider,
                format!("start date {start} is after end date {end}"),
            )),
            Query::Historical { end, .. } if *end > today => Err(WeatherError::validation(
                provider,
                format!("end date {end} is in the future"),
            )),
            _ => Ok(()),
        }
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Query::GridPoint { .. } => "grid_point",
            Query::Stations { .. } => "stations",
            Query::Forecast { .. } => "forecast",
            Query::CurrentConditions { .. } => "current_conditions",
            Query::Alerts { .. } => "alerts",
            Query::Historical { .. } => "historical",
        }
    }
}

/// End of `date` in the westernmost time zone (UTC-12), as a UTC instant.
fn latest_end_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.succ_opt()
        .and_then(|next| {
            next.and_time(NaiveTime::MIN)
                .and_utc()
                .checked_add_signed(Duration::hours(LATEST_UTC_OFFSET_HOURS))
        })
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
