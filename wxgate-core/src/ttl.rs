//! Freshness policy: how long each category of data may be served from cache.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    ALERTS_TTL, FORECAST_TTL, HISTORICAL_FINALIZATION_AGE, OBSERVATION_TTL,
    RECENT_HISTORICAL_TTL, STATIONS_TTL,
};
use crate::types::DataCategory;

/// Lifetime of a cache entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ttl {
    /// Expires after the duration.
    Finite(Duration),
    /// Never expires; only capacity eviction removes it.
    Infinite,
}

impl Ttl {
    /// Returns true for the never-expires sentinel.
    pub fn is_infinite(&self) -> bool {
        matches!(self, Ttl::Infinite)
    }

    /// The finite duration, if any.
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Ttl::Finite(d) => Some(*d),
            Ttl::Infinite => None,
        }
    }
}

impl From<Duration> for Ttl {
    fn from(d: Duration) -> Self {
        Ttl::Finite(d)
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ttl::Finite(d) => write!(f, "{}s", d.as_secs()),
            Ttl::Infinite => f.write_str("infinite"),
        }
    }
}

/// Maps data categories to lifetimes.
///
/// Historical data is aged against its own reference time: once the provider
/// has had [`TtlPolicy::finalization_age`] to apply corrections the record is
/// treated as final and cached forever; younger records get a short TTL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtlPolicy {
    /// Station and metadata lists
    pub stations: Duration,
    /// Multi-day forecasts
    pub forecast: Duration,
    /// Latest observations
    pub observation: Duration,
    /// Active alerts
    pub alerts: Duration,
    /// Historical records not yet finalized
    pub recent_historical: Duration,
    /// Age beyond which historical records never change
    pub finalization_age: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            stations: STATIONS_TTL,
            forecast: FORECAST_TTL,
            observation: OBSERVATION_TTL,
            alerts: ALERTS_TTL,
            recent_historical: RECENT_HISTORICAL_TTL,
            finalization_age: HISTORICAL_FINALIZATION_AGE,
        }
    }
}

impl TtlPolicy {
    /// Lifetime for `category`, evaluated at `now`.
    pub fn ttl_for(&self, category: DataCategory, now: DateTime<Utc>) -> Ttl {
        match category {
            DataCategory::GridPoint => Ttl::Infinite,
            DataCategory::Stations => Ttl::Finite(self.stations),
            DataCategory::Forecast => Ttl::Finite(self.forecast),
            DataCategory::Observation => Ttl::Finite(self.observation),
            DataCategory::Alerts => Ttl::Finite(self.alerts),
            DataCategory::Historical { reference } => self.historical_ttl(reference, now),
        }
    }

    /// Lifetime for `category`, evaluated against the wall clock.
    pub fn ttl_for_now(&self, category: DataCategory) -> Ttl {
        self.ttl_for(category, Utc::now())
    }

    fn historical_ttl(&self, reference: DateTime<Utc>, now: DateTime<Utc>) -> Ttl {
        // A reference in the future yields a negative age: not final.
        let finalized = (now - reference)
            .to_std()
            .is_ok_and(|age| age > self.finalization_age);
        if finalized {
            Ttl::Infinite
        } else {
            Ttl::Finite(self.recent_historical)
        }
    }
}
