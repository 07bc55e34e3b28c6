//! Data categories, the unit of freshness policy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of upstream data, each with its own staleness characteristics.
///
/// Closed on purpose: adding a category forces every `match` over it
/// (most importantly [`crate::TtlPolicy::ttl_for`]) to be revisited.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataCategory {
    /// Location to forecast-grid mapping. Immutable.
    GridPoint,
    /// Observation station lists and similar metadata.
    Stations,
    /// Multi-day forecasts.
    Forecast,
    /// Latest observed conditions.
    Observation,
    /// Active weather alerts.
    Alerts,
    /// Historical records, aged relative to their own reference time.
    Historical {
        /// Timestamp of the most recent record covered by the data.
        reference: DateTime<Utc>,
    },
}

impl DataCategory {
    /// Short tag used in cache keys and logs.
    pub fn tag(&self) -> &'static str {
        match self {
            DataCategory::GridPoint => "grid",
            DataCategory::Stations => "stations",
            DataCategory::Forecast => "forecast",
            DataCategory::Observation => "observation",
            DataCategory::Alerts => "alerts",
            DataCategory::Historical { .. } => "historical",
        }
    }
}
