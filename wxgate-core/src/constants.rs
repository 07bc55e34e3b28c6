//! Protocol and policy constants for wxgate.
//!
//! Freshness values encode how quickly each kind of upstream data goes stale.
//! They are defaults; deployments may override them through [`crate::TtlPolicy`].

use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// FRESHNESS (TTL) DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Station and metadata lists change rarely.
pub const STATIONS_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Multi-day forecasts are reissued a few times per day.
pub const FORECAST_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Near-term observations update roughly every quarter hour.
pub const OBSERVATION_TTL: Duration = Duration::from_secs(15 * 60);

/// Active alerts can be issued or cancelled at any time.
pub const ALERTS_TTL: Duration = Duration::from_secs(5 * 60);

/// Historical records younger than the finalization threshold may still be revised.
pub const RECENT_HISTORICAL_TTL: Duration = Duration::from_secs(60 * 60);

/// Age after which a historical record is considered final.
pub const HISTORICAL_FINALIZATION_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Hours a calendar day keeps running after it ends in UTC (UTC-12 is the
/// westernmost offset). Archives bucket days in the location's local time.
pub const LATEST_UTC_OFFSET_HOURS: i64 = 12;

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE / RETRY / TRANSPORT DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default maximum number of cache entries shared by all categories.
pub const DEFAULT_CACHE_MAX_SIZE: usize = 1000;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default backoff unit; attempt `n` waits up to `2^n` of these.
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Lower bound of the jitter factor applied to backoff delays.
pub const JITTER_MIN: f64 = 0.5;

/// Upper bound of the jitter factor applied to backoff delays.
pub const JITTER_MAX: f64 = 1.0;

/// Default per-attempt request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Decimal places kept from coordinates when generating cache keys.
pub const COORDINATE_KEY_PRECISION: i32 = 2;

/// Longest forecast horizon accepted by [`crate::Query::validate`].
pub const MAX_FORECAST_DAYS: u8 = 16;

// ═══════════════════════════════════════════════════════════════════════════════
// UPSTREAM ENDPOINTS
// ═══════════════════════════════════════════════════════════════════════════════

/// National Weather Service API.
pub const NOAA_BASE_URL: &str = "https://api.weather.gov";

/// Open-Meteo forecast API.
pub const OPEN_METEO_BASE_URL: &str = "https://api.open-meteo.com";

/// Open-Meteo historical archive API.
pub const OPEN_METEO_ARCHIVE_URL: &str = "https://archive-api.open-meteo.com";

/// NOAA requires an identifying User-Agent on every request.
pub const DEFAULT_USER_AGENT: &str = "wxgate/0.1 (https://github.com/wxgate/wxgate)";

/// Public status page for the National Weather Service API.
pub const NOAA_STATUS_URL: &str = "https://www.weather.gov/documentation/services-web-api";

/// Public documentation for the Open-Meteo APIs.
pub const OPEN_METEO_DOCS_URL: &str = "https://open-meteo.com/en/docs";
