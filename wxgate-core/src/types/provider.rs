//! Upstream provider identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{NOAA_STATUS_URL, OPEN_METEO_DOCS_URL};
use crate::error::ConfigError;

/// Identifies the upstream service an operation or error belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderId {
    /// National Weather Service API (api.weather.gov), US coverage only.
    Noaa,
    /// Open-Meteo forecast and archive APIs, global coverage.
    OpenMeteo,
}

impl ProviderId {
    /// Short tag used in cache keys and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderId::Noaa => "noaa",
            ProviderId::OpenMeteo => "open-meteo",
        }
    }

    /// Human-readable name used in user-facing messages.
    pub fn display_name(self) -> &'static str {
        match self {
            ProviderId::Noaa => "NOAA National Weather Service",
            ProviderId::OpenMeteo => "Open-Meteo",
        }
    }

    /// Status or documentation page offered as a help reference.
    pub fn status_url(self) -> &'static str {
        match self {
            ProviderId::Noaa => NOAA_STATUS_URL,
            ProviderId::OpenMeteo => OPEN_METEO_DOCS_URL,
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ProviderId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "noaa" | "nws" => Ok(ProviderId::Noaa),
            "open-meteo" | "openmeteo" | "open_meteo" => Ok(ProviderId::OpenMeteo),
            other => Err(ConfigError::InvalidValue {
                name: "provider".into(),
                value: other.into(),
                reason: "expected 'noaa' or 'open-meteo'".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_tags() {
        assert_eq!(ProviderId::Noaa.as_str(), "noaa");
        assert_eq!(ProviderId::OpenMeteo.as_str(), "open-meteo");
        assert_eq!(
            ProviderId::Noaa.to_string(),
            "NOAA National Weather Service"
        );
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("NOAA".parse::<ProviderId>().unwrap(), ProviderId::Noaa);
        assert_eq!(
            " open-meteo ".parse::<ProviderId>().unwrap(),
            ProviderId::OpenMeteo
        );
        assert!("darksky".parse::<ProviderId>().is_err());
    }

    #[test]
    fn test_provider_serde() {
        let json = serde_json::to_string(&ProviderId::OpenMeteo).unwrap();
        assert_eq!(json, "\"open-meteo\"");
    }
}
