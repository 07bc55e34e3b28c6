//! Environment-driven configuration.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use wxgate_cache::CacheConfig;
use wxgate_core::constants::{
    DEFAULT_CACHE_MAX_SIZE, DEFAULT_MAX_RETRIES, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_RETRY_BASE_DELAY, DEFAULT_USER_AGENT, NOAA_BASE_URL, OPEN_METEO_ARCHIVE_URL,
    OPEN_METEO_BASE_URL,
};
use wxgate_core::ConfigError;

use crate::retry::RetryPolicy;
use crate::transport::{NoaaConfig, OpenMeteoConfig};

/// Gateway configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Whether responses are cached (`CACHE_ENABLED`)
    pub cache_enabled: bool,
    /// Entry bound shared by all providers (`CACHE_MAX_SIZE`)
    pub cache_max_size: usize,
    /// Retries per fetch (`MAX_RETRIES`)
    pub max_retries: u32,
    /// Backoff unit (`RETRY_BASE_DELAY_MS`)
    pub retry_base_delay: Duration,
    /// Per-attempt timeout (`REQUEST_TIMEOUT_MS`)
    pub request_timeout: Duration,
    /// NOAA API root (`NOAA_BASE_URL`)
    pub noaa_base_url: String,
    /// Open-Meteo forecast API root (`OPEN_METEO_BASE_URL`)
    pub open_meteo_base_url: String,
    /// Open-Meteo archive API root (`OPEN_METEO_ARCHIVE_URL`)
    pub open_meteo_archive_url: String,
    /// User-Agent sent upstream (`WXGATE_USER_AGENT`)
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_max_size: DEFAULT_CACHE_MAX_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            noaa_base_url: NOAA_BASE_URL.into(),
            open_meteo_base_url: OPEN_METEO_BASE_URL.into(),
            open_meteo_archive_url: OPEN_METEO_ARCHIVE_URL.into(),
            user_agent: DEFAULT_USER_AGENT.into(),
        }
    }
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`; unset names keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let cache_max_size = match read("CACHE_MAX_SIZE") {
            Some(raw) => parse_number::<usize>("CACHE_MAX_SIZE", &raw)?,
            None => defaults.cache_max_size,
        };
        if cache_max_size == 0 {
            return Err(invalid("CACHE_MAX_SIZE", "0", "must be greater than zero"));
        }

        Ok(Self {
            cache_enabled: match read("CACHE_ENABLED") {
                Some(raw) => parse_bool("CACHE_ENABLED", &raw)?,
                None => defaults.cache_enabled,
            },
            cache_max_size,
            max_retries: match read("MAX_RETRIES") {
                Some(raw) => parse_number("MAX_RETRIES", &raw)?,
                None => defaults.max_retries,
            },
            retry_base_delay: match read("RETRY_BASE_DELAY_MS") {
                Some(raw) => Duration::from_millis(parse_number("RETRY_BASE_DELAY_MS", &raw)?),
                None => defaults.retry_base_delay,
            },
            request_timeout: match read("REQUEST_TIMEOUT_MS") {
                Some(raw) => match parse_number::<u64>("REQUEST_TIMEOUT_MS", &raw)? {
                    0 => {
                        return Err(invalid(
                            "REQUEST_TIMEOUT_MS",
                            &raw,
                            "must be greater than zero",
                        ))
                    }
                    ms => Duration::from_millis(ms),
                },
                None => defaults.request_timeout,
            },
            noaa_base_url: match read("NOAA_BASE_URL") {
                Some(raw) => parse_url("NOAA_BASE_URL", &raw)?,
                None => defaults.noaa_base_url,
            },
            open_meteo_base_url: match read("OPEN_METEO_BASE_URL") {
                Some(raw) => parse_url("OPEN_METEO_BASE_URL", &raw)?,
                None => defaults.open_meteo_base_url,
            },
            open_meteo_archive_url: match read("OPEN_METEO_ARCHIVE_URL") {
                Some(raw) => parse_url("OPEN_METEO_ARCHIVE_URL", &raw)?,
                None => defaults.open_meteo_archive_url,
            },
            user_agent: read("WXGATE_USER_AGENT").unwrap_or(defaults.user_agent),
        })
    }

    /// Retry policy for every provider.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_base_delay)
    }

    /// Shared cache configuration.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::with_max_entries(self.cache_max_size)
    }

    /// NOAA transport configuration.
    pub fn noaa_config(&self) -> NoaaConfig {
        NoaaConfig {
            base_url: self.noaa_base_url.clone(),
            user_agent: self.user_agent.clone(),
            timeout: self.request_timeout,
        }
    }

    /// Open-Meteo transport configuration.
    pub fn open_meteo_config(&self) -> OpenMeteoConfig {
        OpenMeteoConfig {
            base_url: self.open_meteo_base_url.clone(),
            archive_url: self.open_meteo_archive_url.clone(),
            user_agent: self.user_agent.clone(),
            timeout: self.request_timeout,
        }
    }
}

fn invalid(name: &str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.into(),
        value: value.into(),
        reason: reason.into(),
    }
}

fn parse_bool(name: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid(name, raw, "expected true or false")),
    }
}

fn parse_number<T: FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| invalid(name, raw, "expected a non-negative integer"))
}

fn parse_url(name: &str, raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| invalid(name, raw, e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(name, raw, "expected an http or https URL"));
    }
    Ok(raw.trim().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use test_case::test_case;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.cache_enabled);
        assert_eq!(config.cache_max_size, 1000);
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("CACHE_ENABLED", "false"),
            ("CACHE_MAX_SIZE", "50"),
            ("MAX_RETRIES", "5"),
            ("RETRY_BASE_DELAY_MS", "250"),
            ("REQUEST_TIMEOUT_MS", "1500"),
            ("NOAA_BASE_URL", "http://localhost:8080/"),
            ("WXGATE_USER_AGENT", "my-app (me@example.com)"),
        ]))
        .unwrap();

        assert!(!config.cache_enabled);
        assert_eq!(config.cache_config().max_entries, 50);
        assert_eq!(
            config.retry_policy(),
            RetryPolicy::new(5, Duration::from_millis(250))
        );
        assert_eq!(config.noaa_config().timeout, Duration::from_millis(1500));
        assert_eq!(config.noaa_config().base_url, "http://localhost:8080");
        assert_eq!(
            config.open_meteo_config().user_agent,
            "my-app (me@example.com)"
        );
    }

    #[test_case("1", true ; "one")]
    #[test_case("0", false ; "zero")]
    #[test_case("TRUE", true ; "upper")]
    #[test_case("no", false ; "no")]
    fn test_cache_enabled_values(raw: &str, expected: bool) {
        let config = Config::from_lookup(lookup(&[("CACHE_ENABLED", raw)])).unwrap();
        assert_eq!(config.cache_enabled, expected);
    }

    #[test_case("CACHE_ENABLED", "maybe" ; "bad bool")]
    #[test_case("CACHE_MAX_SIZE", "0" ; "zero capacity")]
    #[test_case("CACHE_MAX_SIZE", "-5" ; "negative capacity")]
    #[test_case("MAX_RETRIES", "three" ; "non numeric retries")]
    #[test_case("REQUEST_TIMEOUT_MS", "0" ; "zero timeout")]
    #[test_case("OPEN_METEO_BASE_URL", "not a url" ; "bad url")]
    #[test_case("NOAA_BASE_URL", "ftp://example.com" ; "bad scheme")]
    fn test_rejected_values_name_the_variable(name: &str, raw: &str) {
        let err = Config::from_lookup(lookup(&[(name, raw)])).unwrap_err();
        let ConfigError::InvalidValue { name: reported, .. } = err;
        assert_eq!(reported, name);
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let config = Config::from_lookup(lookup(&[("MAX_RETRIES", "  ")])).unwrap();
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }
}
