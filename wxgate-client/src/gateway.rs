//! Both provider facades behind one shared cache.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use wxgate_cache::{BoundedCache, CacheStats};
use wxgate_core::error::Result;
use wxgate_core::{ProviderId, Query};

use crate::config::Config;
use crate::facade::{Fetched, ProviderFacade, ProviderStatus};
use crate::transport::{NoaaTransport, OpenMeteoTransport};

/// Process-wide entry point owning one facade per provider.
///
/// The cache is created once here and shared by both facades; keys carry the
/// provider name, so entries never collide.
pub struct WeatherGateway {
    noaa: ProviderFacade<NoaaTransport>,
    open_meteo: ProviderFacade<OpenMeteoTransport>,
    cache: Option<Arc<BoundedCache<Value>>>,
}

impl WeatherGateway {
    /// Builds transports, the shared cache and both facades from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = config
            .cache_enabled
            .then(|| Arc::new(BoundedCache::with_config(config.cache_config())));

        let noaa = ProviderFacade::new(
            NoaaTransport::new(config.noaa_config())?,
            config.retry_policy(),
            cache.clone(),
        );
        let open_meteo = ProviderFacade::new(
            OpenMeteoTransport::new(config.open_meteo_config())?,
            config.retry_policy(),
            cache.clone(),
        );

        info!(
            cache_enabled = config.cache_enabled,
            cache_max_size = config.cache_max_size,
            max_retries = config.max_retries,
            "Weather gateway ready"
        );

        Ok(Self {
            noaa,
            open_meteo,
            cache,
        })
    }

    /// The NOAA facade.
    pub fn noaa(&self) -> &ProviderFacade<NoaaTransport> {
        &self.noaa
    }

    /// The Open-Meteo facade.
    pub fn open_meteo(&self) -> &ProviderFacade<OpenMeteoTransport> {
        &self.open_meteo
    }

    /// Fetches `query` from `provider`.
    pub async fn fetch(&self, provider: ProviderId, query: &Query) -> Result<Fetched> {
        match provider {
            ProviderId::Noaa => self.noaa.fetch_detailed(query).await,
            ProviderId::OpenMeteo => self.open_meteo.fetch_detailed(query).await,
        }
    }

    /// Probes `provider` once.
    pub async fn status(&self, provider: ProviderId) -> ProviderStatus {
        match provider {
            ProviderId::Noaa => self.noaa.status().await,
            ProviderId::OpenMeteo => self.open_meteo.status().await,
        }
    }

    /// Statistics of the shared cache, or `None` when caching is disabled.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| cache.stats())
    }
}
