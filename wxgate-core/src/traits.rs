//! Common traits for wxgate.
//!
//! The [`Transport`] trait is the seam between a provider facade and the
//! network, so facades can be exercised against scripted transports in tests.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ProviderId, Query};

/// One raw upstream call, with no caching and no retries.
///
/// Implementations must translate every failure into a typed
/// [`crate::WeatherError`]: non-2xx statuses through
/// [`crate::WeatherError::from_status`] and transport failures through
/// [`crate::WeatherError::from_transport_error`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Provider this transport talks to.
    fn provider(&self) -> ProviderId;

    /// Whether this provider offers `query` at all.
    ///
    /// Facades consult this before touching the cache or the network.
    fn supports(&self, query: &Query) -> bool {
        let _ = query;
        true
    }

    /// Performs one attempt of `query`.
    async fn send(&self, query: &Query) -> Result<serde_json::Value>;

    /// Performs the cheapest request that proves the provider is reachable.
    async fn probe(&self) -> Result<()>;
}
