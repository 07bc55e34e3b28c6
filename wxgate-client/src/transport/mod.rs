//! HTTP transports for the supported providers.
//!
//! A transport performs exactly one upstream attempt per call and returns
//! typed errors; caching and retries live in [`crate::ProviderFacade`].

mod http;
mod noaa;
mod open_meteo;

pub use noaa::{NoaaConfig, NoaaTransport};
pub use open_meteo::{OpenMeteoConfig, OpenMeteoTransport};
