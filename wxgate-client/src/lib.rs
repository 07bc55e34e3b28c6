//! # wxgate Client
//!
//! Resilient access to NOAA and Open-Meteo.
//!
//! - **Transports**: one upstream attempt per call, typed errors only
//! - **Retry**: exponential backoff with jitter, retrying only transient failures
//! - **Facade**: validation, cache lookup, retried fetch and cache population
//! - **Gateway**: both facades sharing one bounded cache, built from [`Config`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use wxgate_client::{Config, WeatherGateway};
//! use wxgate_core::{Coordinates, ProviderId, Query};
//!
//! let gateway = WeatherGateway::from_config(&Config::from_env()?)?;
//! let query = Query::Forecast {
//!     coords: Coordinates::new(47.61, -122.33),
//!     days: 3,
//! };
//! let fetched = gateway.fetch(ProviderId::OpenMeteo, &query).await?;
//! println!("{}", fetched.value);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

mod config;
mod facade;
mod gateway;
pub mod retry;
pub mod transport;

pub use config::Config;
pub use facade::{Fetched, ProviderFacade, ProviderStatus};
pub use gateway::WeatherGateway;
pub use retry::{Retrier, RetryOutcome, RetryPolicy, RetryState};
pub use transport::{NoaaConfig, NoaaTransport, OpenMeteoConfig, OpenMeteoTransport};
