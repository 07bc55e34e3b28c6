//! # wxgate Core
//!
//! Core types, errors, and policies shared by every wxgate crate.
//!
//! - **Types**: providers, data categories, and the semantic [`Query`] model
//! - **Errors**: the closed [`WeatherError`] taxonomy with retryability
//! - **TTL**: the per-category freshness policy, including the historical rule
//! - **Traits**: the [`Transport`] seam between facades and upstream providers
//!
//! ## Example
//!
//! ```rust
//! use wxgate_core::{Coordinates, ProviderId, Query};
//!
//! let coords = Coordinates::new(47.6062, -122.3321);
//! let query = Query::Forecast { coords, days: 7 };
//! assert_eq!(
//!     query.cache_key(ProviderId::OpenMeteo),
//!     "open-meteo:forecast:lat=47.61|lon=-122.33|days=7"
//! );
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod ttl;
pub mod types;

pub use error::{
    is_retryable, ConfigError, ErrorKind, ErrorReport, HelpReference, Result, TransportFailure,
    WeatherError,
};
pub use traits::Transport;
pub use ttl::{Ttl, TtlPolicy};
pub use types::*;
