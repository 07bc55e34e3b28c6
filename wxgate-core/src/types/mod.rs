//! Domain types for wxgate.

mod category;
mod provider;
mod query;

pub use category::DataCategory;
pub use provider::ProviderId;
pub use query::{Coordinates, Query};
