//! Bounded cache for wxgate upstream responses.
//!
//! Generic in-memory cache with a hard entry limit (LRU eviction), per-entry
//! expiration, and hit/miss statistics.

mod cache;

pub use cache::{BoundedCache, CacheConfig, CacheStats};
pub use wxgate_core::Ttl;
