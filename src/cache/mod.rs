//! Durable, tenant-scoped cache for resource collections
//!
//! Entries are JSON files stored under one directory per tenant, each carrying
//! the time it was stored and its own TTL. Freshness is checked lazily on read;
//! nothing sweeps expired entries. Expired entries stay readable through
//! [`CacheStore::read`] so callers can fall back to the last known value.

mod clock;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{CacheStore, CachedData, CACHE_NAMESPACE};
