//! Caching infrastructure.
//!
//! - **LRU Cache**: generic LRU used for table handles
//! - **Table Cache**: caches open table-reader handles and exposes the
//!   open/evict surface the version builder and cleaner consume

mod lru;
mod table_cache;

pub use lru::{CacheStats, LruCache};
pub use table_cache::{TableCache, TableHandle, TableOpener, TableReader};

#[cfg(test)]
pub(crate) use table_cache::testing;
