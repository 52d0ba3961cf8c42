//! Multi-tier caching for shared application state
//!
//! Every store implements one uniform [`CacheBackend`] contract:
//!
//! - [`MemoryCache`]: bounded in-process store with per-entry TTL and LRU
//!   eviction
//! - [`FileCache`]: durable directory-backed store, one file per key
//! - [`MultiLevelCache`]: cascade of backends with automatic write-back to
//!   faster tiers and per-tier fault isolation
//!
//! A [`CacheManager`] routes operations to named backends and tracks
//! aggregate hit/miss statistics, and [`Memoized`] caches computation results
//! on top of it.
//!
//! # Examples
//!
//! ```
//! use strata_cache::{CacheManager, FileCache, MemoryCache, MultiLevelCache, Ttl};
//! use serde_json::json;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> strata_cache::CacheResult<()> {
//! let fast = MemoryCache::new(10_000).with_default_ttl(Duration::from_secs(60));
//! let durable = FileCache::new("/var/cache/app").await?;
//! let tiers = MultiLevelCache::new(vec![Arc::new(fast), Arc::new(durable)]);
//!
//! let manager = CacheManager::new(Arc::new(tiers));
//! manager.set("user:42", json!({"name": "alice"}), Ttl::Default, None).await?;
//! # Ok(())
//! # }
//! ```

mod backend;
mod entry;
mod error;
mod file;
mod key;
mod manager;
mod memoize;
mod memory;
mod multi_level;

pub use backend::CacheBackend;
pub use entry::Ttl;
pub use error::{CacheError, CacheResult};
pub use file::{FileCache, Serializer};
pub use key::{CacheKeyBuilder, computation_key};
pub use manager::{CacheManager, CacheStats};
pub use memoize::Memoized;
pub use memory::{MemoryCache, MemoryCacheStats};
pub use multi_level::MultiLevelCache;
