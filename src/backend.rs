//! Uniform cache backend contract

use crate::entry::Ttl;
use crate::error::CacheResult;
use async_trait::async_trait;
use serde_json::Value;

/// Capability contract every cache backend satisfies
///
/// Values are JSON-shaped ([`serde_json::Value`]), which keeps the trait
/// object-safe so composite caches and the manager can hold heterogeneous
/// backends behind `Arc<dyn CacheBackend>`. Typed access lives one layer up
/// (see [`CacheManager::get_as`](crate::CacheManager::get_as)).
///
/// A miss is `Ok(None)` / `Ok(false)`, never an error. All operations are
/// safe under concurrent invocation on the same backend instance.
///
/// # Examples
///
/// ```
/// use strata_cache::{CacheBackend, MemoryCache, Ttl};
/// use serde_json::json;
///
/// # async fn example() -> strata_cache::CacheResult<()> {
/// let cache = MemoryCache::new(1000);
///
/// cache.set("user:1", json!({"name": "alice"}), Ttl::Default).await?;
/// assert_eq!(cache.get("user:1").await?, Some(json!({"name": "alice"})));
/// assert!(cache.delete("user:1").await?);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait CacheBackend: Send + Sync {
	/// Return the live (non-expired) value for `key`, or `None`.
	async fn get(&self, key: &str) -> CacheResult<Option<Value>>;

	/// Store `value` under `key`, overwriting any existing entry.
	async fn set(&self, key: &str, value: Value, ttl: Ttl) -> CacheResult<()>;

	/// Remove the entry for `key`. Returns whether an entry existed.
	async fn delete(&self, key: &str) -> CacheResult<bool>;

	/// Whether a live entry for `key` is present. Purges the entry if it is
	/// found expired.
	async fn exists(&self, key: &str) -> CacheResult<bool>;

	/// Remove all entries unconditionally.
	async fn clear(&self) -> CacheResult<()>;

	/// All currently-live keys. Expired entries encountered during the scan
	/// are purged.
	async fn keys(&self) -> CacheResult<Vec<String>>;
}
