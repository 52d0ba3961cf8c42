//! In-memory cache with TTL and LRU eviction

use crate::backend::CacheBackend;
use crate::entry::{CacheEntry, Ttl};
use crate::error::CacheResult;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Snapshot of a memory cache's occupancy
#[derive(Debug, Clone)]
pub struct MemoryCacheStats {
	/// Current number of entries
	pub size: usize,
	/// Configured capacity
	pub max_size: usize,
	/// Keys currently stored (including entries not yet observed as expired)
	pub keys: Vec<String>,
}

/// Entry map plus the access bookkeeping that drives LRU eviction.
///
/// `last_access` is driven by a monotone logical clock rather than wall-clock
/// timestamps, so two entries can never tie: eviction order is exactly access
/// order (insertion order for keys never read back).
struct MemoryStore {
	entries: HashMap<String, CacheEntry>,
	last_access: HashMap<String, u64>,
	clock: u64,
}

impl MemoryStore {
	fn touch(&mut self, key: &str) {
		self.clock += 1;
		self.last_access.insert(key.to_string(), self.clock);
	}

	fn remove(&mut self, key: &str) -> bool {
		self.last_access.remove(key);
		self.entries.remove(key).is_some()
	}

	fn evict_lru(&mut self) {
		let lru = self
			.last_access
			.iter()
			.min_by_key(|(_, stamp)| **stamp)
			.map(|(key, _)| key.clone());
		if let Some(key) = lru {
			self.remove(&key);
		}
	}

	fn purge_expired(&mut self) {
		let expired: Vec<String> = self
			.entries
			.iter()
			.filter(|(_, entry)| entry.is_expired())
			.map(|(key, _)| key.clone())
			.collect();
		for key in expired {
			self.remove(&key);
		}
	}
}

/// Bounded in-process cache backend
///
/// Entries carry an optional expiration instant and are lazily purged by the
/// access that observes them expired. When a `set` would grow the cache past
/// its capacity, the least-recently-accessed entry is evicted first.
///
/// # Examples
///
/// ```
/// use strata_cache::{CacheBackend, MemoryCache, Ttl};
/// use serde_json::json;
/// use std::time::Duration;
///
/// # async fn example() -> strata_cache::CacheResult<()> {
/// let cache = MemoryCache::new(1000).with_default_ttl(Duration::from_secs(300));
///
/// // Uses the 300s default
/// cache.set("session", json!("abc"), Ttl::Default).await?;
/// // Pinned: never expires
/// cache.set("motd", json!("hello"), Ttl::Never).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MemoryCache {
	store: Arc<RwLock<MemoryStore>>,
	max_size: usize,
	default_ttl: Option<Duration>,
}

impl MemoryCache {
	/// Create a cache holding at most `max_size` entries.
	///
	/// # Panics
	///
	/// Panics if `max_size` is zero.
	pub fn new(max_size: usize) -> Self {
		assert!(max_size > 0, "MemoryCache requires max_size > 0");
		Self {
			store: Arc::new(RwLock::new(MemoryStore {
				entries: HashMap::new(),
				last_access: HashMap::new(),
				clock: 0,
			})),
			max_size,
			default_ttl: None,
		}
	}

	/// Set a default TTL applied to entries written with [`Ttl::Default`].
	pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
		self.default_ttl = Some(ttl);
		self
	}

	/// Remove every entry whose deadline has passed.
	pub async fn cleanup_expired(&self) {
		let mut store = self.store.write().await;
		store.purge_expired();
	}

	/// Occupancy snapshot for inspection.
	pub async fn stats(&self) -> MemoryCacheStats {
		let store = self.store.read().await;
		MemoryCacheStats {
			size: store.entries.len(),
			max_size: self.max_size,
			keys: store.entries.keys().cloned().collect(),
		}
	}
}

#[async_trait]
impl CacheBackend for MemoryCache {
	async fn get(&self, key: &str) -> CacheResult<Option<Value>> {
		let mut store = self.store.write().await;

		match store.entries.get(key).map(CacheEntry::is_expired) {
			None => Ok(None),
			Some(true) => {
				store.remove(key);
				Ok(None)
			}
			Some(false) => {
				let value = store.entries.get(key).map(|entry| entry.value.clone());
				store.touch(key);
				Ok(value)
			}
		}
	}

	async fn set(&self, key: &str, value: Value, ttl: Ttl) -> CacheResult<()> {
		let mut store = self.store.write().await;

		// Make room before inserting a new key at capacity.
		if store.entries.len() >= self.max_size && !store.entries.contains_key(key) {
			store.evict_lru();
		}

		let entry = CacheEntry::new(value, ttl.resolve(self.default_ttl));
		store.entries.insert(key.to_string(), entry);
		store.touch(key);
		Ok(())
	}

	async fn delete(&self, key: &str) -> CacheResult<bool> {
		let mut store = self.store.write().await;
		Ok(store.remove(key))
	}

	async fn exists(&self, key: &str) -> CacheResult<bool> {
		let mut store = self.store.write().await;

		match store.entries.get(key).map(CacheEntry::is_expired) {
			None => Ok(false),
			Some(true) => {
				store.remove(key);
				Ok(false)
			}
			Some(false) => Ok(true),
		}
	}

	async fn clear(&self) -> CacheResult<()> {
		let mut store = self.store.write().await;
		store.entries.clear();
		store.last_access.clear();
		Ok(())
	}

	async fn keys(&self) -> CacheResult<Vec<String>> {
		let mut store = self.store.write().await;
		store.purge_expired();
		Ok(store.entries.keys().cloned().collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[tokio::test]
	async fn test_basic_operations() {
		let cache = MemoryCache::new(10);

		cache.set("key1", json!("value1"), Ttl::Default).await.unwrap();
		assert_eq!(cache.get("key1").await.unwrap(), Some(json!("value1")));

		assert!(cache.exists("key1").await.unwrap());
		assert!(!cache.exists("missing").await.unwrap());

		assert!(cache.delete("key1").await.unwrap());
		assert_eq!(cache.get("key1").await.unwrap(), None);
	}

	#[tokio::test]
	async fn test_delete_is_idempotent() {
		let cache = MemoryCache::new(10);

		cache.set("key1", json!(1), Ttl::Default).await.unwrap();
		assert!(cache.delete("key1").await.unwrap());
		assert!(!cache.delete("key1").await.unwrap());
		assert!(!cache.delete("never_set").await.unwrap());
	}

	#[tokio::test]
	async fn test_ttl_expiration() {
		let cache = MemoryCache::new(10);

		cache
			.set("key1", json!("value1"), Ttl::After(Duration::from_millis(50)))
			.await
			.unwrap();
		assert_eq!(cache.get("key1").await.unwrap(), Some(json!("value1")));

		tokio::time::sleep(Duration::from_millis(80)).await;
		assert_eq!(cache.get("key1").await.unwrap(), None);
	}

	#[tokio::test]
	async fn test_default_ttl_applies() {
		let cache = MemoryCache::new(10).with_default_ttl(Duration::from_millis(50));

		cache.set("key1", json!("value1"), Ttl::Default).await.unwrap();
		tokio::time::sleep(Duration::from_millis(80)).await;
		assert_eq!(cache.get("key1").await.unwrap(), None);
	}

	#[tokio::test]
	async fn test_never_overrides_default_ttl() {
		let cache = MemoryCache::new(10).with_default_ttl(Duration::from_millis(50));

		cache.set("pinned", json!("stays"), Ttl::Never).await.unwrap();
		tokio::time::sleep(Duration::from_millis(80)).await;
		assert_eq!(cache.get("pinned").await.unwrap(), Some(json!("stays")));
	}

	#[tokio::test]
	async fn test_lru_eviction_respects_access_order() {
		let cache = MemoryCache::new(3);

		cache.set("a", json!(1), Ttl::Default).await.unwrap();
		cache.set("b", json!(2), Ttl::Default).await.unwrap();
		cache.set("c", json!(3), Ttl::Default).await.unwrap();

		// Refresh `a`, making `b` the least recently used.
		assert_eq!(cache.get("a").await.unwrap(), Some(json!(1)));

		cache.set("d", json!(4), Ttl::Default).await.unwrap();

		assert_eq!(cache.get("b").await.unwrap(), None);
		assert_eq!(cache.get("a").await.unwrap(), Some(json!(1)));
		assert_eq!(cache.get("c").await.unwrap(), Some(json!(3)));
		assert_eq!(cache.get("d").await.unwrap(), Some(json!(4)));
	}

	#[tokio::test]
	async fn test_overwrite_at_capacity_does_not_evict() {
		let cache = MemoryCache::new(2);

		cache.set("a", json!(1), Ttl::Default).await.unwrap();
		cache.set("b", json!(2), Ttl::Default).await.unwrap();
		cache.set("a", json!(10), Ttl::Default).await.unwrap();

		assert_eq!(cache.get("a").await.unwrap(), Some(json!(10)));
		assert_eq!(cache.get("b").await.unwrap(), Some(json!(2)));
	}

	#[tokio::test]
	async fn test_keys_purges_expired() {
		let cache = MemoryCache::new(10);

		cache
			.set("gone", json!(1), Ttl::After(Duration::from_millis(20)))
			.await
			.unwrap();
		cache.set("kept", json!(2), Ttl::Never).await.unwrap();

		tokio::time::sleep(Duration::from_millis(50)).await;

		let keys = cache.keys().await.unwrap();
		assert_eq!(keys, vec!["kept".to_string()]);

		// The purge removed the expired entry outright.
		assert_eq!(cache.stats().await.size, 1);
	}

	#[tokio::test]
	async fn test_clear() {
		let cache = MemoryCache::new(10);

		cache.set("key1", json!(1), Ttl::Default).await.unwrap();
		cache.set("key2", json!(2), Ttl::Default).await.unwrap();
		cache.clear().await.unwrap();

		assert!(cache.keys().await.unwrap().is_empty());
		assert_eq!(cache.stats().await.size, 0);
	}

	#[tokio::test]
	async fn test_stats_snapshot() {
		let cache = MemoryCache::new(5);

		cache.set("key1", json!(1), Ttl::Default).await.unwrap();
		let stats = cache.stats().await;

		assert_eq!(stats.size, 1);
		assert_eq!(stats.max_size, 5);
		assert_eq!(stats.keys, vec!["key1".to_string()]);
	}

	#[test]
	#[should_panic(expected = "max_size > 0")]
	fn test_zero_capacity_is_rejected() {
		let _ = MemoryCache::new(0);
	}
}
