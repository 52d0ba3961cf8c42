//! Cascading multi-level cache

use crate::backend::CacheBackend;
use crate::entry::Ttl;
use crate::error::CacheResult;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Composite backend cascading over an ordered list of tiers
///
/// Tier 0 is the fastest and is consulted first; later tiers are assumed
/// slower but more durable. A read that hits a lower tier writes the value
/// back to every faster tier, so a cold fast tier (say, after a restart)
/// self-heals from the tier below it.
///
/// A failing tier is skipped for that call and logged; it never fails the
/// composite operation. The composite therefore reports `Err` on none of its
/// operations.
///
/// # Examples
///
/// ```
/// use strata_cache::{CacheBackend, FileCache, MemoryCache, MultiLevelCache, Ttl};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// # async fn example() -> strata_cache::CacheResult<()> {
/// let fast = MemoryCache::new(1000);
/// let slow = FileCache::new("/tmp/app-cache").await?;
/// let cache = MultiLevelCache::new(vec![Arc::new(fast), Arc::new(slow)]);
///
/// // Fans out to both tiers
/// cache.set("user:1", json!("alice"), Ttl::Default).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MultiLevelCache {
	tiers: Vec<Arc<dyn CacheBackend>>,
}

impl MultiLevelCache {
	/// Compose `tiers` into one logical cache, fastest first.
	///
	/// # Panics
	///
	/// Panics if `tiers` is empty.
	pub fn new(tiers: Vec<Arc<dyn CacheBackend>>) -> Self {
		assert!(!tiers.is_empty(), "MultiLevelCache requires at least one tier");
		Self { tiers }
	}

	/// Number of tiers in the cascade.
	pub fn depth(&self) -> usize {
		self.tiers.len()
	}
}

#[async_trait]
impl CacheBackend for MultiLevelCache {
	async fn get(&self, key: &str) -> CacheResult<Option<Value>> {
		for (index, tier) in self.tiers.iter().enumerate() {
			let value = match tier.get(key).await {
				Ok(value) => value,
				Err(error) => {
					tracing::warn!(key, tier = index, %error, "cache tier unavailable, trying next");
					continue;
				}
			};
			let Some(value) = value else { continue };

			// Best-effort write-back into every faster tier.
			for (faster, upper) in self.tiers[..index].iter().enumerate() {
				if let Err(error) = upper.set(key, value.clone(), Ttl::Default).await {
					tracing::warn!(key, tier = faster, %error, "write-back to faster tier failed");
				}
			}
			return Ok(Some(value));
		}
		Ok(None)
	}

	async fn set(&self, key: &str, value: Value, ttl: Ttl) -> CacheResult<()> {
		for (index, tier) in self.tiers.iter().enumerate() {
			if let Err(error) = tier.set(key, value.clone(), ttl).await {
				tracing::warn!(key, tier = index, %error, "cache tier rejected write");
			}
		}
		Ok(())
	}

	async fn delete(&self, key: &str) -> CacheResult<bool> {
		let mut deleted = false;
		for (index, tier) in self.tiers.iter().enumerate() {
			match tier.delete(key).await {
				Ok(tier_deleted) => deleted = deleted || tier_deleted,
				Err(error) => {
					tracing::warn!(key, tier = index, %error, "cache tier rejected delete");
				}
			}
		}
		Ok(deleted)
	}

	async fn exists(&self, key: &str) -> CacheResult<bool> {
		Ok(self.get(key).await?.is_some())
	}

	async fn clear(&self) -> CacheResult<()> {
		for (index, tier) in self.tiers.iter().enumerate() {
			if let Err(error) = tier.clear().await {
				tracing::warn!(tier = index, %error, "cache tier rejected clear");
			}
		}
		Ok(())
	}

	async fn keys(&self) -> CacheResult<Vec<String>> {
		let mut all = HashSet::new();
		for (index, tier) in self.tiers.iter().enumerate() {
			match tier.keys().await {
				Ok(keys) => all.extend(keys),
				Err(error) => {
					tracing::warn!(tier = index, %error, "cache tier could not list keys");
				}
			}
		}
		Ok(all.into_iter().collect())
	}
}
