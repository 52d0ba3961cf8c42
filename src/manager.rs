//! Backend registry with routed operations and aggregate statistics

use crate::backend::CacheBackend;
use crate::entry::Ttl;
use crate::error::{CacheError, CacheResult};
use crate::memory::MemoryCache;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// Capacity of the zero-config default backend.
const DEFAULT_BACKEND_CAPACITY: usize = 1000;

/// Aggregate operation counters, process-lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
	pub hits: u64,
	pub misses: u64,
	pub sets: u64,
	pub deletes: u64,
}

/// Registry of named cache backends with a default
///
/// Routes keyed operations to a backend chosen by name (the default when no
/// name is given) and keeps hit/miss/set/delete counters across all routed
/// calls. Failures of routed operations are wrapped in
/// [`CacheError::Operation`] with the cause preserved; an unknown backend
/// name is a configuration error, distinct from a cache miss.
///
/// Construct one explicitly and share it (`Arc<CacheManager>`) with whatever
/// needs caching; `CacheManager::default()` gives a ready-to-use manager over
/// a bounded in-memory backend.
///
/// # Examples
///
/// ```
/// use strata_cache::{CacheManager, MemoryCache, Ttl};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// # async fn example() -> strata_cache::CacheResult<()> {
/// let manager = CacheManager::default();
/// manager.register_backend("sessions", Arc::new(MemoryCache::new(500)));
///
/// manager.set("greeting", json!("hello"), Ttl::Default, None).await?;
/// assert_eq!(manager.get("greeting", None).await?, Some(json!("hello")));
///
/// let stats = manager.stats();
/// assert_eq!((stats.sets, stats.hits), (1, 1));
/// # Ok(())
/// # }
/// ```
pub struct CacheManager {
	default_backend: Arc<dyn CacheBackend>,
	backends: RwLock<HashMap<String, Arc<dyn CacheBackend>>>,
	stats: Mutex<CacheStats>,
}

impl CacheManager {
	/// Create a manager routing unnamed operations to `default_backend`.
	pub fn new(default_backend: Arc<dyn CacheBackend>) -> Self {
		Self {
			default_backend,
			backends: RwLock::new(HashMap::new()),
			stats: Mutex::new(CacheStats::default()),
		}
	}

	/// Register `backend` under `name`, replacing any previous registration.
	pub fn register_backend(&self, name: impl Into<String>, backend: Arc<dyn CacheBackend>) {
		self.backends
			.write()
			.unwrap_or_else(|err| err.into_inner())
			.insert(name.into(), backend);
	}

	/// Resolve a backend by name, or the default when `name` is `None`.
	///
	/// # Errors
	///
	/// [`CacheError::UnknownBackend`] if `name` is not registered.
	pub fn backend(&self, name: Option<&str>) -> CacheResult<Arc<dyn CacheBackend>> {
		match name {
			None => Ok(Arc::clone(&self.default_backend)),
			Some(name) => self
				.backends
				.read()
				.unwrap_or_else(|err| err.into_inner())
				.get(name)
				.cloned()
				.ok_or_else(|| CacheError::UnknownBackend {
					name: name.to_string(),
				}),
		}
	}

	/// Fetch `key` from the selected backend, counting a hit or miss.
	///
	/// A resolution or backend failure counts as a miss before being
	/// re-raised wrapped in [`CacheError::Operation`].
	pub async fn get(&self, key: &str, backend: Option<&str>) -> CacheResult<Option<Value>> {
		let outcome = match self.backend(backend) {
			Ok(target) => target.get(key).await,
			Err(err) => Err(err),
		};
		match outcome {
			Ok(Some(value)) => {
				self.bump(|stats| stats.hits += 1);
				Ok(Some(value))
			}
			Ok(None) => {
				self.bump(|stats| stats.misses += 1);
				Ok(None)
			}
			Err(err) => {
				self.bump(|stats| stats.misses += 1);
				Err(CacheError::operation("get", err))
			}
		}
	}

	/// Store `value` under `key` in the selected backend.
	pub async fn set(
		&self,
		key: &str,
		value: Value,
		ttl: Ttl,
		backend: Option<&str>,
	) -> CacheResult<()> {
		let outcome = match self.backend(backend) {
			Ok(target) => target.set(key, value, ttl).await,
			Err(err) => Err(err),
		};
		match outcome {
			Ok(()) => {
				self.bump(|stats| stats.sets += 1);
				Ok(())
			}
			Err(err) => Err(CacheError::operation("set", err)),
		}
	}

	/// Remove `key` from the selected backend. Counts a delete only when an
	/// entry was actually removed.
	pub async fn delete(&self, key: &str, backend: Option<&str>) -> CacheResult<bool> {
		let outcome = match self.backend(backend) {
			Ok(target) => target.delete(key).await,
			Err(err) => Err(err),
		};
		match outcome {
			Ok(deleted) => {
				if deleted {
					self.bump(|stats| stats.deletes += 1);
				}
				Ok(deleted)
			}
			Err(err) => Err(CacheError::operation("delete", err)),
		}
	}

	/// Clear every entry of the selected backend.
	pub async fn clear(&self, backend: Option<&str>) -> CacheResult<()> {
		let outcome = match self.backend(backend) {
			Ok(target) => target.clear().await,
			Err(err) => Err(err),
		};
		outcome.map_err(|err| CacheError::operation("clear", err))
	}

	/// Typed fetch, deserializing the stored value into `T`.
	pub async fn get_as<T>(&self, key: &str, backend: Option<&str>) -> CacheResult<Option<T>>
	where
		T: DeserializeOwned,
	{
		match self.get(key, backend).await? {
			None => Ok(None),
			Some(value) => serde_json::from_value(value)
				.map(Some)
				.map_err(CacheError::serialization),
		}
	}

	/// Typed store, serializing `value` before routing it.
	pub async fn set_as<T>(
		&self,
		key: &str,
		value: &T,
		ttl: Ttl,
		backend: Option<&str>,
	) -> CacheResult<()>
	where
		T: Serialize + ?Sized,
	{
		let value = serde_json::to_value(value).map_err(CacheError::serialization)?;
		self.set(key, value, ttl, backend).await
	}

	/// Snapshot of the counters.
	pub fn stats(&self) -> CacheStats {
		self.stats
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.clone()
	}

	/// Zero all counters. Atomic with respect to concurrent increments.
	pub fn reset_stats(&self) {
		*self.stats.lock().unwrap_or_else(|err| err.into_inner()) = CacheStats::default();
	}

	fn bump(&self, update: impl FnOnce(&mut CacheStats)) {
		let mut stats = self.stats.lock().unwrap_or_else(|err| err.into_inner());
		update(&mut *stats);
	}
}

impl Default for CacheManager {
	fn default() -> Self {
		Self::new(Arc::new(MemoryCache::new(DEFAULT_BACKEND_CAPACITY)))
	}
}
