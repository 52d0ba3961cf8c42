//! Memoized computations on top of the cache manager

use crate::entry::Ttl;
use crate::key::computation_key;
use crate::manager::CacheManager;
use crate::memory::MemoryCache;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Cache the result of a computation under a key derived from its arguments
///
/// The cache is an optimization here, never a correctness dependency: a
/// failing lookup or store is logged and the computation simply runs, so
/// callers get correct results even with the cache tier entirely down.
///
/// # Examples
///
/// ```
/// use strata_cache::{CacheManager, Memoized, Ttl};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() {
/// let manager = Arc::new(CacheManager::default());
/// let quotes = Memoized::new(manager, "pricing::quote")
///     .with_ttl(Ttl::After(Duration::from_secs(60)));
///
/// // Runs the closure on the first call, serves the cached result after.
/// let quote = quotes
///     .get_or_compute(&("eu", 2), || async { 1299u32 })
///     .await;
/// assert_eq!(quote, 1299);
/// # }
/// ```
pub struct Memoized {
	manager: Arc<CacheManager>,
	namespace: String,
	ttl: Ttl,
	backend: Option<String>,
	key_fn: Option<Box<dyn Fn(&Value) -> String + Send + Sync>>,
}

impl Memoized {
	/// Memoize under `namespace` (the computation's identity) through
	/// `manager`'s default backend.
	pub fn new(manager: Arc<CacheManager>, namespace: impl Into<String>) -> Self {
		Self {
			manager,
			namespace: namespace.into(),
			ttl: Ttl::Default,
			backend: None,
			key_fn: None,
		}
	}

	/// Self-contained memoizer over a private in-memory cache bounded to
	/// `max_size` results.
	pub fn local(namespace: impl Into<String>, max_size: usize) -> Self {
		let manager = CacheManager::new(Arc::new(MemoryCache::new(max_size)));
		Self::new(Arc::new(manager), namespace)
	}

	/// Expire memoized results with `ttl`.
	pub fn with_ttl(mut self, ttl: Ttl) -> Self {
		self.ttl = ttl;
		self
	}

	/// Route storage through the named backend instead of the default.
	pub fn on_backend(mut self, name: impl Into<String>) -> Self {
		self.backend = Some(name.into());
		self
	}

	/// Derive keys with `key_fn` (applied to the serialized arguments)
	/// instead of the default hash.
	pub fn with_key_fn(
		mut self,
		key_fn: impl Fn(&Value) -> String + Send + Sync + 'static,
	) -> Self {
		self.key_fn = Some(Box::new(key_fn));
		self
	}

	/// Return the cached result for `args`, or run `compute` and store its
	/// result.
	pub async fn get_or_compute<A, T, F, Fut>(&self, args: &A, compute: F) -> T
	where
		A: Serialize + ?Sized,
		T: Serialize + DeserializeOwned,
		F: FnOnce() -> Fut,
		Fut: Future<Output = T>,
	{
		let key = match self.derive_key(args) {
			Ok(key) => key,
			Err(error) => {
				tracing::debug!(namespace = %self.namespace, %error, "key derivation failed, bypassing cache");
				return compute().await;
			}
		};

		match self.manager.get(&key, self.backend.as_deref()).await {
			Ok(Some(value)) => match serde_json::from_value(value) {
				Ok(cached) => return cached,
				Err(error) => {
					tracing::debug!(%key, %error, "cached result did not decode, recomputing");
				}
			},
			Ok(None) => {}
			Err(error) => {
				tracing::debug!(%key, %error, "cache lookup failed, computing directly");
			}
		}

		let result = compute().await;

		match serde_json::to_value(&result) {
			Ok(value) => {
				if let Err(error) = self
					.manager
					.set(&key, value, self.ttl, self.backend.as_deref())
					.await
				{
					tracing::debug!(%key, %error, "failed to store computed result");
				}
			}
			Err(error) => {
				tracing::debug!(%key, %error, "computed result is not cacheable");
			}
		}
		result
	}

	fn derive_key<A>(&self, args: &A) -> crate::error::CacheResult<String>
	where
		A: Serialize + ?Sized,
	{
		match &self.key_fn {
			Some(key_fn) => {
				let value = serde_json::to_value(args)
					.map_err(crate::error::CacheError::serialization)?;
				Ok(key_fn(&value))
			}
			None => computation_key(&self.namespace, args),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::backend::CacheBackend;
	use crate::error::{CacheError, CacheResult};
	use async_trait::async_trait;
	use serde_json::json;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::time::Duration;

	/// Backend that fails every operation.
	struct DownBackend;

	#[async_trait]
	impl CacheBackend for DownBackend {
		async fn get(&self, _key: &str) -> CacheResult<Option<Value>> {
			Err(CacheError::Io(std::io::Error::other("cache down")))
		}

		async fn set(&self, _key: &str, _value: Value, _ttl: Ttl) -> CacheResult<()> {
			Err(CacheError::Io(std::io::Error::other("cache down")))
		}

		async fn delete(&self, _key: &str) -> CacheResult<bool> {
			Err(CacheError::Io(std::io::Error::other("cache down")))
		}

		async fn exists(&self, _key: &str) -> CacheResult<bool> {
			Err(CacheError::Io(std::io::Error::other("cache down")))
		}

		async fn clear(&self) -> CacheResult<()> {
			Err(CacheError::Io(std::io::Error::other("cache down")))
		}

		async fn keys(&self) -> CacheResult<Vec<String>> {
			Err(CacheError::Io(std::io::Error::other("cache down")))
		}
	}

	#[tokio::test]
	async fn test_computes_once_then_serves_cached() {
		let memo = Memoized::local("double", 16);
		let calls = AtomicUsize::new(0);

		for _ in 0..3 {
			let result: u32 = memo
				.get_or_compute(&21u32, || async {
					calls.fetch_add(1, Ordering::SeqCst);
					42u32
				})
				.await;
			assert_eq!(result, 42);
		}
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn test_distinct_arguments_compute_separately() {
		let memo = Memoized::local("square", 16);

		let four: u32 = memo.get_or_compute(&2u32, || async { 4u32 }).await;
		let nine: u32 = memo.get_or_compute(&3u32, || async { 9u32 }).await;
		assert_eq!((four, nine), (4, 9));
	}

	#[tokio::test]
	async fn test_named_argument_order_hits_same_entry() {
		let memo = Memoized::local("lookup", 16);
		let calls = AtomicUsize::new(0);

		let first: String = memo
			.get_or_compute(&json!({"a": 1, "b": 2}), || async {
				calls.fetch_add(1, Ordering::SeqCst);
				"computed".to_string()
			})
			.await;
		let second: String = memo
			.get_or_compute(&json!({"b": 2, "a": 1}), || async {
				calls.fetch_add(1, Ordering::SeqCst);
				"computed".to_string()
			})
			.await;

		assert_eq!(first, second);
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn test_ttl_expiry_recomputes() {
		let memo =
			Memoized::local("volatile", 16).with_ttl(Ttl::After(Duration::from_millis(40)));
		let calls = AtomicUsize::new(0);

		let _: u32 = memo
			.get_or_compute(&1u32, || async {
				calls.fetch_add(1, Ordering::SeqCst);
				1u32
			})
			.await;
		tokio::time::sleep(Duration::from_millis(70)).await;
		let _: u32 = memo
			.get_or_compute(&1u32, || async {
				calls.fetch_add(1, Ordering::SeqCst);
				1u32
			})
			.await;

		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn test_custom_key_function() {
		let manager = Arc::new(CacheManager::default());
		let memo = Memoized::new(Arc::clone(&manager), "custom")
			.with_key_fn(|_args| "fixed-key".to_string());

		let _: u32 = memo.get_or_compute(&1u32, || async { 10u32 }).await;
		// Different arguments, same derived key: served from cache.
		let cached: u32 = memo.get_or_compute(&2u32, || async { 20u32 }).await;
		assert_eq!(cached, 10);

		assert_eq!(
			manager.get("fixed-key", None).await.unwrap(),
			Some(json!(10))
		);
	}

	#[tokio::test]
	async fn test_cache_failure_never_reaches_caller() {
		let manager = Arc::new(CacheManager::new(Arc::new(DownBackend)));
		let memo = Memoized::new(manager, "resilient");
		let calls = AtomicUsize::new(0);

		for _ in 0..2 {
			let result: u32 = memo
				.get_or_compute(&7u32, || async {
					calls.fetch_add(1, Ordering::SeqCst);
					49u32
				})
				.await;
			assert_eq!(result, 49);
		}
		// Nothing could be stored, so both calls computed.
		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn test_routes_to_named_backend() {
		let manager = Arc::new(CacheManager::default());
		manager.register_backend("results", Arc::new(MemoryCache::new(16)));
		let memo = Memoized::new(Arc::clone(&manager), "routed").on_backend("results");

		let _: u32 = memo.get_or_compute(&5u32, || async { 25u32 }).await;

		let keys = manager.backend(Some("results")).unwrap().keys().await.unwrap();
		assert_eq!(keys.len(), 1);
	}
}
