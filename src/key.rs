//! Cache key construction helpers

use crate::error::{CacheError, CacheResult};
use md5::{Digest, Md5};
use serde::Serialize;

/// Namespaced, versioned key prefixing
///
/// Bumping the version invalidates every key built by the builder without
/// touching the stored entries.
///
/// # Examples
///
/// ```
/// use strata_cache::CacheKeyBuilder;
///
/// let builder = CacheKeyBuilder::new("myapp").with_version(2);
/// assert_eq!(builder.build("user:123"), "myapp:2:user:123");
/// ```
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
	namespace: String,
	version: u32,
}

impl CacheKeyBuilder {
	/// Create a builder for `namespace`, version 1.
	pub fn new(namespace: impl Into<String>) -> Self {
		Self {
			namespace: namespace.into(),
			version: 1,
		}
	}

	/// Use `version` in every built key.
	pub fn with_version(mut self, version: u32) -> Self {
		self.version = version;
		self
	}

	/// Prefix a single key.
	pub fn build(&self, key: &str) -> String {
		format!("{}:{}:{}", self.namespace, self.version, key)
	}

	/// Prefix a batch of keys.
	pub fn build_many(&self, keys: &[&str]) -> Vec<String> {
		keys.iter().map(|key| self.build(key)).collect()
	}
}

/// Derive a deterministic cache key from a computation's identity and its
/// arguments.
///
/// The arguments are serialized to canonical JSON (object keys come out
/// sorted, so named arguments hash identically regardless of the order they
/// were supplied in) and digested together with `namespace`.
///
/// # Examples
///
/// ```
/// use strata_cache::computation_key;
/// use serde_json::json;
///
/// let a = computation_key("pricing::quote", &json!({"region": "eu", "tier": 2})).unwrap();
/// let b = computation_key("pricing::quote", &json!({"tier": 2, "region": "eu"})).unwrap();
/// assert_eq!(a, b);
/// ```
pub fn computation_key<A>(namespace: &str, args: &A) -> CacheResult<String>
where
	A: Serialize + ?Sized,
{
	let canonical = serde_json::to_value(args)
		.and_then(|value| serde_json::to_string(&value))
		.map_err(CacheError::serialization)?;

	let mut hasher = Md5::new();
	hasher.update(namespace.as_bytes());
	hasher.update(b"|");
	hasher.update(canonical.as_bytes());
	Ok(hex::encode(hasher.finalize()))
}
