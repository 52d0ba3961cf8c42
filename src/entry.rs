//! Internal cache entry structure and TTL policy

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, SystemTime};

/// Expiration policy for a single `set` call
///
/// Distinguishes "no TTL given" from "explicitly no expiry", which a plain
/// `Option<Duration>` cannot express.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ttl {
	/// Use the backend's configured default TTL (no expiry if it has none).
	#[default]
	Default,
	/// Never expire, regardless of the backend default.
	Never,
	/// Expire this long after the write.
	After(Duration),
}

impl Ttl {
	/// Resolve the policy against a backend's default TTL into an absolute
	/// expiration instant.
	pub fn resolve(self, default_ttl: Option<Duration>) -> Option<SystemTime> {
		match self {
			Ttl::Default => default_ttl.map(|ttl| SystemTime::now() + ttl),
			Ttl::Never => None,
			Ttl::After(ttl) => Some(SystemTime::now() + ttl),
		}
	}
}

/// Cache entry with expiration metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CacheEntry {
	pub(crate) value: Value,
	pub(crate) created_at: SystemTime,
	pub(crate) expires_at: Option<SystemTime>,
}

impl CacheEntry {
	pub(crate) fn new(value: Value, expires_at: Option<SystemTime>) -> Self {
		Self {
			value,
			created_at: SystemTime::now(),
			expires_at,
		}
	}

	pub(crate) fn is_expired(&self) -> bool {
		match self.expires_at {
			Some(expires_at) => SystemTime::now() > expires_at,
			None => false,
		}
	}
}
