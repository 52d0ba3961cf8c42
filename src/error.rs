//! Cache error types

use thiserror::Error;

/// Result alias used throughout the crate
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors surfaced by cache backends and the manager
///
/// Cache misses are not errors; they are expressed as `Ok(None)` (or `false`)
/// return values. An `Err` always means something went wrong beyond the key
/// simply not being there.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CacheError {
	/// A named backend was requested that is not registered with the manager.
	#[error("cache backend `{name}` is not registered")]
	UnknownBackend { name: String },

	/// A cache entry could not be encoded or decoded.
	#[error("cache serialization failed: {reason}")]
	Serialization { reason: String },

	/// Filesystem failure in a persistent backend.
	#[error("cache I/O failure: {0}")]
	Io(#[from] std::io::Error),

	/// A routed manager operation failed; the original cause is preserved.
	#[error("cache {operation} failed: {source}")]
	Operation {
		operation: &'static str,
		#[source]
		source: Box<CacheError>,
	},
}

impl CacheError {
	pub(crate) fn serialization(err: impl std::fmt::Display) -> Self {
		CacheError::Serialization {
			reason: err.to_string(),
		}
	}

	pub(crate) fn operation(operation: &'static str, source: CacheError) -> Self {
		CacheError::Operation {
			operation,
			source: Box::new(source),
		}
	}
}
