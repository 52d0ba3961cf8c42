//! File-backed cache with durable entries

use crate::backend::CacheBackend;
use crate::entry::Ttl;
use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

const ENTRY_EXTENSION: &str = "cache";

/// On-disk wire format for cache entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Serializer {
	/// Compact binary envelope (MessagePack). Accepts any JSON-shaped value.
	#[default]
	MessagePack,
	/// Plain JSON envelope, readable by other tooling.
	Json,
}

impl Serializer {
	fn encode(self, entry: &StoredEntry) -> CacheResult<Vec<u8>> {
		match self {
			Serializer::MessagePack => {
				rmp_serde::to_vec_named(entry).map_err(CacheError::serialization)
			}
			Serializer::Json => serde_json::to_vec(entry).map_err(CacheError::serialization),
		}
	}

	fn decode(self, bytes: &[u8]) -> CacheResult<StoredEntry> {
		match self {
			Serializer::MessagePack => {
				rmp_serde::from_slice(bytes).map_err(CacheError::serialization)
			}
			Serializer::Json => serde_json::from_slice(bytes).map_err(CacheError::serialization),
		}
	}
}

/// Envelope written to each entry file.
///
/// The logical key is stored alongside the value because file names only
/// carry its hash; `keys()` recovers logical keys from the envelopes.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
	key: String,
	value: Value,
	created_at: SystemTime,
	expires_at: Option<SystemTime>,
}

impl StoredEntry {
	fn is_expired(&self) -> bool {
		match self.expires_at {
			Some(expires_at) => SystemTime::now() > expires_at,
			None => false,
		}
	}
}

/// Persistent cache backend storing one file per key
///
/// Each entry lives at `{cache_dir}/{md5(key)}.cache`. Writes go to a
/// temporary file first and are published with a rename, so a concurrent
/// reader never observes a half-written entry. A second instance pointed at
/// the same directory sees everything a prior instance wrote.
///
/// # Examples
///
/// ```
/// use strata_cache::{CacheBackend, FileCache, Serializer, Ttl};
/// use serde_json::json;
///
/// # async fn example() -> strata_cache::CacheResult<()> {
/// let cache = FileCache::new("/tmp/app-cache").await?.with_serializer(Serializer::Json);
///
/// cache.set("report:42", json!({"rows": 10}), Ttl::Default).await?;
/// assert_eq!(cache.get("report:42").await?, Some(json!({"rows": 10})));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct FileCache {
	cache_dir: PathBuf,
	default_ttl: Option<Duration>,
	serializer: Serializer,
	lock: Arc<Mutex<()>>,
}

impl FileCache {
	/// Open a cache rooted at `cache_dir`, creating the directory if needed.
	pub async fn new(cache_dir: impl Into<PathBuf>) -> CacheResult<Self> {
		let cache_dir = cache_dir.into();
		fs::create_dir_all(&cache_dir).await?;
		Ok(Self {
			cache_dir,
			default_ttl: None,
			serializer: Serializer::default(),
			lock: Arc::new(Mutex::new(())),
		})
	}

	/// Set a default TTL applied to entries written with [`Ttl::Default`].
	pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
		self.default_ttl = Some(ttl);
		self
	}

	/// Choose the on-disk wire format.
	pub fn with_serializer(mut self, serializer: Serializer) -> Self {
		self.serializer = serializer;
		self
	}

	/// Delete every entry file whose deadline has passed, along with any
	/// file that no longer decodes.
	pub async fn cleanup_expired(&self) -> CacheResult<()> {
		let _guard = self.lock.lock().await;
		let mut dir = fs::read_dir(&self.cache_dir).await?;
		while let Some(dirent) = dir.next_entry().await? {
			let path = dirent.path();
			if !is_entry_file(&path) {
				continue;
			}
			let Ok(bytes) = fs::read(&path).await else {
				continue;
			};
			match self.serializer.decode(&bytes) {
				Ok(entry) if entry.is_expired() => {
					let _ = fs::remove_file(&path).await;
				}
				Ok(_) => {}
				Err(_) => {
					tracing::warn!(path = %path.display(), "pruning undecodable cache file");
					let _ = fs::remove_file(&path).await;
				}
			}
		}
		Ok(())
	}

	fn entry_path(&self, key: &str) -> PathBuf {
		let digest = Md5::digest(key.as_bytes());
		self.cache_dir
			.join(format!("{}.{ENTRY_EXTENSION}", hex::encode(digest)))
	}
}

fn is_entry_file(path: &Path) -> bool {
	path.extension().and_then(|ext| ext.to_str()) == Some(ENTRY_EXTENSION)
}

#[async_trait]
impl CacheBackend for FileCache {
	async fn get(&self, key: &str) -> CacheResult<Option<Value>> {
		let _guard = self.lock.lock().await;
		let path = self.entry_path(key);

		let bytes = match fs::read(&path).await {
			Ok(bytes) => bytes,
			Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
			Err(err) => return Err(err.into()),
		};

		let entry = match self.serializer.decode(&bytes) {
			Ok(entry) => entry,
			Err(err) => {
				// Remove the corrupt file so a retry of this get reports absent.
				let _ = fs::remove_file(&path).await;
				tracing::warn!(key, path = %path.display(), "removed undecodable cache file");
				return Err(err);
			}
		};

		if entry.is_expired() {
			let _ = fs::remove_file(&path).await;
			return Ok(None);
		}
		Ok(Some(entry.value))
	}

	async fn set(&self, key: &str, value: Value, ttl: Ttl) -> CacheResult<()> {
		let _guard = self.lock.lock().await;
		let entry = StoredEntry {
			key: key.to_string(),
			value,
			created_at: SystemTime::now(),
			expires_at: ttl.resolve(self.default_ttl),
		};
		let bytes = self.serializer.encode(&entry)?;

		// Write-then-rename so concurrent readers never see a partial file.
		let tmp = self.cache_dir.join(format!(".{}.tmp", Uuid::new_v4()));
		fs::write(&tmp, &bytes).await?;
		fs::rename(&tmp, self.entry_path(key)).await?;
		Ok(())
	}

	async fn delete(&self, key: &str) -> CacheResult<bool> {
		let _guard = self.lock.lock().await;
		match fs::remove_file(self.entry_path(key)).await {
			Ok(()) => Ok(true),
			Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
			Err(err) => Err(err.into()),
		}
	}

	async fn exists(&self, key: &str) -> CacheResult<bool> {
		let _guard = self.lock.lock().await;
		let path = self.entry_path(key);

		let bytes = match fs::read(&path).await {
			Ok(bytes) => bytes,
			Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
			Err(err) => return Err(err.into()),
		};

		match self.serializer.decode(&bytes) {
			Ok(entry) if entry.is_expired() => {
				let _ = fs::remove_file(&path).await;
				Ok(false)
			}
			Ok(_) => Ok(true),
			Err(_) => {
				tracing::warn!(key, path = %path.display(), "pruning undecodable cache file");
				let _ = fs::remove_file(&path).await;
				Ok(false)
			}
		}
	}

	async fn clear(&self) -> CacheResult<()> {
		let _guard = self.lock.lock().await;
		let mut dir = fs::read_dir(&self.cache_dir).await?;
		while let Some(dirent) = dir.next_entry().await? {
			let path = dirent.path();
			if is_entry_file(&path) {
				let _ = fs::remove_file(&path).await;
			}
		}
		Ok(())
	}

	async fn keys(&self) -> CacheResult<Vec<String>> {
		let _guard = self.lock.lock().await;
		let mut keys = Vec::new();
		let mut dir = fs::read_dir(&self.cache_dir).await?;
		while let Some(dirent) = dir.next_entry().await? {
			let path = dirent.path();
			if !is_entry_file(&path) {
				continue;
			}
			let Ok(bytes) = fs::read(&path).await else {
				continue;
			};
			match self.serializer.decode(&bytes) {
				Ok(entry) if entry.is_expired() => {
					let _ = fs::remove_file(&path).await;
				}
				Ok(entry) => keys.push(entry.key),
				Err(_) => {
					tracing::warn!(path = %path.display(), "pruning undecodable cache file");
					let _ = fs::remove_file(&path).await;
				}
			}
		}
		Ok(keys)
	}
}
