//! The cached representation of one static file

use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Which form of an asset's content is being served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
	Plain,
	Gzip,
}

impl Representation {
	/// `Content-Encoding` value for this representation
	pub fn encoding(self) -> Option<&'static str> {
		match self {
			Representation::Plain => None,
			Representation::Gzip => Some("gzip"),
		}
	}
}

/// An immutable in-memory snapshot of a static file
///
/// Everything except the last-served timestamp is fixed at generation time.
/// A changed file is picked up by replacing the asset, never by mutating it,
/// so readers holding an `Arc<Asset>` always see a consistent snapshot.
#[derive(Debug)]
pub struct Asset {
	pub(crate) path: PathBuf,
	pub(crate) file: PathBuf,
	pub(crate) ext: String,
	pub(crate) content_type: String,
	pub(crate) content: Bytes,
	pub(crate) compressed: Option<Bytes>,
	pub(crate) etag: String,
	pub(crate) etag_compressed: Option<String>,
	pub(crate) mod_time: SystemTime,
	pub(crate) loaded_at: AtomicU64,
	pub(crate) cache_control: String,
	pub(crate) push_list: Vec<String>,
}

impl Asset {
	/// Normalized cache key
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// File the content was read from
	///
	/// Differs from [`path`](Self::path) when a directory index or the
	/// extensionless fallback resolved the key.
	pub fn file(&self) -> &Path {
		&self.file
	}

	/// Extension of the backing file including the leading dot, or `""`
	pub fn ext(&self) -> &str {
		&self.ext
	}

	pub fn content_type(&self) -> &str {
		&self.content_type
	}

	pub fn content(&self) -> &Bytes {
		&self.content
	}

	pub fn compressed_content(&self) -> Option<&Bytes> {
		self.compressed.as_ref()
	}

	pub fn is_compressed(&self) -> bool {
		self.compressed.is_some()
	}

	/// Strong validator of the uncompressed content
	pub fn etag(&self) -> &str {
		&self.etag
	}

	/// Strong validator of the gzip content
	pub fn etag_compressed(&self) -> Option<&str> {
		self.etag_compressed.as_deref()
	}

	pub fn mod_time(&self) -> SystemTime {
		self.mod_time
	}

	pub fn cache_control(&self) -> &str {
		&self.cache_control
	}

	/// Absolute paths to push alongside this asset (HTML only)
	pub fn push_list(&self) -> &[String] {
		&self.push_list
	}

	/// Content, validator and encoding of the requested representation
	///
	/// Falls back to the plain form when no gzip form exists.
	pub fn representation(&self, rep: Representation) -> (&Bytes, &str, Option<&'static str>) {
		match (rep, &self.compressed, &self.etag_compressed) {
			(Representation::Gzip, Some(content), Some(etag)) => {
				(content, etag.as_str(), Representation::Gzip.encoding())
			}
			_ => (&self.content, self.etag.as_str(), None),
		}
	}

	/// Unix milliseconds of the last generation or serve
	pub fn loaded_at(&self) -> u64 {
		self.loaded_at.load(Ordering::Relaxed)
	}

	/// Marks the asset as used now
	pub fn touch(&self) {
		self.loaded_at.store(now_millis(), Ordering::Relaxed);
	}

	/// Whether more than `expire` has passed between the last use and `now_ms`
	pub fn is_expired(&self, expire: Duration, now_ms: u64) -> bool {
		let expire_ms = u64::try_from(expire.as_millis()).unwrap_or(u64::MAX);
		now_ms.saturating_sub(self.loaded_at()) > expire_ms
	}
}

/// Current wall-clock time in Unix milliseconds
pub(crate) fn now_millis() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
		.unwrap_or(0)
}

/// Extension with its leading dot, `""` when there is none
pub(crate) fn extension_of(path: &Path) -> String {
	path.extension()
		.map(|ext| format!(".{}", ext.to_string_lossy()))
		.unwrap_or_default()
}
