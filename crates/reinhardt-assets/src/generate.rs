//! Asset generation pipeline
//!
//! Pure helpers turning file bytes into validators and a gzip form, plus
//! [`Asset::generate`] which runs the whole pipeline for one file.

use crate::asset::{Asset, extension_of, now_millis};
use crate::config::AssetCacheConfig;
use crate::error::{AssetError, Result};
use crate::push::extract_push_targets;
use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicU64;
use std::time::UNIX_EPOCH;
use tracing::trace;

/// Directory index hops followed before giving up
const MAX_INDEX_DEPTH: usize = 8;

/// Quoted lowercase hex SHA-256 of `content`, usable as a strong ETag
///
/// # Example
///
/// ```rust
/// use reinhardt_assets::content_etag;
///
/// let etag = content_etag(b"hello");
/// assert!(etag.starts_with('"') && etag.ends_with('"'));
/// assert_eq!(etag.len(), 66);
/// assert_eq!(etag, content_etag(b"hello"));
/// ```
pub fn content_etag(content: &[u8]) -> String {
	format!("\"{}\"", hex::encode(Sha256::digest(content)))
}

/// Gzip `content` at the maximum compression level
pub fn gzip(content: &[u8]) -> io::Result<Vec<u8>> {
	let buffer = Vec::with_capacity(content.len() / 2 + 32);
	let mut encoder = GzEncoder::new(buffer, Compression::best());
	encoder.write_all(content)?;
	encoder.finish()
}

/// MIME type for a file name, with `charset=utf-8` on textual types
///
/// Unknown extensions map to `application/octet-stream`.
pub fn content_type_for(path: &Path) -> String {
	use mime_guess::mime;

	match mime_guess::from_path(path).first() {
		Some(m) if m.type_() == mime::TEXT || m.subtype() == mime::JAVASCRIPT => {
			if m.get_param(mime::CHARSET).is_some() {
				m.to_string()
			} else {
				format!("{}; charset=utf-8", m.essence_str())
			}
		}
		Some(m) => m.to_string(),
		None => mime::APPLICATION_OCTET_STREAM.to_string(),
	}
}

impl Asset {
	/// Reads `file` and builds the asset stored under `key`
	///
	/// Blocking: callers on an async runtime should go through
	/// [`AssetCache`](crate::AssetCache), which runs this on the blocking pool.
	pub fn generate(key: PathBuf, file: PathBuf, config: &AssetCacheConfig) -> Result<Asset> {
		let metadata = fs::metadata(&file).map_err(|e| AssetError::from_io(&file, e))?;
		if !metadata.is_file() {
			return Err(AssetError::NotFound(file));
		}
		let mod_time = metadata.modified().unwrap_or(UNIX_EPOCH);
		let content = fs::read(&file).map_err(|e| AssetError::from_io(&file, e))?;

		let ext = extension_of(&file);
		let content_type = content_type_for(&file);

		let (compressed, etag_compressed) = if config.is_compressible(&ext) {
			let packed = gzip(&content).map_err(|e| AssetError::from_io(&file, e))?;
			let etag = content_etag(&packed);
			(Some(Bytes::from(packed)), Some(etag))
		} else {
			(None, None)
		};

		let etag = content_etag(&content);

		let push_list = if ext.eq_ignore_ascii_case(".html") {
			std::str::from_utf8(&content)
				.map(|html| extract_push_targets(html, &config.push_skip_extensions))
				.unwrap_or_default()
		} else {
			Vec::new()
		};

		Ok(Asset {
			path: key,
			file,
			ext,
			content_type,
			content: Bytes::from(content),
			compressed,
			etag,
			etag_compressed,
			mod_time,
			loaded_at: AtomicU64::new(now_millis()),
			cache_control: config.cache_control.clone(),
			push_list,
		})
	}
}

/// Finds the regular file backing a normalized key
///
/// Directories resolve to their `index` member. When `key` does not exist
/// and a `fallback` is given, the fallback is resolved the same way.
pub(crate) fn resolve_file(key: &Path, fallback: Option<&Path>, index: &str) -> Result<PathBuf> {
	match (resolve_index(key, index), fallback) {
		(Err(AssetError::NotFound(_)), Some(fallback)) => {
			resolve_index(fallback, index).map_err(|err| match err {
				AssetError::NotFound(_) => AssetError::NotFound(key.to_path_buf()),
				other => other,
			})
		}
		(result, _) => result,
	}
}

/// Any stat failure on a request-derived path means it does not resolve:
/// a segment below a regular file, an embedded NUL or an overlong name are
/// as missing as an absent file.
fn resolve_index(path: &Path, index: &str) -> Result<PathBuf> {
	let mut current = path.to_path_buf();
	for _ in 0..MAX_INDEX_DEPTH {
		let metadata = match fs::metadata(&current) {
			Ok(metadata) => metadata,
			Err(err) => {
				trace!(path = %current.display(), error = %err, "asset path does not resolve");
				return Err(AssetError::NotFound(current));
			}
		};
		if metadata.is_dir() {
			current.push(index);
			continue;
		}
		if metadata.is_file() {
			return Ok(current);
		}
		return Err(AssetError::NotFound(current));
	}
	Err(AssetError::NotFound(path.to_path_buf()))
}
