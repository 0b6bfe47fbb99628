//! Cache key normalization

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// A cache key plus the path to try when the `.html` guess misses
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NormalizedPath {
	pub(crate) key: PathBuf,
	pub(crate) fallback: Option<PathBuf>,
}

/// Maps a request path or an absolute file path to its cache key
///
/// The path is cleaned lexically as if rooted at `root`, so `..` never
/// leaves it. Paths already under `root` are kept. A trailing slash or the
/// root itself maps to `index`; a last segment without an extension gets
/// `.html` appended and remembers the bare path as fallback.
pub(crate) fn normalize(root: &Path, index: &str, raw: &Path) -> NormalizedPath {
	let trailing_slash = raw.as_os_str().is_empty()
		|| raw.as_os_str().as_encoded_bytes().last() == Some(&b'/');
	let relative = raw.strip_prefix(root).unwrap_or(raw);

	let mut segments: Vec<&std::ffi::OsStr> = Vec::new();
	for component in relative.components() {
		match component {
			Component::Normal(segment) => segments.push(segment),
			Component::ParentDir => {
				segments.pop();
			}
			Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
		}
	}

	let mut joined = root.to_path_buf();
	joined.extend(&segments);

	if trailing_slash || segments.is_empty() {
		joined.push(index);
		return NormalizedPath {
			key: joined,
			fallback: None,
		};
	}

	if joined.extension().is_none() {
		let mut key: OsString = joined.clone().into_os_string();
		key.push(".html");
		return NormalizedPath {
			key: PathBuf::from(key),
			fallback: Some(joined),
		};
	}

	NormalizedPath {
		key: joined,
		fallback: None,
	}
}
