//! Configuration for the asset cache
//!
//! The cache consumes this struct; loading it from TOML/JSON is left to the
//! application's settings layer, which is why it derives `Deserialize`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Extensions whose content is gzip pre-compressed at generation time.
/// The empty string stands for files without an extension.
pub const DEFAULT_COMPRESSIBLE_EXTENSIONS: &[&str] = &[
	"", ".txt", ".htm", ".html", ".css", ".toml", ".php", ".js", ".json", ".md", ".mdown", ".xml",
	".svg", ".go", ".cgi", ".py", ".pl", ".aspx", ".asp",
];

/// Extensions never pushed from an HTML document's references
pub const DEFAULT_PUSH_SKIP_EXTENSIONS: &[&str] = &["", ".png", ".webp", ".txt"];

/// Configuration for [`AssetCache`](crate::AssetCache)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetCacheConfig {
	/// Directory cache keys are resolved against
	pub root: PathBuf,

	/// File served for directory paths and for `/`
	pub index: String,

	/// `Cache-Control` directive attached to every asset
	pub cache_control: String,

	/// Idle time after which an asset is evicted
	pub expire: Duration,

	/// Period between expiry sweeps
	pub sweep_interval: Duration,

	/// Invalidate assets on filesystem change notifications
	pub watch: bool,

	/// Extensions (with leading dot) that get a gzip representation
	pub compressible_extensions: Vec<String>,

	/// Extensions (with leading dot) excluded from server push
	pub push_skip_extensions: Vec<String>,

	/// Verbose logging of cache misses and watcher events
	pub dev_mode: bool,
}

impl AssetCacheConfig {
	/// Creates a configuration rooted at `root` with default settings
	///
	/// # Example
	///
	/// ```rust
	/// use reinhardt_assets::AssetCacheConfig;
	/// use std::time::Duration;
	///
	/// let config = AssetCacheConfig::new("public")
	///     .with_expire(Duration::from_secs(60))
	///     .with_watch(true);
	/// assert_eq!(config.index, "index.html");
	/// assert!(config.is_compressible(".CSS"));
	/// assert!(config.skips_push(".png"));
	/// ```
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self {
			root: root.into(),
			..Self::default()
		}
	}

	pub fn with_index(mut self, index: impl Into<String>) -> Self {
		self.index = index.into();
		self
	}

	pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
		self.cache_control = cache_control.into();
		self
	}

	pub fn with_expire(mut self, expire: Duration) -> Self {
		self.expire = expire;
		self
	}

	pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
		self.sweep_interval = interval;
		self
	}

	pub fn with_watch(mut self, watch: bool) -> Self {
		self.watch = watch;
		self
	}

	/// Replaces the compressible extension list
	pub fn with_compressible_extensions<I, S>(mut self, extensions: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.compressible_extensions = extensions.into_iter().map(Into::into).collect();
		self
	}

	/// Replaces the push deny-list
	pub fn with_push_skip_extensions<I, S>(mut self, extensions: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.push_skip_extensions = extensions.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_dev_mode(mut self, dev_mode: bool) -> Self {
		self.dev_mode = dev_mode;
		self
	}

	/// Case-insensitive membership of `ext` in the compressible list
	pub fn is_compressible(&self, ext: &str) -> bool {
		contains_ci(&self.compressible_extensions, ext)
	}

	/// Case-insensitive membership of `ext` in the push deny-list
	pub fn skips_push(&self, ext: &str) -> bool {
		contains_ci(&self.push_skip_extensions, ext)
	}
}

impl Default for AssetCacheConfig {
	fn default() -> Self {
		Self {
			root: PathBuf::from("static"),
			index: "index.html".to_string(),
			cache_control: "private, must-revalidate".to_string(),
			expire: Duration::from_secs(5 * 60),
			sweep_interval: Duration::from_secs(30),
			watch: false,
			compressible_extensions: DEFAULT_COMPRESSIBLE_EXTENSIONS
				.iter()
				.map(|s| s.to_string())
				.collect(),
			push_skip_extensions: DEFAULT_PUSH_SKIP_EXTENSIONS
				.iter()
				.map(|s| s.to_string())
				.collect(),
			dev_mode: false,
		}
	}
}

pub(crate) fn contains_ci(list: &[String], ext: &str) -> bool {
	list.iter().any(|item| item.eq_ignore_ascii_case(ext))
}
