//! The asset cache
//!
//! [`AssetCache`] maps normalized paths under a root directory to generated
//! [`Asset`]s. Entries are produced lazily on first request (or by
//! [`AssetCache::warm`]) and dropped by the expiry sweeper, by filesystem
//! notifications when watching is enabled, or explicitly.
//!
//! ## Background tasks
//!
//! - **Sweeper**: every `sweep_interval`, evicts assets idle for longer than
//!   `expire`.
//! - **Watcher**: when `watch` is set, regenerates assets whose file was
//!   written and drops assets whose file was removed.
//!
//! Both tasks hold only a weak reference to the cache and are aborted by
//! [`AssetCache::close`] or when the last handle is dropped.

mod path;
mod store;

pub use store::{AssetStore, ShardedStore};

use crate::asset::{Asset, now_millis};
use crate::config::AssetCacheConfig;
use crate::error::{AssetError, Result};
use crate::generate::resolve_file;
use crate::watcher::{AssetWatcher, WatchEvent};
use dashmap::DashMap;
use parking_lot::Mutex;
use path::{NormalizedPath, normalize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

type Gate = Arc<tokio::sync::Mutex<()>>;

/// Where generation finds the file for a key
enum Source {
	/// Resolve the key on disk, trying `fallback` when it is missing
	Lookup(Option<PathBuf>),
	/// Read this file directly
	File(PathBuf),
}

/// Concurrent cache of static assets under one root directory
///
/// Cloning is cheap and yields a handle to the same cache.
///
/// # Example
///
/// ```rust,no_run
/// use reinhardt_assets::{AssetCache, AssetCacheConfig};
///
/// # async fn example() -> reinhardt_assets::Result<()> {
/// let cache = AssetCache::new(AssetCacheConfig::new("./static").with_watch(true))?;
///
/// let asset = cache.get("/css/site.css").await?;
/// println!("{} ({} bytes)", asset.etag(), asset.content().len());
///
/// cache.close();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AssetCache {
	inner: Arc<CacheInner>,
}

struct CacheInner {
	config: Arc<AssetCacheConfig>,
	root: PathBuf,
	store: Arc<dyn AssetStore>,
	inflight: DashMap<PathBuf, Gate>,
	watcher: Mutex<Option<AssetWatcher>>,
	sweeper: Mutex<Option<AbortHandle>>,
	watch_task: Mutex<Option<AbortHandle>>,
	closed: AtomicBool,
	runtime: Handle,
}

impl AssetCache {
	/// Creates a cache backed by a [`ShardedStore`]
	///
	/// Must be called from within a Tokio runtime. Fails with
	/// [`AssetError::InvalidRoot`] when the root is not a readable directory.
	pub fn new(config: AssetCacheConfig) -> Result<Self> {
		Self::with_store(config, Arc::new(ShardedStore::new()))
	}

	/// Creates a cache over a caller-provided store
	pub fn with_store(config: AssetCacheConfig, store: Arc<dyn AssetStore>) -> Result<Self> {
		let runtime = Handle::try_current().map_err(|_| AssetError::NoRuntime)?;
		validate_config(&config)?;
		let root = validate_root(&config.root)?;

		let (watcher, events) = if config.watch {
			let (watcher, events) = AssetWatcher::new()?;
			(Some(watcher), Some(events))
		} else {
			(None, None)
		};

		let sweep_interval = config.sweep_interval;
		let inner = Arc::new(CacheInner {
			config: Arc::new(config),
			root,
			store,
			inflight: DashMap::new(),
			watcher: Mutex::new(watcher),
			sweeper: Mutex::new(None),
			watch_task: Mutex::new(None),
			closed: AtomicBool::new(false),
			runtime,
		});

		*inner.sweeper.lock() = Some(spawn_sweeper(&inner, sweep_interval));
		if let Some(events) = events {
			*inner.watch_task.lock() = Some(spawn_watch_task(&inner, events));
		}

		debug!(
			root = %inner.root.display(),
			watch = inner.config.watch,
			"asset cache started"
		);
		Ok(Self { inner })
	}

	/// Cache key for `path`
	///
	/// Request paths are joined onto the root, paths already under the root
	/// are kept. A trailing slash selects the index file and a last segment
	/// without extension gets `.html`.
	///
	/// # Example
	///
	/// ```rust,no_run
	/// # use reinhardt_assets::{AssetCache, AssetCacheConfig};
	/// # async fn example(cache: AssetCache) {
	/// let key = cache.normalize("/docs/");
	/// assert_eq!(key, cache.root().join("docs/index.html"));
	/// assert_eq!(cache.normalize("/about"), cache.root().join("about.html"));
	/// # }
	/// ```
	pub fn normalize(&self, path: impl AsRef<Path>) -> PathBuf {
		self.inner.normalize(path.as_ref()).key
	}

	/// Returns the cached asset for `path`, generating it on a miss
	///
	/// Concurrent misses for the same key share one generation.
	pub async fn get(&self, path: impl AsRef<Path>) -> Result<Arc<Asset>> {
		self.inner.ensure_open()?;
		let normalized = self.inner.normalize(path.as_ref());

		if let Some(asset) = self.inner.store.get(&normalized.key) {
			asset.touch();
			return Ok(asset);
		}

		let key = normalized.key.clone();
		let result = self.inner.get_or_generate(normalized).await;
		if let Err(err) = &result
			&& self.inner.config.dev_mode
		{
			info!(key = %key.display(), error = %err, "asset lookup failed");
		}
		result
	}

	/// Returns the cached asset for `path` without generating or touching it
	pub fn lookup(&self, path: impl AsRef<Path>) -> Option<Arc<Asset>> {
		let key = self.normalize(path);
		self.inner.store.get(&key)
	}

	/// Regenerates the asset for `path`, replacing any cached copy
	pub async fn generate(&self, path: impl AsRef<Path>) -> Result<Arc<Asset>> {
		self.inner.ensure_open()?;
		let normalized = self.inner.normalize(path.as_ref());
		self.inner
			.build(normalized.key, Source::Lookup(normalized.fallback))
			.await
	}

	/// Drops the asset for `path`; the file on disk is untouched
	pub fn delete(&self, path: impl AsRef<Path>) -> Option<Arc<Asset>> {
		let key = self.normalize(path);
		let removed = self.inner.store.remove(&key)?;
		self.inner.release_watch(removed.file());
		debug!(key = %key.display(), "asset deleted");
		Some(removed)
	}

	/// Deletes then gets `path`, forcing a fresh generation
	pub async fn invalidate(&self, path: impl AsRef<Path>) -> Result<Arc<Asset>> {
		let path = path.as_ref();
		self.delete(path);
		self.get(path).await
	}

	/// Generates every regular file under the root
	///
	/// Files that fail to generate are logged and skipped. Returns the number
	/// of assets now cached from the walk.
	pub async fn warm(&self) -> Result<usize> {
		self.inner.ensure_open()?;
		let root = self.inner.root.clone();
		let files = tokio::task::spawn_blocking(move || {
			walkdir::WalkDir::new(&root)
				.follow_links(true)
				.into_iter()
				.filter_map(|entry| match entry {
					Ok(entry) => Some(entry),
					Err(err) => {
						warn!(error = %err, "skipping unreadable path during warm-up");
						None
					}
				})
				.filter(|entry| entry.file_type().is_file())
				.map(walkdir::DirEntry::into_path)
				.collect::<Vec<_>>()
		})
		.await?;

		let mut generated = 0;
		for file in files {
			match self.get(&file).await {
				Ok(_) => generated += 1,
				Err(AssetError::Closed) => return Err(AssetError::Closed),
				Err(err) => warn!(file = %file.display(), error = %err, "warm-up failed"),
			}
		}
		debug!(count = generated, "asset cache warmed");
		Ok(generated)
	}

	/// Runs one expiry pass, returning the number of evicted assets
	pub fn sweep(&self) -> usize {
		self.inner.sweep()
	}

	/// Restarts the sweeper with a new period
	pub fn set_sweep_interval(&self, interval: Duration) -> Result<()> {
		if interval.is_zero() {
			return Err(AssetError::InvalidConfig(
				"sweep interval must be greater than zero".into(),
			));
		}
		self.inner.ensure_open()?;

		let handle = spawn_sweeper(&self.inner, interval);
		if let Some(previous) = self.inner.sweeper.lock().replace(handle) {
			previous.abort();
		}
		Ok(())
	}

	pub fn len(&self) -> usize {
		self.inner.store.len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.store.is_empty()
	}

	pub fn config(&self) -> &AssetCacheConfig {
		&self.inner.config
	}

	/// Canonical root directory
	pub fn root(&self) -> &Path {
		&self.inner.root
	}

	/// Whether `file` is currently registered with the filesystem watcher
	pub fn is_watching(&self, file: impl AsRef<Path>) -> bool {
		self.inner
			.watcher
			.lock()
			.as_ref()
			.is_some_and(|watcher| watcher.is_watching(file.as_ref()))
	}

	pub fn is_closed(&self) -> bool {
		self.inner.closed.load(Ordering::Acquire)
	}

	/// Stops the background tasks and drops every entry
	///
	/// Later calls are no-ops. Operations that need the cache afterwards
	/// fail with [`AssetError::Closed`].
	pub fn close(&self) {
		if self.inner.closed.swap(true, Ordering::AcqRel) {
			return;
		}
		self.inner.abort_tasks();
		self.inner.watcher.lock().take();
		self.inner.store.clear();
		self.inner.inflight.clear();
		debug!(root = %self.inner.root.display(), "asset cache closed");
	}
}

impl std::fmt::Debug for AssetCache {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AssetCache")
			.field("root", &self.inner.root)
			.field("entries", &self.inner.store.len())
			.field("closed", &self.is_closed())
			.finish()
	}
}

impl CacheInner {
	fn normalize(&self, raw: &Path) -> NormalizedPath {
		normalize(&self.root, &self.config.index, raw)
	}

	fn ensure_open(&self) -> Result<()> {
		if self.closed.load(Ordering::Acquire) {
			Err(AssetError::Closed)
		} else {
			Ok(())
		}
	}

	async fn get_or_generate(&self, normalized: NormalizedPath) -> Result<Arc<Asset>> {
		let key = normalized.key;
		let gate = InflightGuard::enter(&self.inflight, &key);
		let _turn = gate.gate.lock().await;

		if let Some(asset) = self.store.get(&key) {
			asset.touch();
			return Ok(asset);
		}
		self.build(key.clone(), Source::Lookup(normalized.fallback))
			.await
	}

	async fn build(&self, key: PathBuf, source: Source) -> Result<Arc<Asset>> {
		let config = Arc::clone(&self.config);
		let asset = tokio::task::spawn_blocking(move || {
			let file = match source {
				Source::Lookup(fallback) => resolve_file(&key, fallback.as_deref(), &config.index)?,
				Source::File(file) => file,
			};
			Asset::generate(key, file, &config)
		})
		.await??;

		self.ensure_open()?;
		let asset = Arc::new(asset);
		self.store
			.insert(asset.path().to_path_buf(), Arc::clone(&asset));
		// close() may have cleared the store between the check and the insert
		if self.closed.load(Ordering::Acquire) {
			self.store.remove(asset.path());
			return Err(AssetError::Closed);
		}
		self.watch_file(asset.file());

		debug!(
			key = %asset.path().display(),
			bytes = asset.content().len(),
			compressed = asset.is_compressed(),
			"asset generated"
		);
		Ok(asset)
	}

	fn sweep(&self) -> usize {
		let now = now_millis();
		let expire = self.config.expire;
		let mut evicted = Vec::new();

		self.store.retain(&mut |_, asset| {
			if asset.is_expired(expire, now) {
				evicted.push(Arc::clone(asset));
				false
			} else {
				true
			}
		});

		for asset in &evicted {
			self.release_watch(asset.file());
			debug!(key = %asset.path().display(), "expired asset evicted");
		}
		evicted.len()
	}

	async fn handle_watch_event(&self, event: WatchEvent) {
		match event {
			WatchEvent::Changed(file) => {
				let keys = self.evict_file(&file);
				if keys.is_empty() {
					return;
				}
				self.log_event("changed", &file);
				for key in keys {
					if let Err(err) = self.build(key.clone(), Source::File(file.clone())).await {
						if err.is_not_found() {
							self.unwatch_file(&file);
						}
						warn!(key = %key.display(), error = %err, "regeneration after change failed");
					}
				}
			}
			WatchEvent::Removed(file) => {
				let keys = self.evict_file(&file);
				self.unwatch_file(&file);
				if !keys.is_empty() {
					self.log_event("removed", &file);
				}
			}
			WatchEvent::Error(message) => {
				warn!(error = %message, "filesystem watcher error");
			}
		}
	}

	fn log_event(&self, kind: &str, file: &Path) {
		if self.config.dev_mode {
			info!(file = %file.display(), kind, "asset file event");
		} else {
			debug!(file = %file.display(), kind, "asset file event");
		}
	}

	/// Removes every entry backed by `file`, returning their keys
	fn evict_file(&self, file: &Path) -> Vec<PathBuf> {
		let mut keys = Vec::new();
		self.store.retain(&mut |key, asset| {
			if asset.file() == file {
				keys.push(key.to_path_buf());
				false
			} else {
				true
			}
		});
		keys
	}

	fn watch_file(&self, file: &Path) {
		if let Some(watcher) = self.watcher.lock().as_mut()
			&& let Err(err) = watcher.watch(file)
		{
			warn!(file = %file.display(), error = %err, "failed to watch asset file");
		}
	}

	fn unwatch_file(&self, file: &Path) {
		if let Some(watcher) = self.watcher.lock().as_mut()
			&& let Err(err) = watcher.unwatch(file)
		{
			debug!(file = %file.display(), error = %err, "failed to unwatch asset file");
		}
	}

	/// Unwatches `file` unless another entry is still backed by it
	fn release_watch(&self, file: &Path) {
		if self.watcher.lock().is_none() {
			return;
		}
		let shared = self
			.store
			.keys()
			.iter()
			.filter_map(|key| self.store.get(key))
			.any(|asset| asset.file() == file);
		if !shared {
			self.unwatch_file(file);
		}
	}

	fn abort_tasks(&self) {
		if let Some(handle) = self.sweeper.lock().take() {
			handle.abort();
		}
		if let Some(handle) = self.watch_task.lock().take() {
			handle.abort();
		}
	}
}

impl Drop for CacheInner {
	fn drop(&mut self) {
		self.abort_tasks();
	}
}

/// Membership in the in-flight gate of one key
///
/// The gate is removed from the map by the last holder, including when the
/// waiting future is dropped.
struct InflightGuard<'a> {
	inflight: &'a DashMap<PathBuf, Gate>,
	key: &'a Path,
	gate: Gate,
}

impl<'a> InflightGuard<'a> {
	fn enter(inflight: &'a DashMap<PathBuf, Gate>, key: &'a Path) -> Self {
		let gate = Arc::clone(&*inflight.entry(key.to_path_buf()).or_default());
		Self {
			inflight,
			key,
			gate,
		}
	}
}

impl Drop for InflightGuard<'_> {
	fn drop(&mut self) {
		// One count for the map, one for this guard
		self.inflight.remove_if(self.key, |_, current| {
			Arc::ptr_eq(current, &self.gate) && Arc::strong_count(current) <= 2
		});
	}
}

fn validate_config(config: &AssetCacheConfig) -> Result<()> {
	if config.sweep_interval.is_zero() {
		return Err(AssetError::InvalidConfig(
			"sweep interval must be greater than zero".into(),
		));
	}
	if config.index.is_empty() || config.index.contains(['/', '\\']) {
		return Err(AssetError::InvalidConfig(format!(
			"index must be a plain file name, got {:?}",
			config.index
		)));
	}
	Ok(())
}

fn validate_root(root: &Path) -> Result<PathBuf> {
	let invalid = |reason: String| AssetError::InvalidRoot {
		path: root.to_path_buf(),
		reason,
	};

	let canonical = fs::canonicalize(root).map_err(|e| invalid(e.to_string()))?;
	let metadata = fs::metadata(&canonical).map_err(|e| invalid(e.to_string()))?;
	if !metadata.is_dir() {
		return Err(invalid("not a directory".into()));
	}
	fs::read_dir(&canonical).map_err(|e| invalid(e.to_string()))?;
	Ok(canonical)
}

fn spawn_sweeper(inner: &Arc<CacheInner>, period: Duration) -> AbortHandle {
	let weak: Weak<CacheInner> = Arc::downgrade(inner);
	inner
		.runtime
		.spawn(async move {
			let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
			ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
			loop {
				ticker.tick().await;
				let Some(inner) = weak.upgrade() else {
					break;
				};
				let evicted = inner.sweep();
				if evicted > 0 {
					debug!(evicted, remaining = inner.store.len(), "expiry sweep");
				}
			}
		})
		.abort_handle()
}

fn spawn_watch_task(
	inner: &Arc<CacheInner>,
	mut events: mpsc::UnboundedReceiver<WatchEvent>,
) -> AbortHandle {
	let weak: Weak<CacheInner> = Arc::downgrade(inner);
	inner
		.runtime
		.spawn(async move {
			while let Some(event) = events.recv().await {
				let Some(inner) = weak.upgrade() else {
					break;
				};
				inner.handle_watch_event(event).await;
			}
		})
		.abort_handle()
}
