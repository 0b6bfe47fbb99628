//! Concurrent storage behind the asset cache

use crate::asset::Asset;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Concurrent map from normalized cache key to asset
///
/// Implementations must be safe to read from request handlers while the
/// sweeper and the watcher mutate them, without an external lock.
pub trait AssetStore: Send + Sync {
	fn get(&self, key: &Path) -> Option<Arc<Asset>>;

	/// Inserts `asset`, returning the asset previously stored under `key`
	fn insert(&self, key: PathBuf, asset: Arc<Asset>) -> Option<Arc<Asset>>;

	fn remove(&self, key: &Path) -> Option<Arc<Asset>>;

	/// Keeps only the entries for which `keep` returns `true`
	fn retain(&self, keep: &mut dyn FnMut(&Path, &Arc<Asset>) -> bool);

	fn keys(&self) -> Vec<PathBuf>;

	fn len(&self) -> usize;

	fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn clear(&self);
}

/// [`AssetStore`] over a sharded `DashMap`
#[derive(Debug, Default)]
pub struct ShardedStore {
	entries: DashMap<PathBuf, Arc<Asset>>,
}

impl ShardedStore {
	pub fn new() -> Self {
		Self::default()
	}
}

impl AssetStore for ShardedStore {
	fn get(&self, key: &Path) -> Option<Arc<Asset>> {
		self.entries.get(key).map(|entry| Arc::clone(entry.value()))
	}

	fn insert(&self, key: PathBuf, asset: Arc<Asset>) -> Option<Arc<Asset>> {
		self.entries.insert(key, asset)
	}

	fn remove(&self, key: &Path) -> Option<Arc<Asset>> {
		self.entries.remove(key).map(|(_, asset)| asset)
	}

	fn retain(&self, keep: &mut dyn FnMut(&Path, &Arc<Asset>) -> bool) {
		self.entries.retain(|key, asset| keep(key, asset));
	}

	fn keys(&self) -> Vec<PathBuf> {
		self.entries.iter().map(|entry| entry.key().clone()).collect()
	}

	fn len(&self) -> usize {
		self.entries.len()
	}

	fn clear(&self) {
		self.entries.clear();
	}
}
