//! Filesystem change notifications for cached files
//!
//! Each backing file is registered individually. The notify callback runs on
//! the backend's own thread and only forwards classified events into a Tokio
//! channel; the cache drains that channel from a task it owns.

use crate::error::Result;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// A change observed on a watched file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
	/// Written or created; cached copies should be regenerated
	Changed(PathBuf),
	/// Removed or renamed away; cached copies should be dropped
	Removed(PathBuf),
	Error(String),
}

impl WatchEvent {
	/// Maps one notify callback result to zero or more events
	///
	/// Access events carry no content change and are dropped.
	///
	/// # Example
	///
	/// ```rust
	/// use notify::event::{CreateKind, Event, EventKind};
	/// use reinhardt_assets::WatchEvent;
	/// use std::path::PathBuf;
	///
	/// let event = Event::new(EventKind::Create(CreateKind::File)).add_path(PathBuf::from("/s/a.css"));
	/// assert_eq!(
	///     WatchEvent::classify(Ok(event)),
	///     vec![WatchEvent::Changed(PathBuf::from("/s/a.css"))],
	/// );
	/// ```
	pub fn classify(result: notify::Result<Event>) -> Vec<WatchEvent> {
		let event = match result {
			Ok(event) => event,
			Err(err) => return vec![WatchEvent::Error(err.to_string())],
		};

		let make: fn(PathBuf) -> WatchEvent = match event.kind {
			EventKind::Create(_) => WatchEvent::Changed,
			EventKind::Modify(ModifyKind::Name(RenameMode::To)) => WatchEvent::Changed,
			EventKind::Modify(ModifyKind::Name(_)) => WatchEvent::Removed,
			EventKind::Modify(_) => WatchEvent::Changed,
			EventKind::Remove(_) => WatchEvent::Removed,
			EventKind::Access(_) | EventKind::Any | EventKind::Other => return Vec::new(),
		};
		event.paths.into_iter().map(make).collect()
	}
}

/// Per-file registrations on the platform watcher
pub struct AssetWatcher {
	watcher: RecommendedWatcher,
	watched: HashSet<PathBuf>,
}

impl AssetWatcher {
	/// Creates the platform watcher and the channel its events arrive on
	pub fn new() -> Result<(Self, mpsc::UnboundedReceiver<WatchEvent>)> {
		let (tx, rx) = mpsc::unbounded_channel();

		let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
			for event in WatchEvent::classify(res) {
				// Receiver gone means the cache closed
				if tx.send(event).is_err() {
					return;
				}
			}
		})?;

		Ok((
			Self {
				watcher,
				watched: HashSet::new(),
			},
			rx,
		))
	}

	/// Starts watching `file`; already watched files are left alone
	pub fn watch(&mut self, file: &Path) -> Result<()> {
		if self.watched.contains(file) {
			return Ok(());
		}
		self.watcher.watch(file, RecursiveMode::NonRecursive)?;
		self.watched.insert(file.to_path_buf());
		Ok(())
	}

	/// Stops watching `file`
	///
	/// The registration is forgotten even when the backend reports an error,
	/// since removed files lose their OS watch on their own.
	pub fn unwatch(&mut self, file: &Path) -> Result<()> {
		if !self.watched.remove(file) {
			return Ok(());
		}
		self.watcher.unwatch(file)?;
		Ok(())
	}

	pub fn is_watching(&self, file: &Path) -> bool {
		self.watched.contains(file)
	}

	pub fn len(&self) -> usize {
		self.watched.len()
	}

	pub fn is_empty(&self) -> bool {
		self.watched.is_empty()
	}
}

impl std::fmt::Debug for AssetWatcher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AssetWatcher")
			.field("watched", &self.watched.len())
			.finish()
	}
}
