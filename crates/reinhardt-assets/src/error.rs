//! Error types for the asset cache

use std::io;
use std::path::PathBuf;

/// Result alias for asset cache operations
pub type Result<T> = std::result::Result<T, AssetError>;

/// Errors produced by the asset cache
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
	/// The path does not resolve to a regular file under the cache root
	#[error("asset not found: {}", .0.display())]
	NotFound(PathBuf),

	/// Reading the backing file failed
	#[error("failed to read {}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	/// The configured root is unusable; fatal at startup
	#[error("invalid asset root {}: {reason}", path.display())]
	InvalidRoot { path: PathBuf, reason: String },

	#[error("invalid asset cache configuration: {0}")]
	InvalidConfig(String),

	/// Background tasks need a Tokio runtime
	#[error("asset cache must be created inside a Tokio runtime")]
	NoRuntime,

	#[error("filesystem watcher error: {0}")]
	Watch(#[from] notify::Error),

	#[error("asset generation task failed: {0}")]
	Join(#[from] tokio::task::JoinError),

	/// The cache was closed
	#[error("asset cache is closed")]
	Closed,
}

impl AssetError {
	/// Maps an I/O error on `path`, keeping missing files distinguishable
	pub(crate) fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
		let path = path.into();
		if source.kind() == io::ErrorKind::NotFound {
			AssetError::NotFound(path)
		} else {
			AssetError::Io { path, source }
		}
	}

	/// Returns `true` when the asset simply does not exist
	pub fn is_not_found(&self) -> bool {
		matches!(self, AssetError::NotFound(_))
	}
}

impl From<AssetError> for reinhardt_http::Error {
	fn from(error: AssetError) -> Self {
		match error {
			AssetError::NotFound(path) => reinhardt_http::Error::NotFound(path.display().to_string()),
			other => reinhardt_http::Error::Internal(other.to_string()),
		}
	}
}
