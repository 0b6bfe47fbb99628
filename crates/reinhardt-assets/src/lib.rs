//! # Reinhardt Assets
//!
//! In-memory static asset cache for Reinhardt.
//!
//! Files under a root directory are read once, hashed, gzip pre-compressed
//! when textual, and kept in a concurrent store. Requests are answered from
//! memory with full conditional GET and byte range support.
//!
//! ## Features
//!
//! - **Pre-compression**: gzip at maximum level for text-like extensions
//! - **Strong ETags**: SHA-256 of each representation
//! - **Conditional requests**: `If-Match`, `If-None-Match`, `If-Modified-Since`,
//!   `If-Unmodified-Since`, `If-Range`
//! - **Byte ranges**: single ranges and `multipart/byteranges`
//! - **Expiry**: idle assets are swept periodically
//! - **File watching**: assets regenerate when their file changes
//! - **Server push**: resources referenced by HTML pages
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reinhardt_assets::{AssetCache, AssetCacheConfig, AssetHandler};
//! use std::time::Duration;
//!
//! # async fn example() -> reinhardt_assets::Result<()> {
//! let config = AssetCacheConfig::new("./static")
//!     .with_expire(Duration::from_secs(600))
//!     .with_watch(true);
//!
//! let cache = AssetCache::new(config)?;
//! cache.warm().await?;
//!
//! let handler = AssetHandler::new(cache);
//! # Ok(())
//! # }
//! ```

pub mod asset;
pub mod cache;
pub mod config;
pub mod error;
pub mod generate;
pub mod handler;
pub mod push;
pub mod serve;
pub mod watcher;

pub use asset::{Asset, Representation};
pub use cache::{AssetCache, AssetStore, ShardedStore};
pub use config::AssetCacheConfig;
pub use error::{AssetError, Result};
pub use generate::{content_etag, content_type_for, gzip};
pub use handler::AssetHandler;
pub use push::{PushExtractor, extract_push_targets};
pub use serve::conditional::Precondition;
pub use serve::range::{ByteRange, RangeError};
pub use watcher::{AssetWatcher, WatchEvent};
