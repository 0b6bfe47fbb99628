//! # Reinhardt Static Assets
//!
//! An in-memory static file cache with conditional and range serving.
//!
//! Files under a root directory are loaded on first request, hashed into a
//! strong `ETag`, gzip-compressed when the extension is textual, scanned for
//! HTTP/2 push targets when they are HTML, and kept until they go unused for
//! the configured expiry. Serving honours `If-Match`, `If-None-Match`,
//! `If-Modified-Since`, `If-Unmodified-Since`, `If-Range` and multi-range
//! `Range` requests.
//!
//! ## Crates
//!
//! - [`assets`]: the cache, generation pipeline, watcher and serving engine
//! - [`http`]: request/response types and the [`Handler`](http::Handler) trait
//! - [`server`]: hyper adapter (feature `server`, enabled by default)
//!
//! ## Quick Start
//!
//! ```no_run
//! use reinhardt_static_assets::assets::{AssetCache, AssetCacheConfig, AssetHandler};
//! use reinhardt_static_assets::server::{HttpServer, shutdown_signal};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = AssetCache::new(AssetCacheConfig::new("./static").with_watch(true))?;
//! HttpServer::new(Arc::new(AssetHandler::new(cache.clone())))
//!     .listen_with_shutdown("127.0.0.1:8000".parse()?, shutdown_signal())
//!     .await?;
//! cache.close();
//! # Ok(())
//! # }
//! ```

pub use reinhardt_assets as assets;
pub use reinhardt_http as http;
#[cfg(feature = "server")]
pub use reinhardt_server as server;

pub use reinhardt_assets::{Asset, AssetCache, AssetCacheConfig, AssetError, AssetHandler};
pub use reinhardt_http::{Handler, Request, Response};
#[cfg(feature = "server")]
pub use reinhardt_server::HttpServer;
