//! [`Handler`] serving requests from an [`AssetCache`]

use crate::cache::AssetCache;
use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use reinhardt_http::{Error, Handler, Request, Response, Result};

/// Serves static assets, answering unknown paths with [`Error::NotFound`]
///
/// The not-found error is left to the caller (or the server adapter) to
/// render, so applications can chain their own 404 handling.
///
/// # Example
///
/// ```rust,no_run
/// use reinhardt_assets::{AssetCache, AssetCacheConfig, AssetHandler};
/// use reinhardt_http::{Handler, Request};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let cache = AssetCache::new(AssetCacheConfig::new("./static"))?;
/// let handler = AssetHandler::new(cache);
///
/// let response = handler.handle(Request::get("/")).await?;
/// assert!(response.status.is_success());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AssetHandler {
	cache: AssetCache,
}

impl AssetHandler {
	pub fn new(cache: AssetCache) -> Self {
		Self { cache }
	}

	pub fn cache(&self) -> &AssetCache {
		&self.cache
	}
}

#[async_trait]
impl Handler for AssetHandler {
	async fn handle(&self, request: Request) -> Result<Response> {
		let path = percent_decode_str(request.path())
			.decode_utf8()
			.map_err(|_| Error::NotFound(request.path().to_string()))?;

		let asset = self.cache.get(path.as_ref()).await?;
		Ok(asset.serve(&request))
	}
}
