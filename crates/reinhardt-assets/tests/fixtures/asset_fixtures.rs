//! Sample site and helpers for asset cache tests

use reinhardt_assets::{AssetCache, AssetCacheConfig};
use reinhardt_http::Request;
use rstest::fixture;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

pub const INDEX_HTML: &str = r#"<html><head><link rel="stylesheet" href="/s.css"><link rel="preload" href="/p.js"></head><body><img src="/a.png"></body></html>"#;

/// A small static site:
///
/// ```text
/// index.html       links /s.css, preloads /p.js, shows /a.png
/// s.css            compressible, a few KiB
/// a.png            not compressible
/// about.html
/// LICENSE          no extension
/// docs/index.html
/// ```
#[fixture]
pub fn site() -> TempDir {
	let dir = TempDir::new().unwrap();
	let root = dir.path();

	fs::write(root.join("index.html"), INDEX_HTML).unwrap();
	fs::write(root.join("s.css"), "body { color: red; }\n".repeat(200)).unwrap();
	fs::write(root.join("a.png"), [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]).unwrap();
	fs::write(root.join("about.html"), "<h1>about</h1>").unwrap();
	fs::write(root.join("LICENSE"), "MIT License").unwrap();
	fs::create_dir(root.join("docs")).unwrap();
	fs::write(root.join("docs/index.html"), "<h1>docs</h1>").unwrap();

	dir
}

/// Builds a cache over `dir` with a customized configuration
pub fn cache_for(
	dir: &TempDir,
	configure: impl FnOnce(AssetCacheConfig) -> AssetCacheConfig,
) -> AssetCache {
	AssetCache::new(configure(AssetCacheConfig::new(dir.path()))).unwrap()
}

/// GET request for `path` with the given headers
pub fn request(path: &str, headers: &[(&str, &str)]) -> Request {
	headers
		.iter()
		.fold(Request::get(path), |request, (name, value)| request.with_header(name, value))
}

/// Polls `condition` until it holds or `timeout` elapses
pub async fn poll_until<F>(timeout: Duration, mut condition: F) -> Result<(), String>
where
	F: FnMut() -> bool,
{
	let start = tokio::time::Instant::now();
	while start.elapsed() < timeout {
		if condition() {
			return Ok(());
		}
		tokio::time::sleep(Duration::from_millis(20)).await;
	}
	Err(format!("Timeout after {:?} waiting for condition", timeout))
}
