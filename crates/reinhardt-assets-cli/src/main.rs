//! Reinhardt Assets CLI
//!
//! Serves a directory through the in-memory asset cache.
//!
//! ## Usage
//!
//! ```bash
//! reinhardt-assets serve --root ./static
//! reinhardt-assets serve --root ./public --addr 0.0.0.0:8080 --watch --warm
//! RUST_LOG=reinhardt_assets=debug reinhardt-assets serve --root ./static
//! ```

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use reinhardt_assets::{AssetCache, AssetCacheConfig, AssetHandler};
use reinhardt_server::{HttpServer, shutdown_signal};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reinhardt-assets")]
#[command(about = "Serve static files from an in-memory cache", long_about = None)]
#[command(version)]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Serve a directory over HTTP
	Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
	/// Directory to serve
	#[arg(long, value_name = "DIR", default_value = "static")]
	root: PathBuf,

	/// Address to listen on
	#[arg(long, value_name = "ADDR", default_value = "127.0.0.1:8000")]
	addr: SocketAddr,

	/// File served for directory requests
	#[arg(long, value_name = "FILE", default_value = "index.html")]
	index: String,

	/// Cache-Control value sent with every asset
	#[arg(long, value_name = "VALUE", default_value = "private, must-revalidate")]
	cache_control: String,

	/// Seconds an unused asset stays cached
	#[arg(long, value_name = "SECS", default_value_t = 300)]
	expire_secs: u64,

	/// Seconds between expiry sweeps
	#[arg(long, value_name = "SECS", default_value_t = 30)]
	sweep_interval_secs: u64,

	/// Regenerate cached assets when their files change
	#[arg(long)]
	watch: bool,

	/// Load every file under the root before accepting connections
	#[arg(long)]
	warm: bool,

	/// Verbose logging
	#[arg(long)]
	dev: bool,
}

impl ServeArgs {
	fn config(&self) -> AssetCacheConfig {
		AssetCacheConfig::new(&self.root)
			.with_index(self.index.clone())
			.with_cache_control(self.cache_control.clone())
			.with_expire(Duration::from_secs(self.expire_secs))
			.with_sweep_interval(Duration::from_secs(self.sweep_interval_secs))
			.with_watch(self.watch)
			.with_dev_mode(self.dev)
	}
}

fn init_tracing(dev: bool) {
	let default = if dev { "debug" } else { "info" };
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
	tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
	let cache = AssetCache::new(args.config())
		.with_context(|| format!("cannot serve {}", args.root.display()))?;

	if args.warm {
		let loaded = cache.warm().await.context("warm-up failed")?;
		info!(assets = loaded, "cache warmed");
	}

	info!(root = %cache.root().display(), watch = args.watch, "serving assets");
	let handler = Arc::new(AssetHandler::new(cache.clone()));
	let result = HttpServer::new(handler)
		.listen_with_shutdown(args.addr, shutdown_signal())
		.await;

	cache.close();
	result.context("server failed")
}

#[tokio::main]
async fn main() {
	let cli = Cli::parse();

	let result = match cli.command {
		Commands::Serve(args) => {
			init_tracing(args.dev);
			serve(args).await
		}
	};

	if let Err(err) = result {
		error!("{err:#}");
		eprintln!("Error: {err:#}");
		process::exit(1);
	}
}
