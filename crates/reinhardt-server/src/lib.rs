//! HTTP server for Reinhardt handlers, built on hyper.
//!
//! Connections are served with hyper-util's auto builder, so both HTTP/1.1
//! and prior-knowledge HTTP/2 clients are accepted. Streaming response
//! bodies are forwarded frame by frame.
//!
//! ## Basic Usage
//!
//! ```rust,ignore
//! use reinhardt_server::{HttpServer, shutdown_signal};
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//!
//! let addr: SocketAddr = "127.0.0.1:8000".parse()?;
//! HttpServer::new(Arc::new(MyHandler))
//!     .listen_with_shutdown(addr, shutdown_signal())
//!     .await?;
//! ```

pub mod http;
pub mod shutdown;

pub use http::{HttpServer, ServerBody, ServerError, serve};
pub use shutdown::shutdown_signal;
