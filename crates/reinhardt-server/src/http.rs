use bytes::Bytes;
use futures::TryStreamExt;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use reinhardt_http::{Body, BoxError, Handler, Request, Response};
use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Body type handed to hyper
pub type ServerBody = UnsyncBoxBody<Bytes, BoxError>;

/// Errors that stop the server
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error("failed to bind {addr}: {source}")]
	Bind {
		addr: SocketAddr,
		#[source]
		source: io::Error,
	},
	#[error("failed to read local address: {0}")]
	LocalAddr(#[source] io::Error),
}

pub struct HttpServer {
	handler: Arc<dyn Handler>,
}

impl HttpServer {
	pub fn new(handler: Arc<dyn Handler>) -> Self {
		Self { handler }
	}

	/// Returns a clone of the server's handler
	pub fn handler(&self) -> Arc<dyn Handler> {
		Arc::clone(&self.handler)
	}

	/// Serves `addr` until the process exits
	pub async fn listen(self, addr: SocketAddr) -> Result<(), ServerError> {
		self.listen_with_shutdown(addr, std::future::pending()).await
	}

	/// Serves `addr` until `signal` resolves
	///
	/// Open connections finish their in-flight requests before the call
	/// returns.
	///
	/// # Examples
	///
	/// ```no_run
	/// use reinhardt_http::{Handler, Request, Response};
	/// use reinhardt_server::{HttpServer, shutdown_signal};
	/// use std::sync::Arc;
	///
	/// struct Hello;
	///
	/// #[async_trait::async_trait]
	/// impl Handler for Hello {
	///     async fn handle(&self, _request: Request) -> reinhardt_http::Result<Response> {
	///         Ok(Response::ok().with_body("Hello, World!"))
	///     }
	/// }
	///
	/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
	/// let addr = "127.0.0.1:3000".parse()?;
	/// HttpServer::new(Arc::new(Hello))
	///     .listen_with_shutdown(addr, shutdown_signal())
	///     .await?;
	/// # Ok(())
	/// # }
	/// ```
	pub async fn listen_with_shutdown<F>(self, addr: SocketAddr, signal: F) -> Result<(), ServerError>
	where
		F: Future<Output = ()> + Send,
	{
		let listener = TcpListener::bind(addr)
			.await
			.map_err(|source| ServerError::Bind { addr, source })?;
		self.listen_on(listener, signal).await
	}

	/// Serves an already bound listener until `signal` resolves
	pub async fn listen_on<F>(self, listener: TcpListener, signal: F) -> Result<(), ServerError>
	where
		F: Future<Output = ()> + Send,
	{
		let local = listener.local_addr().map_err(ServerError::LocalAddr)?;
		info!(addr = %local, "server listening");

		let (shutdown_tx, shutdown_rx) = watch::channel(());
		let mut connections = JoinSet::new();
		tokio::pin!(signal);

		loop {
			tokio::select! {
				accepted = listener.accept() => {
					let (stream, remote) = match accepted {
						Ok(accepted) => accepted,
						Err(err) => {
							warn!(error = %err, "failed to accept connection");
							tokio::time::sleep(Duration::from_millis(50)).await;
							continue;
						}
					};
					let handler = Arc::clone(&self.handler);
					let shutdown = shutdown_rx.clone();
					connections.spawn(async move {
						if let Err(err) = drive_connection(stream, remote, handler, Some(shutdown)).await {
							debug!(remote = %remote, error = %err, "connection closed with error");
						}
					});
				}
				// Reap finished connections so the set does not grow unbounded
				Some(_) = connections.join_next(), if !connections.is_empty() => {}
				_ = &mut signal => {
					info!("shutdown signal received, draining connections");
					break;
				}
			}
		}

		drop(listener);
		let _ = shutdown_tx.send(());
		while connections.join_next().await.is_some() {}
		info!("server stopped");
		Ok(())
	}

	/// Serves a single accepted connection to completion
	pub async fn serve_connection(
		stream: TcpStream,
		remote: SocketAddr,
		handler: Arc<dyn Handler>,
	) -> Result<(), BoxError> {
		drive_connection(stream, remote, handler, None).await
	}
}

async fn drive_connection(
	stream: TcpStream,
	remote: SocketAddr,
	handler: Arc<dyn Handler>,
	shutdown: Option<watch::Receiver<()>>,
) -> Result<(), BoxError> {
	let io = TokioIo::new(stream);
	let service = service_fn(move |request: hyper::Request<Incoming>| {
		let handler = Arc::clone(&handler);
		async move { Ok::<_, Infallible>(dispatch(handler, request, remote).await) }
	});

	let builder = auto::Builder::new(TokioExecutor::new());
	let connection = builder.serve_connection(io, service);
	tokio::pin!(connection);

	let Some(mut shutdown) = shutdown else {
		return connection.await;
	};

	let mut draining = false;
	loop {
		tokio::select! {
			result = connection.as_mut() => return result,
			_ = shutdown.changed(), if !draining => {
				draining = true;
				connection.as_mut().graceful_shutdown();
			}
		}
	}
}

async fn dispatch(
	handler: Arc<dyn Handler>,
	request: hyper::Request<Incoming>,
	remote: SocketAddr,
) -> hyper::Response<ServerBody> {
	let (parts, _body) = request.into_parts();
	let request =
		Request::new(parts.method, parts.uri, parts.version, parts.headers).with_remote_addr(remote);

	let response = match handler.handle(request).await {
		Ok(response) => response,
		Err(err) => {
			if !err.is_not_found() {
				warn!(remote = %remote, error = %err, "handler failed");
			}
			Response::from(err)
		}
	};
	into_hyper(response)
}

/// Converts a Reinhardt response, keeping streaming bodies streaming
fn into_hyper(response: Response) -> hyper::Response<ServerBody> {
	let body: ServerBody = match response.body {
		Body::Empty => Empty::<Bytes>::new()
			.map_err(|never| match never {})
			.boxed_unsync(),
		Body::Full(bytes) => Full::new(bytes)
			.map_err(|never| match never {})
			.boxed_unsync(),
		Body::Stream(stream) => StreamBody::new(stream.map_ok(Frame::data)).boxed_unsync(),
	};

	let mut out = hyper::Response::new(body);
	*out.status_mut() = response.status;
	*out.headers_mut() = response.headers;
	out
}

/// Serves `handler` on `addr` until the process exits
///
/// # Examples
///
/// ```no_run
/// use reinhardt_assets::{AssetCache, AssetCacheConfig, AssetHandler};
/// use reinhardt_server::serve;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let cache = AssetCache::new(AssetCacheConfig::new("./static"))?;
/// serve("127.0.0.1:8000".parse()?, Arc::new(AssetHandler::new(cache))).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(addr: SocketAddr, handler: Arc<dyn Handler>) -> Result<(), ServerError> {
	HttpServer::new(handler).listen(addr).await
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::stream;
	use hyper::StatusCode;
	use rstest::rstest;
	use tokio::io::{AsyncReadExt, AsyncWriteExt};
	use tokio::sync::oneshot;

	struct TestHandler;

	#[async_trait::async_trait]
	impl Handler for TestHandler {
		async fn handle(&self, request: Request) -> reinhardt_http::Result<Response> {
			match request.path() {
				"/" => Ok(Response::ok().with_body("Hello, World!")),
				"/stream" => {
					let chunks: Vec<Result<Bytes, BoxError>> =
						vec![Ok(Bytes::from("chunk-1;")), Ok(Bytes::from("chunk-2"))];
					Ok(Response::ok().with_stream(Box::pin(stream::iter(chunks))))
				}
				"/boom" => Err(reinhardt_http::Error::Internal("boom".into())),
				other => Err(reinhardt_http::Error::NotFound(other.to_string())),
			}
		}
	}

	async fn raw_get(addr: SocketAddr, path: &str) -> String {
		let mut stream = TcpStream::connect(addr).await.unwrap();
		let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
		stream.write_all(request.as_bytes()).await.unwrap();
		let mut response = String::new();
		stream.read_to_string(&mut response).await.unwrap();
		response
	}

	async fn start() -> (SocketAddr, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		let (tx, rx) = oneshot::channel::<()>();
		let task = tokio::spawn(async move {
			HttpServer::new(Arc::new(TestHandler))
				.listen_on(listener, async {
					let _ = rx.await;
				})
				.await
				.unwrap();
		});
		(addr, tx, task)
	}

	#[rstest]
	#[case("/", "200 OK", "Hello, World!")]
	#[case("/missing", "404 Not Found", "Not Found")]
	#[case("/boom", "500 Internal Server Error", "Internal Server Error")]
	#[tokio::test]
	async fn test_responses_over_tcp(
		#[case] path: &str,
		#[case] status: &str,
		#[case] body: &str,
	) {
		let (addr, shutdown, task) = start().await;

		let response = raw_get(addr, path).await;
		assert!(response.starts_with(&format!("HTTP/1.1 {status}")), "{response}");
		assert!(response.ends_with(body), "{response}");

		shutdown.send(()).unwrap();
		task.await.unwrap();
	}

	#[rstest]
	#[tokio::test]
	async fn test_stream_bodies_are_chunked() {
		let (addr, shutdown, task) = start().await;

		let response = raw_get(addr, "/stream").await.to_ascii_lowercase();
		assert!(response.contains("transfer-encoding: chunked"), "{response}");
		assert!(response.contains("chunk-1;"), "{response}");
		assert!(response.contains("chunk-2"), "{response}");

		shutdown.send(()).unwrap();
		task.await.unwrap();
	}

	#[rstest]
	fn test_into_hyper_keeps_status_and_headers() {
		let response = Response::new(StatusCode::PARTIAL_CONTENT)
			.with_header("Content-Range", "bytes 0-0/1")
			.with_body("a");
		let converted = into_hyper(response);

		assert_eq!(converted.status(), StatusCode::PARTIAL_CONTENT);
		assert_eq!(converted.headers()["content-range"], "bytes 0-0/1");
	}

	#[rstest]
	#[tokio::test]
	async fn test_bind_error_is_reported() {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();

		let result = HttpServer::new(Arc::new(TestHandler))
			.listen_with_shutdown(addr, async {})
			.await;
		assert!(matches!(result, Err(ServerError::Bind { .. })));
	}
}
