use bytes::{Bytes, BytesMut};
use futures::stream::{Stream, StreamExt};
use hyper::{HeaderMap, StatusCode};
use std::fmt;
use std::pin::Pin;

/// Boxed error carried by streaming bodies
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for streaming body
pub type StreamBody = Pin<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send>>;

/// Response body
///
/// `Full` bodies share their buffer with the asset that produced them, so
/// cloning or slicing never copies file content.
#[derive(Default)]
pub enum Body {
	#[default]
	Empty,
	Full(Bytes),
	/// Chunks produced lazily, in order; dropping the stream stops production
	Stream(StreamBody),
}

impl Body {
	/// Returns `true` when the body carries no bytes and no stream
	pub fn is_empty(&self) -> bool {
		match self {
			Body::Empty => true,
			Body::Full(bytes) => bytes.is_empty(),
			Body::Stream(_) => false,
		}
	}

	/// Collect the whole body into a single buffer
	///
	/// # Errors
	///
	/// Returns the first error yielded by a streaming body.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_http::Body;
	/// use bytes::Bytes;
	/// use futures::stream;
	///
	/// # futures::executor::block_on(async {
	/// let chunks: Vec<Result<Bytes, reinhardt_http::BoxError>> =
	///     vec![Ok(Bytes::from("ab")), Ok(Bytes::from("cd"))];
	/// let body = Body::Stream(Box::pin(stream::iter(chunks)));
	/// assert_eq!(body.collect().await.unwrap(), Bytes::from("abcd"));
	/// # });
	/// ```
	pub async fn collect(self) -> Result<Bytes, BoxError> {
		match self {
			Body::Empty => Ok(Bytes::new()),
			Body::Full(bytes) => Ok(bytes),
			Body::Stream(mut stream) => {
				let mut buf = BytesMut::new();
				while let Some(chunk) = stream.next().await {
					buf.extend_from_slice(&chunk?);
				}
				Ok(buf.freeze())
			}
		}
	}
}

impl fmt::Debug for Body {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Body::Empty => f.write_str("Body::Empty"),
			Body::Full(bytes) => write!(f, "Body::Full({} bytes)", bytes.len()),
			Body::Stream(_) => f.write_str("Body::Stream"),
		}
	}
}

impl From<Bytes> for Body {
	fn from(bytes: Bytes) -> Self {
		Body::Full(bytes)
	}
}

impl From<&'static str> for Body {
	fn from(s: &'static str) -> Self {
		Body::Full(Bytes::from_static(s.as_bytes()))
	}
}

/// HTTP Response representation
#[derive(Debug)]
pub struct Response {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Body,
}

impl Response {
	/// Create a new Response with the given status code
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_http::Response;
	/// use hyper::StatusCode;
	///
	/// let response = Response::new(StatusCode::OK);
	/// assert_eq!(response.status, StatusCode::OK);
	/// assert!(response.body.is_empty());
	/// ```
	pub fn new(status: StatusCode) -> Self {
		Self {
			status,
			headers: HeaderMap::new(),
			body: Body::Empty,
		}
	}

	/// Create a Response with HTTP 200 OK status
	pub fn ok() -> Self {
		Self::new(StatusCode::OK)
	}

	/// Create a Response with HTTP 404 Not Found status
	pub fn not_found() -> Self {
		Self::new(StatusCode::NOT_FOUND)
	}

	/// Create a Response with HTTP 500 Internal Server Error status
	pub fn internal_server_error() -> Self {
		Self::new(StatusCode::INTERNAL_SERVER_ERROR)
	}

	/// Set the response body
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_http::{Body, Response};
	/// use bytes::Bytes;
	///
	/// let response = Response::ok().with_body(Bytes::from("Hello, World!"));
	/// assert!(matches!(response.body, Body::Full(ref b) if b == "Hello, World!"));
	/// ```
	pub fn with_body(mut self, body: impl Into<Body>) -> Self {
		self.body = body.into();
		self
	}

	/// Set a streaming body
	pub fn with_stream(mut self, stream: StreamBody) -> Self {
		self.body = Body::Stream(stream);
		self
	}

	/// Add a custom header to the response
	///
	/// Invalid header names or values are silently ignored.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_http::Response;
	///
	/// let response = Response::ok().with_header("Cache-Control", "no-store");
	/// assert_eq!(
	///     response.headers.get("cache-control").unwrap().to_str().unwrap(),
	///     "no-store"
	/// );
	/// ```
	pub fn with_header(mut self, name: &str, value: &str) -> Self {
		if let Ok(header_name) = hyper::header::HeaderName::from_bytes(name.as_bytes())
			&& let Ok(header_value) = hyper::header::HeaderValue::from_str(value)
		{
			self.headers.insert(header_name, header_value);
		}
		self
	}

	/// Add a custom header using typed HeaderName and HeaderValue
	pub fn with_typed_header(
		mut self,
		key: hyper::header::HeaderName,
		value: hyper::header::HeaderValue,
	) -> Self {
		self.headers.insert(key, value);
		self
	}

	/// Header value as a string, if present and valid visible ASCII
	pub fn header<K: hyper::header::AsHeaderName>(&self, key: K) -> Option<&str> {
		self.headers.get(key).and_then(|v| v.to_str().ok())
	}
}

impl From<crate::Error> for Response {
	fn from(error: crate::Error) -> Self {
		let status = error.status_code();
		let reason = status.canonical_reason().unwrap_or("Error");
		Response::new(status)
			.with_typed_header(
				hyper::header::CONTENT_TYPE,
				hyper::header::HeaderValue::from_static("text/plain; charset=utf-8"),
			)
			.with_body(Bytes::from(reason))
	}
}
