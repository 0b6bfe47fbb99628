//! Incoming request view
//!
//! The asset cache never reads request bodies, so a [`Request`] only carries
//! the request line, the header map and a few facts about the transport.

use crate::push::ServerPush;
use hyper::header::AsHeaderName;
use hyper::{HeaderMap, Method, Uri, Version};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

/// HTTP Request representation
#[derive(Clone)]
pub struct Request {
	pub method: Method,
	pub uri: Uri,
	pub version: Version,
	pub headers: HeaderMap,
	/// Whether the request arrived over TLS
	pub is_secure: bool,
	pub remote_addr: Option<SocketAddr>,
	/// Push capability of the underlying connection, if any
	pub pusher: Option<Arc<dyn ServerPush>>,
}

impl Request {
	/// Create a new request
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_http::Request;
	/// use hyper::{HeaderMap, Method, Uri, Version};
	///
	/// let request = Request::new(
	///     Method::GET,
	///     Uri::from_static("/css/app.css?v=2"),
	///     Version::HTTP_11,
	///     HeaderMap::new(),
	/// );
	/// assert_eq!(request.path(), "/css/app.css");
	/// assert!(!request.can_push());
	/// ```
	pub fn new(method: Method, uri: Uri, version: Version, headers: HeaderMap) -> Self {
		Self {
			method,
			uri,
			version,
			headers,
			is_secure: false,
			remote_addr: None,
			pusher: None,
		}
	}

	/// Shorthand for a plain HTTP/1.1 GET without headers
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_http::Request;
	/// use hyper::Method;
	///
	/// let request = Request::get("/index.html");
	/// assert_eq!(request.method, Method::GET);
	/// ```
	pub fn get(path: &str) -> Self {
		let uri = path.parse().unwrap_or_else(|_| Uri::from_static("/"));
		Self::new(Method::GET, uri, Version::HTTP_11, HeaderMap::new())
	}

	/// Mark the request as received over TLS
	pub fn with_secure(mut self, secure: bool) -> Self {
		self.is_secure = secure;
		self
	}

	/// Attach the push capability of the connection
	pub fn with_pusher(mut self, pusher: Arc<dyn ServerPush>) -> Self {
		self.pusher = Some(pusher);
		self
	}

	pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
		self.remote_addr = Some(addr);
		self
	}

	/// Add a header, ignoring names or values that are not valid HTTP tokens
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_http::Request;
	///
	/// let request = Request::get("/").with_header("If-None-Match", "\"abc\"");
	/// assert_eq!(request.header("if-none-match"), Some("\"abc\""));
	/// ```
	pub fn with_header(mut self, name: &str, value: &str) -> Self {
		if let Ok(header_name) = hyper::header::HeaderName::from_bytes(name.as_bytes())
			&& let Ok(header_value) = hyper::header::HeaderValue::from_str(value)
		{
			self.headers.insert(header_name, header_value);
		}
		self
	}

	/// Path component of the request URI
	pub fn path(&self) -> &str {
		self.uri.path()
	}

	/// First value of a header, if present and valid visible ASCII
	pub fn header<K: AsHeaderName>(&self, key: K) -> Option<&str> {
		self.headers.get(key).and_then(|v| v.to_str().ok())
	}

	/// All values of a header joined with `", "`, as list-valued headers allow
	///
	/// Values that are not valid visible ASCII are skipped.
	pub fn header_list<K: AsHeaderName>(&self, key: K) -> Option<String> {
		let values: Vec<&str> = self
			.headers
			.get_all(key)
			.iter()
			.filter_map(|v| v.to_str().ok())
			.collect();
		if values.is_empty() {
			None
		} else {
			Some(values.join(", "))
		}
	}

	/// Whether the method is GET or HEAD
	pub fn is_get_or_head(&self) -> bool {
		self.method == Method::GET || self.method == Method::HEAD
	}

	/// Whether pushes may be initiated for this request
	///
	/// Requires a push capability on the connection and a secure or HTTP/2 channel.
	pub fn can_push(&self) -> bool {
		self.pusher.is_some() && (self.is_secure || self.version == Version::HTTP_2)
	}
}

impl fmt::Debug for Request {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Request")
			.field("method", &self.method)
			.field("uri", &self.uri)
			.field("version", &self.version)
			.field("headers", &self.headers)
			.field("is_secure", &self.is_secure)
			.field("remote_addr", &self.remote_addr)
			.field("pusher", &self.pusher.is_some())
			.finish()
	}
}
