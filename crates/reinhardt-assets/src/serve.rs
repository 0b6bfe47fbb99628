//! HTTP serving of cached assets
//!
//! [`Asset::serve`] answers one request from an in-memory asset: it picks the
//! plain or gzip representation, evaluates the conditional headers, honors
//! single and multiple byte ranges, and pushes the asset's push list when the
//! connection allows it.
//!
//! ## Status codes
//!
//! | Status | When |
//! |---|---|
//! | 200 | Full representation |
//! | 206 | Satisfiable `Range` |
//! | 304 | `If-None-Match` / `If-Modified-Since` matched on GET or HEAD |
//! | 412 | `If-Match` / `If-Unmodified-Since` failed, or `If-None-Match` matched on another method |
//! | 416 | Malformed or non-overlapping `Range` |

pub mod conditional;
pub mod etag;
pub mod range;

use crate::asset::{Asset, Representation};
use conditional::{Precondition, evaluate_preconditions, if_range_allows};
use hyper::header::{
	ACCEPT_ENCODING, ACCEPT_RANGES, CACHE_CONTROL, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_RANGE,
	CONTENT_TYPE, ETAG, HOST, HeaderMap, HeaderName, HeaderValue, LAST_MODIFIED, RANGE,
	STRICT_TRANSPORT_SECURITY, VARY,
};
use hyper::{Method, StatusCode};
use range::{multipart_body, parse_range, total_length};
use reinhardt_http::{Body, Request, Response};
use tracing::{debug, warn};

/// `Strict-Transport-Security` value sent over secure connections
pub const HSTS_VALUE: &str = "max-age=31536000";

impl Asset {
	/// Builds the response for `request`
	///
	/// # Example
	///
	/// ```rust,no_run
	/// use reinhardt_assets::{AssetCache, AssetCacheConfig};
	/// use reinhardt_http::Request;
	///
	/// # async fn example(cache: AssetCache) -> reinhardt_assets::Result<()> {
	/// let asset = cache.get("/app.js").await?;
	/// let request = Request::get("/app.js").with_header("Range", "bytes=0-99");
	/// let response = asset.serve(&request);
	/// assert_eq!(response.status.as_u16(), 206);
	/// # Ok(())
	/// # }
	/// ```
	pub fn serve(&self, request: &Request) -> Response {
		self.serve_with(request, Response::ok())
	}

	/// Like [`serve`](Self::serve), keeping headers already set on `response`
	///
	/// A preset `Cache-Control`, `Last-Modified` or
	/// `Strict-Transport-Security` wins over the asset's own value.
	pub fn serve_with(&self, request: &Request, response: Response) -> Response {
		self.touch();
		let mut headers = response.headers;

		if request.is_secure {
			set_default(&mut headers, STRICT_TRANSPORT_SECURITY, HSTS_VALUE);
		}
		set_default(&mut headers, CACHE_CONTROL, &self.cache_control);
		set_default(
			&mut headers,
			LAST_MODIFIED,
			&httpdate::fmt_http_date(self.mod_time),
		);

		let rep = if self.is_compressed() && accepts_gzip(request) {
			Representation::Gzip
		} else {
			Representation::Plain
		};
		let (content, etag, encoding) = self.representation(rep);
		if self.is_compressed() {
			add_vary(&mut headers);
		}
		set(&mut headers, ETAG, etag);
		set(&mut headers, CONTENT_TYPE, &self.content_type);

		match evaluate_preconditions(request, etag, self.mod_time) {
			Precondition::Proceed => {}
			Precondition::NotModified => return not_modified(headers),
			Precondition::Failed => return empty(StatusCode::PRECONDITION_FAILED, headers),
		}

		if let Some(encoding) = encoding {
			set(&mut headers, CONTENT_ENCODING, encoding);
		}

		let size = content.len() as u64;
		let mut ranges = Vec::new();
		if request.is_get_or_head()
			&& let Some(header) = request.header(RANGE)
			&& if_range_allows(request, etag, self.mod_time)
		{
			match parse_range(header, size) {
				Ok(parsed) => ranges = parsed,
				Err(err) => {
					debug!(range = header, error = %err, "unsatisfiable range");
					return range_not_satisfiable(headers, size);
				}
			}
		}
		if total_length(&ranges) > size {
			ranges.clear();
		}

		set(&mut headers, ACCEPT_RANGES, "bytes");
		self.push_targets(request);

		let (status, length, body) = match ranges.as_slice() {
			[] => (StatusCode::OK, size, Body::Full(content.clone())),
			[single] => {
				set(&mut headers, CONTENT_RANGE, &single.content_range(size));
				(
					StatusCode::PARTIAL_CONTENT,
					single.length,
					Body::Full(single.slice(content)),
				)
			}
			many => {
				let multipart = multipart_body(content, many, &self.content_type);
				set(&mut headers, CONTENT_TYPE, &multipart.content_type());
				(
					StatusCode::PARTIAL_CONTENT,
					multipart.length,
					Body::Stream(multipart.stream),
				)
			}
		};

		set(&mut headers, CONTENT_LENGTH, &length.to_string());
		let body = if request.method == Method::HEAD {
			Body::Empty
		} else {
			body
		};

		Response {
			status,
			headers,
			body,
		}
	}

	/// Pushes every entry of the push list over the request's connection
	fn push_targets(&self, request: &Request) {
		if self.push_list.is_empty() || !request.can_push() {
			return;
		}
		let Some(pusher) = request.pusher.as_ref() else {
			return;
		};

		let headers = push_headers(&request.headers);
		for target in &self.push_list {
			if let Err(err) = pusher.push(target, &headers) {
				warn!(target = %target, error = %err, "server push failed");
			}
		}
	}
}

/// Request headers reused for pushed sub-requests
///
/// Validators, range and entity headers of the parent request would
/// short-circuit or corrupt the pushed responses, so they are dropped.
pub fn push_headers(headers: &HeaderMap) -> HeaderMap {
	let mut pushed = HeaderMap::with_capacity(headers.len());
	for (name, value) in headers {
		let skip = name.as_str().starts_with("if-")
			|| [ETAG, RANGE, CONTENT_LENGTH, CONTENT_TYPE, HOST].contains(name);
		if !skip {
			pushed.append(name.clone(), value.clone());
		}
	}
	pushed
}

/// Whether `Accept-Encoding` admits gzip with a non-zero quality
fn accepts_gzip(request: &Request) -> bool {
	let Some(header) = request.header_list(ACCEPT_ENCODING) else {
		return false;
	};

	let mut wildcard = false;
	for item in header.split(',') {
		let mut parts = item.split(';');
		let coding = parts.next().unwrap_or_default().trim();
		let quality = parts
			.filter_map(|param| param.trim().strip_prefix("q="))
			.find_map(|q| q.trim().parse::<f32>().ok())
			.unwrap_or(1.0);

		if coding.eq_ignore_ascii_case("gzip") || coding.eq_ignore_ascii_case("x-gzip") {
			return quality > 0.0;
		}
		if coding == "*" {
			wildcard = quality > 0.0;
		}
	}
	wildcard
}

fn not_modified(mut headers: HeaderMap) -> Response {
	headers.remove(CONTENT_TYPE);
	headers.remove(CONTENT_LENGTH);
	headers.remove(CONTENT_ENCODING);
	if headers.contains_key(ETAG) {
		headers.remove(LAST_MODIFIED);
	}
	Response {
		status: StatusCode::NOT_MODIFIED,
		headers,
		body: Body::Empty,
	}
}

fn empty(status: StatusCode, mut headers: HeaderMap) -> Response {
	set(&mut headers, CONTENT_LENGTH, "0");
	Response {
		status,
		headers,
		body: Body::Empty,
	}
}

fn range_not_satisfiable(mut headers: HeaderMap, size: u64) -> Response {
	let message = "Range Not Satisfiable";
	headers.remove(CONTENT_ENCODING);
	set(&mut headers, CONTENT_RANGE, &format!("bytes */{size}"));
	set(&mut headers, CONTENT_TYPE, "text/plain; charset=utf-8");
	set(&mut headers, CONTENT_LENGTH, &message.len().to_string());
	Response {
		status: StatusCode::RANGE_NOT_SATISFIABLE,
		headers,
		body: Body::from(message),
	}
}

fn add_vary(headers: &mut HeaderMap) {
	let present = headers.get_all(VARY).iter().any(|value| {
		value.to_str().is_ok_and(|v| {
			v.split(',')
				.any(|token| token.trim().eq_ignore_ascii_case("accept-encoding") || token.trim() == "*")
		})
	});
	if !present {
		headers.append(VARY, HeaderValue::from_static("Accept-Encoding"));
	}
}

fn set(headers: &mut HeaderMap, name: HeaderName, value: &str) {
	if let Ok(value) = HeaderValue::from_str(value) {
		headers.insert(name, value);
	}
}

fn set_default(headers: &mut HeaderMap, name: HeaderName, value: &str) {
	if !headers.contains_key(&name) {
		set(headers, name, value);
	}
}
