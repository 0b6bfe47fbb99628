//! Conditional request evaluation (RFC 7232 section 6)

use super::etag::{any_strong_match, any_weak_match, scan_etag, strong_match};
use hyper::header::{IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_RANGE, IF_UNMODIFIED_SINCE};
use reinhardt_http::Request;
use std::time::{SystemTime, UNIX_EPOCH};

/// Outcome of the `If-*` request headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
	/// Serve the representation
	Proceed,
	/// 304 Not Modified
	NotModified,
	/// 412 Precondition Failed
	Failed,
}

/// Evaluates `If-Match`, `If-Unmodified-Since`, `If-None-Match` and
/// `If-Modified-Since` against the selected representation
///
/// Dates compare at whole-second granularity. Unparseable dates are ignored.
pub fn evaluate_preconditions(request: &Request, etag: &str, mod_time: SystemTime) -> Precondition {
	let mod_secs = unix_secs(mod_time);

	let passes = match request.header_list(IF_MATCH) {
		Some(header) => any_strong_match(&header, etag),
		None => match (mod_secs, header_date(request, IF_UNMODIFIED_SINCE)) {
			(Some(modified), Some(since)) => modified <= since,
			_ => true,
		},
	};
	if !passes {
		return Precondition::Failed;
	}

	if let Some(header) = request.header_list(IF_NONE_MATCH) {
		if any_weak_match(&header, etag) {
			return if request.is_get_or_head() {
				Precondition::NotModified
			} else {
				Precondition::Failed
			};
		}
		return Precondition::Proceed;
	}

	if request.is_get_or_head()
		&& let (Some(modified), Some(since)) = (mod_secs, header_date(request, IF_MODIFIED_SINCE))
		&& modified <= since
	{
		return Precondition::NotModified;
	}

	Precondition::Proceed
}

/// Whether an `If-Range` guard lets the `Range` header apply
///
/// An entity tag must strongly match; a date must equal the modification
/// time to the second. Anything else falls back to the full response.
pub fn if_range_allows(request: &Request, etag: &str, mod_time: SystemTime) -> bool {
	let Some(header) = request.header(IF_RANGE) else {
		return true;
	};
	if let Some((tag, _)) = scan_etag(header) {
		return strong_match(tag, etag);
	}
	match (unix_secs(mod_time), httpdate::parse_http_date(header.trim()).ok()) {
		(Some(modified), Some(date)) => unix_secs(date) == Some(modified),
		_ => false,
	}
}

fn header_date(request: &Request, name: hyper::header::HeaderName) -> Option<u64> {
	request
		.header(name)
		.and_then(|value| httpdate::parse_http_date(value.trim()).ok())
		.and_then(unix_secs)
}

/// Seconds since the epoch; `None` for an unknown (epoch or earlier) time
fn unix_secs(time: SystemTime) -> Option<u64> {
	time.duration_since(UNIX_EPOCH)
		.ok()
		.map(|d| d.as_secs())
		.filter(|&secs| secs > 0)
}

#[cfg(test)]
mod tests {
	use super::*;
	use hyper::Method;
	use rstest::rstest;
	use std::time::Duration;

	const ETAG: &str = "\"v1\"";

	fn mod_time() -> SystemTime {
		UNIX_EPOCH + Duration::from_millis(1_700_000_000_500)
	}

	fn at(offset: i64) -> String {
		let base = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
		let time = if offset >= 0 {
			base + Duration::from_secs(offset as u64)
		} else {
			base - Duration::from_secs(offset.unsigned_abs())
		};
		httpdate::fmt_http_date(time)
	}

	fn get() -> Request {
		Request::get("/a.css")
	}

	fn post() -> Request {
		let mut request = Request::get("/a.css");
		request.method = Method::POST;
		request
	}

	#[rstest]
	fn test_no_headers_proceed() {
		assert_eq!(evaluate_preconditions(&get(), ETAG, mod_time()), Precondition::Proceed);
	}

	#[rstest]
	#[case("\"v1\"", Precondition::Proceed)]
	#[case("*", Precondition::Proceed)]
	#[case("\"v0\", \"v1\"", Precondition::Proceed)]
	#[case("W/\"v1\"", Precondition::Failed)]
	#[case("\"v2\"", Precondition::Failed)]
	fn test_if_match(#[case] header: &str, #[case] expected: Precondition) {
		let request = get().with_header("If-Match", header);
		assert_eq!(evaluate_preconditions(&request, ETAG, mod_time()), expected);
	}

	#[rstest]
	#[case(0, Precondition::Proceed)]
	#[case(10, Precondition::Proceed)]
	#[case(-1, Precondition::Failed)]
	fn test_if_unmodified_since(#[case] offset: i64, #[case] expected: Precondition) {
		let request = get().with_header("If-Unmodified-Since", &at(offset));
		assert_eq!(evaluate_preconditions(&request, ETAG, mod_time()), expected);
	}

	#[rstest]
	fn test_if_match_takes_precedence_over_date() {
		let request = get()
			.with_header("If-Match", ETAG)
			.with_header("If-Unmodified-Since", &at(-100));
		assert_eq!(evaluate_preconditions(&request, ETAG, mod_time()), Precondition::Proceed);
	}

	#[rstest]
	#[case("\"v1\"", Precondition::NotModified)]
	#[case("W/\"v1\"", Precondition::NotModified)]
	#[case("*", Precondition::NotModified)]
	#[case("\"v2\"", Precondition::Proceed)]
	fn test_if_none_match_get(#[case] header: &str, #[case] expected: Precondition) {
		let request = get().with_header("If-None-Match", header);
		assert_eq!(evaluate_preconditions(&request, ETAG, mod_time()), expected);
	}

	#[rstest]
	fn test_if_none_match_other_methods_fail() {
		let request = post().with_header("If-None-Match", ETAG);
		assert_eq!(evaluate_preconditions(&request, ETAG, mod_time()), Precondition::Failed);
	}

	#[rstest]
	fn test_if_none_match_overrides_modified_since() {
		let request = get()
			.with_header("If-None-Match", "\"other\"")
			.with_header("If-Modified-Since", &at(60));
		assert_eq!(evaluate_preconditions(&request, ETAG, mod_time()), Precondition::Proceed);
	}

	#[rstest]
	#[case(0, Precondition::NotModified)]
	#[case(60, Precondition::NotModified)]
	#[case(-1, Precondition::Proceed)]
	fn test_if_modified_since(#[case] offset: i64, #[case] expected: Precondition) {
		let request = get().with_header("If-Modified-Since", &at(offset));
		assert_eq!(evaluate_preconditions(&request, ETAG, mod_time()), expected);
	}

	#[rstest]
	fn test_if_modified_since_ignored_for_post_and_garbage() {
		let request = post().with_header("If-Modified-Since", &at(60));
		assert_eq!(evaluate_preconditions(&request, ETAG, mod_time()), Precondition::Proceed);

		let request = get().with_header("If-Modified-Since", "yesterday");
		assert_eq!(evaluate_preconditions(&request, ETAG, mod_time()), Precondition::Proceed);
	}

	#[rstest]
	#[case(None, true)]
	#[case(Some("\"v1\""), true)]
	#[case(Some("W/\"v1\""), false)]
	#[case(Some("\"v2\""), false)]
	#[case(Some("not a date"), false)]
	fn test_if_range_etag(#[case] header: Option<&str>, #[case] expected: bool) {
		let mut request = get();
		if let Some(value) = header {
			request = request.with_header("If-Range", value);
		}
		assert_eq!(if_range_allows(&request, ETAG, mod_time()), expected);
	}

	#[rstest]
	fn test_if_range_date_must_be_exact() {
		let exact = get().with_header("If-Range", &at(0));
		assert!(if_range_allows(&exact, ETAG, mod_time()));

		let later = get().with_header("If-Range", &at(5));
		assert!(!if_range_allows(&later, ETAG, mod_time()));
	}
}
