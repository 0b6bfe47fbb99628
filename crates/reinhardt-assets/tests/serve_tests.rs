//! Serving engine tests against generated assets


use bytes::Bytes;
use fixtures::{cache_for, request, site};
use flate2::read::GzDecoder;
use hyper::StatusCode;
use hyper::header::{
	CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG, LAST_MODIFIED, VARY,
};
use reinhardt_assets::AssetHandler;
use reinhardt_http::{Handler, Response};
use rstest::rstest;
use std::io::Read;
use tempfile::TempDir;

async fn body_of(response: Response) -> Bytes {
	response.body.collect().await.unwrap()
}

#[rstest]
#[tokio::test]
async fn test_if_none_match_current_etag_is_not_modified(site: TempDir) {
	let cache = cache_for(&site, |c| c);
	let asset = cache.get("/s.css").await.unwrap();

	let response = asset.serve(&request("/s.css", &[("If-None-Match", asset.etag())]));

	assert_eq!(response.status, StatusCode::NOT_MODIFIED);
	assert!(response.body.is_empty());
	assert!(response.header(CONTENT_LENGTH).is_none());
	assert!(response.header(CONTENT_TYPE).is_none());
	assert_eq!(response.header(ETAG), Some(asset.etag()));
	assert!(response.header("cache-control").is_some());
}

#[rstest]
#[tokio::test]
async fn test_if_modified_since_last_modified_is_not_modified(site: TempDir) {
	let cache = cache_for(&site, |c| c);
	let asset = cache.get("/a.png").await.unwrap();

	let first = asset.serve(&request("/a.png", &[]));
	let last_modified = first.header(LAST_MODIFIED).unwrap().to_string();
	assert_eq!(last_modified, httpdate::fmt_http_date(asset.mod_time()));

	let second = asset.serve(&request("/a.png", &[("If-Modified-Since", &last_modified)]));
	assert_eq!(second.status, StatusCode::NOT_MODIFIED);
}

#[rstest]
#[tokio::test]
async fn test_if_match_mismatch_is_precondition_failed(site: TempDir) {
	let cache = cache_for(&site, |c| c);
	let asset = cache.get("/a.png").await.unwrap();

	let response = asset.serve(&request("/a.png", &[("If-Match", "\"nope\"")]));

	assert_eq!(response.status, StatusCode::PRECONDITION_FAILED);
	assert_eq!(response.header(CONTENT_TYPE), Some("image/png"));
	assert!(response.body.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_first_byte_range(site: TempDir) {
	let cache = cache_for(&site, |c| c);
	let asset = cache.get("/a.png").await.unwrap();
	let size = asset.content().len();

	let response = asset.serve(&request("/a.png", &[("Range", "bytes=0-0")]));

	assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
	assert_eq!(
		response.header(CONTENT_RANGE),
		Some(format!("bytes 0-0/{size}").as_str())
	);
	assert_eq!(response.header(CONTENT_LENGTH), Some("1"));
	assert_eq!(body_of(response).await.as_ref(), &[0x89]);
}

#[rstest]
#[case("bytes=8-")]
#[case("bytes=100-200")]
#[tokio::test]
async fn test_range_past_end_is_not_satisfiable(site: TempDir, #[case] range: &str) {
	let cache = cache_for(&site, |c| c);
	let asset = cache.get("/a.png").await.unwrap();

	let response = asset.serve(&request("/a.png", &[("Range", range)]));

	assert_eq!(response.status, StatusCode::RANGE_NOT_SATISFIABLE);
	assert_eq!(response.header(CONTENT_RANGE), Some("bytes */8"));
}

#[rstest]
#[tokio::test]
async fn test_malformed_range_is_not_satisfiable(site: TempDir) {
	let cache = cache_for(&site, |c| c);
	let asset = cache.get("/a.png").await.unwrap();

	let response = asset.serve(&request("/a.png", &[("Range", "lines=1-2")]));

	assert_eq!(response.status, StatusCode::RANGE_NOT_SATISFIABLE);
	assert_eq!(response.header(CONTENT_RANGE), Some("bytes */8"));
}

#[rstest]
#[tokio::test]
async fn test_gzip_selection(site: TempDir) {
	let cache = cache_for(&site, |c| c);
	let asset = cache.get("/").await.unwrap();

	let gzipped = asset.serve(&request("/", &[("Accept-Encoding", "gzip, deflate")]));
	assert_eq!(gzipped.status, StatusCode::OK);
	assert_eq!(gzipped.header(CONTENT_ENCODING), Some("gzip"));
	assert_eq!(gzipped.header(ETAG), asset.etag_compressed());
	assert_eq!(gzipped.header(VARY), Some("Accept-Encoding"));

	let mut decoded = Vec::new();
	GzDecoder::new(body_of(gzipped).await.as_ref())
		.read_to_end(&mut decoded)
		.unwrap();
	assert_eq!(decoded, asset.content().as_ref());

	let plain = asset.serve(&request("/", &[]));
	assert!(plain.header(CONTENT_ENCODING).is_none());
	assert_eq!(plain.header(ETAG), Some(asset.etag()));
	assert_eq!(plain.header(VARY), Some("Accept-Encoding"));
	assert_eq!(body_of(plain).await, asset.content().clone());
}

#[rstest]
#[tokio::test]
async fn test_not_modified_compares_selected_representation(site: TempDir) {
	let cache = cache_for(&site, |c| c);
	let asset = cache.get("/s.css").await.unwrap();
	let compressed_etag = asset.etag_compressed().unwrap();

	let gzip = asset.serve(&request(
		"/s.css",
		&[("Accept-Encoding", "gzip"), ("If-None-Match", compressed_etag)],
	));
	assert_eq!(gzip.status, StatusCode::NOT_MODIFIED);

	let plain = asset.serve(&request("/s.css", &[("If-None-Match", compressed_etag)]));
	assert_eq!(plain.status, StatusCode::OK);
}

#[rstest]
#[tokio::test]
async fn test_range_applies_to_compressed_bytes(site: TempDir) {
	let cache = cache_for(&site, |c| c);
	let asset = cache.get("/s.css").await.unwrap();
	let compressed = asset.compressed_content().unwrap().clone();
	let size = compressed.len();

	let response = asset.serve(&request(
		"/s.css",
		&[("Accept-Encoding", "gzip"), ("Range", "bytes=-10")],
	));

	assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
	assert_eq!(
		response.header(CONTENT_RANGE),
		Some(format!("bytes {}-{}/{size}", size - 10, size - 1).as_str())
	);
	assert_eq!(body_of(response).await, compressed.slice(size - 10..));
}

#[rstest]
#[tokio::test]
async fn test_multiple_ranges_are_multipart(site: TempDir) {
	let cache = cache_for(&site, |c| c);
	let asset = cache.get("/a.png").await.unwrap();

	let response = asset.serve(&request("/a.png", &[("Range", "bytes=0-1, 6-7")]));

	assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
	let content_type = response.header(CONTENT_TYPE).unwrap().to_string();
	let boundary = content_type
		.strip_prefix("multipart/byteranges; boundary=")
		.unwrap()
		.to_string();
	let length: usize = response.header(CONTENT_LENGTH).unwrap().parse().unwrap();

	let body = body_of(response).await;
	assert_eq!(body.len(), length);

	let mut expected = Vec::new();
	expected.extend_from_slice(
		format!("--{boundary}\r\nContent-Range: bytes 0-1/8\r\nContent-Type: image/png\r\n\r\n")
			.as_bytes(),
	);
	expected.extend_from_slice(&[0x89, b'P']);
	expected.extend_from_slice(
		format!("\r\n--{boundary}\r\nContent-Range: bytes 6-7/8\r\nContent-Type: image/png\r\n\r\n")
			.as_bytes(),
	);
	expected.extend_from_slice(&[0x1a, 0x0a]);
	expected.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
	assert_eq!(body.as_ref(), expected.as_slice());
}

#[rstest]
#[tokio::test]
async fn test_oversized_range_sum_serves_full_content(site: TempDir) {
	let cache = cache_for(&site, |c| c);
	let asset = cache.get("/a.png").await.unwrap();

	let response = asset.serve(&request("/a.png", &[("Range", "bytes=0-,0-")]));

	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(response.header(CONTENT_LENGTH), Some("8"));
}

#[rstest]
#[case("\"stale\"", StatusCode::OK)]
#[case("Thu, 01 Jan 1970 00:00:01 GMT", StatusCode::OK)]
#[tokio::test]
async fn test_if_range_mismatch_ignores_range(
	site: TempDir,
	#[case] if_range: &str,
	#[case] expected: StatusCode,
) {
	let cache = cache_for(&site, |c| c);
	let asset = cache.get("/a.png").await.unwrap();

	let response = asset.serve(&request(
		"/a.png",
		&[("Range", "bytes=0-0"), ("If-Range", if_range)],
	));
	assert_eq!(response.status, expected);
}

#[rstest]
#[tokio::test]
async fn test_if_range_current_etag_applies_range(site: TempDir) {
	let cache = cache_for(&site, |c| c);
	let asset = cache.get("/a.png").await.unwrap();

	let response = asset.serve(&request(
		"/a.png",
		&[("Range", "bytes=0-0"), ("If-Range", asset.etag())],
	));
	assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
}

#[rstest]
#[tokio::test]
async fn test_handler_serves_and_reports_not_found(site: TempDir) {
	let handler = AssetHandler::new(cache_for(&site, |c| c));

	let response = handler.handle(request("/docs/", &[])).await.unwrap();
	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(body_of(response).await.as_ref(), b"<h1>docs</h1>");

	for path in ["/nope.css", "/s.css/", "/a.png/x", "/%00.css"] {
		let missing = handler.handle(request(path, &[])).await;
		let err = missing.err().unwrap();
		assert!(err.is_not_found(), "{path}: {err}");
		assert_eq!(Response::from(err).status, StatusCode::NOT_FOUND, "{path}");
	}
}
