//! Byte range requests (RFC 7233)

use bytes::Bytes;
use futures::stream;
use reinhardt_http::StreamBody;

/// One satisfiable byte range, `length` bytes from `start`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
	pub start: u64,
	pub length: u64,
}

impl ByteRange {
	/// Inclusive last byte position
	pub fn end(&self) -> u64 {
		self.start + self.length - 1
	}

	/// `Content-Range` value for a representation of `size` bytes
	pub fn content_range(&self, size: u64) -> String {
		format!("bytes {}-{}/{}", self.start, self.end(), size)
	}

	/// The bytes of `content` covered by this range
	pub fn slice(&self, content: &Bytes) -> Bytes {
		content.slice(self.start as usize..(self.start + self.length) as usize)
	}
}

/// Why a `Range` header cannot be satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
	#[error("invalid range")]
	Malformed,
	#[error("invalid range: failed to overlap")]
	NoOverlap,
}

/// Parses a `Range` header against a representation of `size` bytes
///
/// Supports `start-end`, open-ended `start-` and suffix `-n` specs. Ends past
/// the last byte are clamped; specs starting at or after `size` are dropped,
/// and [`RangeError::NoOverlap`] is returned when nothing remains.
///
/// # Example
///
/// ```rust
/// use reinhardt_assets::serve::range::{ByteRange, RangeError, parse_range};
///
/// assert_eq!(
///     parse_range("bytes=0-0, -2", 10),
///     Ok(vec![ByteRange { start: 0, length: 1 }, ByteRange { start: 8, length: 2 }]),
/// );
/// assert_eq!(parse_range("bytes=10-", 10), Err(RangeError::NoOverlap));
/// assert_eq!(parse_range("items=0-1", 10), Err(RangeError::Malformed));
/// ```
pub fn parse_range(header: &str, size: u64) -> Result<Vec<ByteRange>, RangeError> {
	let specs = header
		.trim()
		.strip_prefix("bytes=")
		.ok_or(RangeError::Malformed)?;

	let mut ranges = Vec::new();
	let mut dropped = false;
	for spec in specs.split(',') {
		let spec = spec.trim();
		if spec.is_empty() {
			continue;
		}
		let (start, end) = spec.split_once('-').ok_or(RangeError::Malformed)?;
		let (start, end) = (start.trim(), end.trim());

		let range = if start.is_empty() {
			let suffix = parse_position(end)?;
			let length = suffix.min(size);
			ByteRange {
				start: size - length,
				length,
			}
		} else {
			let start = parse_position(start)?;
			if start >= size {
				dropped = true;
				continue;
			}
			let length = if end.is_empty() {
				size - start
			} else {
				let end = parse_position(end)?;
				if start > end {
					return Err(RangeError::Malformed);
				}
				end.min(size - 1) - start + 1
			};
			ByteRange { start, length }
		};

		if range.length == 0 {
			dropped = true;
			continue;
		}
		ranges.push(range);
	}

	if ranges.is_empty() && dropped {
		return Err(RangeError::NoOverlap);
	}
	Ok(ranges)
}

fn parse_position(value: &str) -> Result<u64, RangeError> {
	if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
		return Err(RangeError::Malformed);
	}
	value.parse().map_err(|_| RangeError::Malformed)
}

/// Total bytes requested, used to reject ranges larger than the content
pub fn total_length(ranges: &[ByteRange]) -> u64 {
	ranges.iter().fold(0u64, |sum, r| sum.saturating_add(r.length))
}

/// A `multipart/byteranges` body ready to stream
pub struct MultipartBody {
	pub boundary: String,
	/// Exact byte length of the encoded body
	pub length: u64,
	pub stream: StreamBody,
}

impl MultipartBody {
	/// `Content-Type` of the whole response
	pub fn content_type(&self) -> String {
		format!("multipart/byteranges; boundary={}", self.boundary)
	}
}

/// Encodes `ranges` of `content` as `multipart/byteranges`
///
/// Each part carries its own `Content-Range` and `Content-Type`. Part
/// bodies are zero-copy slices of `content`, handed to the stream in order.
pub fn multipart_body(content: &Bytes, ranges: &[ByteRange], content_type: &str) -> MultipartBody {
	let boundary = hex::encode(rand::random::<[u8; 30]>());
	multipart_with_boundary(content, ranges, content_type, boundary)
}

fn multipart_with_boundary(
	content: &Bytes,
	ranges: &[ByteRange],
	content_type: &str,
	boundary: String,
) -> MultipartBody {
	let size = content.len() as u64;
	let mut chunks = Vec::with_capacity(ranges.len() * 2 + 1);

	for (i, range) in ranges.iter().enumerate() {
		let separator = if i == 0 { "" } else { "\r\n" };
		let head = format!(
			"{separator}--{boundary}\r\nContent-Range: {}\r\nContent-Type: {content_type}\r\n\r\n",
			range.content_range(size),
		);
		chunks.push(Bytes::from(head));
		chunks.push(range.slice(content));
	}
	chunks.push(Bytes::from(format!("\r\n--{boundary}--\r\n")));

	let length = chunks.iter().map(|c| c.len() as u64).sum();
	let stream: StreamBody = Box::pin(stream::iter(chunks.into_iter().map(Ok)));
	MultipartBody {
		boundary,
		length,
		stream,
	}
}
