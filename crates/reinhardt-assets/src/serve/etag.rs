//! Entity tag parsing and comparison (RFC 7232 section 2.3)

/// Splits the first entity tag off `s`
///
/// Returns the tag (including an optional `W/` prefix and its quotes) and
/// the unparsed remainder, or `None` when `s` does not start with a
/// well-formed tag.
///
/// # Example
///
/// ```rust
/// use reinhardt_assets::serve::etag::scan_etag;
///
/// assert_eq!(scan_etag(r#" W/"v1", "v2""#), Some((r#"W/"v1""#, r#", "v2""#)));
/// assert_eq!(scan_etag("v1"), None);
/// ```
pub fn scan_etag(s: &str) -> Option<(&str, &str)> {
	let s = s.trim_matches(|c| c == ' ' || c == '\t');
	let start = if s.starts_with("W/") { 2 } else { 0 };
	let bytes = s.as_bytes();
	if bytes.len() < start + 2 || bytes[start] != b'"' {
		return None;
	}
	for (i, &c) in bytes.iter().enumerate().skip(start + 1) {
		match c {
			b'"' => return Some((&s[..=i], &s[i + 1..])),
			0x21 | 0x23..=0x7e | 0x80..=0xff => {}
			_ => return None,
		}
	}
	None
}

/// Both tags are identical and neither is weak
pub fn strong_match(a: &str, b: &str) -> bool {
	a == b && a.starts_with('"')
}

/// Tags are identical once a `W/` prefix is ignored
pub fn weak_match(a: &str, b: &str) -> bool {
	a.trim_start_matches("W/") == b.trim_start_matches("W/")
}

/// Evaluates an `If-Match` style list: `*` or any strong match
pub fn any_strong_match(header: &str, current: &str) -> bool {
	any_match(header, current, strong_match)
}

/// Evaluates an `If-None-Match` style list: `*` or any weak match
pub fn any_weak_match(header: &str, current: &str) -> bool {
	any_match(header, current, weak_match)
}

fn any_match(header: &str, current: &str, matches: fn(&str, &str) -> bool) -> bool {
	let mut rest = header;
	loop {
		rest = rest.trim_matches(|c| c == ' ' || c == '\t');
		if rest.is_empty() {
			return false;
		}
		if let Some(after) = rest.strip_prefix(',') {
			rest = after;
			continue;
		}
		if rest.starts_with('*') {
			return true;
		}
		let Some((tag, remain)) = scan_etag(rest) else {
			return false;
		};
		if matches(tag, current) {
			return true;
		}
		rest = remain;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(r#""abc""#, Some((r#""abc""#, "")))]
	#[case(r#"W/"abc" , "x""#, Some((r#"W/"abc""#, r#" , "x""#)))]
	#[case(r#""""#, Some((r#""""#, "")))]
	#[case(r#""ab"#, None)]
	#[case(r#""a b""#, None)]
	#[case("abc", None)]
	#[case("", None)]
	fn test_scan_etag(#[case] input: &str, #[case] expected: Option<(&str, &str)>) {
		assert_eq!(scan_etag(input), expected);
	}

	#[rstest]
	#[case(r#""a""#, r#""a""#, true, true)]
	#[case(r#"W/"a""#, r#""a""#, false, true)]
	#[case(r#"W/"a""#, r#"W/"a""#, false, true)]
	#[case(r#""a""#, r#""b""#, false, false)]
	fn test_matching(
		#[case] a: &str,
		#[case] b: &str,
		#[case] strong: bool,
		#[case] weak: bool,
	) {
		assert_eq!(strong_match(a, b), strong);
		assert_eq!(weak_match(a, b), weak);
	}

	#[rstest]
	#[case(r#""x", "a""#, true)]
	#[case(r#",,"x",W/"a""#, false)]
	#[case("*", true)]
	#[case("garbage", false)]
	#[case("", false)]
	fn test_any_strong_match(#[case] header: &str, #[case] expected: bool) {
		assert_eq!(any_strong_match(header, r#""a""#), expected);
	}

	#[rstest]
	#[case(r#"W/"a""#, true)]
	#[case(r#""x" , W/"a""#, true)]
	#[case(r#""x""#, false)]
	#[case("*", true)]
	fn test_any_weak_match(#[case] header: &str, #[case] expected: bool) {
		assert_eq!(any_weak_match(header, r#""a""#), expected);
	}
}
