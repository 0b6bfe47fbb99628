//! Server push target extraction from HTML documents

use crate::config::contains_ci;
use scraper::{ElementRef, Html};
use std::path::Path;

/// Collects the resources an HTML page references that are worth pushing
///
/// Walks `<link href>`, `<img src>` and `<script src>` in document order.
/// Links with `rel` `preload` or `icon` are skipped, as are targets whose
/// extension is on the skip list and anything that is not an absolute
/// same-origin path. Duplicates are kept.
#[derive(Debug, Clone)]
pub struct PushExtractor {
	skip_extensions: Vec<String>,
}

impl PushExtractor {
	pub fn new<I, S>(skip_extensions: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			skip_extensions: skip_extensions.into_iter().map(Into::into).collect(),
		}
	}

	/// Ordered push targets of `html`
	///
	/// The parser recovers from malformed markup, so broken documents yield
	/// whatever targets could still be found.
	///
	/// # Example
	///
	/// ```rust
	/// use reinhardt_assets::PushExtractor;
	///
	/// let extractor = PushExtractor::new(["", ".png"]);
	/// let targets = extractor.extract(
	///     r#"<script src="/app.js"></script><img src="/hero.png"><img src="cdn.js">"#,
	/// );
	/// assert_eq!(targets, ["/app.js"]);
	/// ```
	pub fn extract(&self, html: &str) -> Vec<String> {
		let document = Html::parse_document(html);
		document
			.root_element()
			.descendants()
			.filter_map(ElementRef::wrap)
			.filter_map(|element| self.candidate(element))
			.collect()
	}

	fn candidate(&self, element: ElementRef<'_>) -> Option<String> {
		let element = element.value();
		let target = match element.name() {
			"link" => {
				if element.attr("rel").is_some_and(is_excluded_rel) {
					return None;
				}
				element.attr("href")?
			}
			"img" | "script" => element.attr("src")?,
			_ => return None,
		};

		let target = target.trim();
		if !target.starts_with('/') || target.starts_with("//") {
			return None;
		}
		if contains_ci(&self.skip_extensions, &target_extension(target)) {
			return None;
		}
		Some(target.to_string())
	}
}

/// Shorthand for [`PushExtractor::extract`]
pub fn extract_push_targets(html: &str, skip_extensions: &[String]) -> Vec<String> {
	PushExtractor::new(skip_extensions.iter().cloned()).extract(html)
}

fn is_excluded_rel(rel: &str) -> bool {
	rel.split_ascii_whitespace()
		.any(|token| token.eq_ignore_ascii_case("preload") || token.eq_ignore_ascii_case("icon"))
}

fn target_extension(target: &str) -> String {
	let path = target.split(['?', '#']).next().unwrap_or(target);
	Path::new(path)
		.extension()
		.map(|ext| format!(".{}", ext.to_string_lossy()))
		.unwrap_or_default()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::DEFAULT_PUSH_SKIP_EXTENSIONS;
	use rstest::{fixture, rstest};

	#[fixture]
	fn extractor() -> PushExtractor {
		PushExtractor::new(DEFAULT_PUSH_SKIP_EXTENSIONS.iter().copied())
	}

	#[rstest]
	fn test_preload_and_png_are_skipped(extractor: PushExtractor) {
		let html = r#"<html><head><link rel="stylesheet" href="/s.css"><link rel="preload" href="/p.js"></head><body><img src="/a.png"></body></html>"#;
		assert_eq!(extractor.extract(html), ["/s.css"]);
	}

	#[rstest]
	fn test_document_order_and_duplicates(extractor: PushExtractor) {
		let html = r#"<script src="/a.js"></script><p><img src="/b.svg"></p><script src="/a.js"></script>"#;
		assert_eq!(extractor.extract(html), ["/a.js", "/b.svg", "/a.js"]);
	}

	#[rstest]
	#[case(r#"<link rel="ICON" href="/favicon.ico">"#)]
	#[case(r#"<link rel="shortcut icon" href="/favicon.ico">"#)]
	#[case(r#"<script src="js/relative.js"></script>"#)]
	#[case(r#"<script src="//cdn.example.com/x.js"></script>"#)]
	#[case(r#"<script src="https://cdn.example.com/x.js"></script>"#)]
	#[case(r#"<link rel="stylesheet" href="/">"#)]
	#[case(r#"<img src="/robots.txt?x=1">"#)]
	#[case(r#"<script>inline()</script>"#)]
	fn test_excluded_targets(extractor: PushExtractor, #[case] html: &str) {
		assert!(extractor.extract(html).is_empty());
	}

	#[rstest]
	fn test_query_does_not_hide_extension(extractor: PushExtractor) {
		let html = r#"<link rel="stylesheet" href="/app.css?v=3"><img src="/x.WEBP#frag">"#;
		assert_eq!(extractor.extract(html), ["/app.css?v=3"]);
	}

	#[rstest]
	fn test_malformed_markup_is_tolerated(extractor: PushExtractor) {
		let html = r#"<html><body><div><script src="/late.js"></script><img src="/x.gif""#;
		assert_eq!(extractor.extract(html), ["/late.js"]);
	}
}
