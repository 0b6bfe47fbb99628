//! Error types surfaced by request handlers

use hyper::StatusCode;

/// Result alias for handler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors a [`Handler`](crate::Handler) may return instead of a response
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// No resource exists for the requested path
	#[error("not found: {0}")]
	NotFound(String),

	/// The request method is not supported by the handler
	#[error("method not allowed")]
	MethodNotAllowed,

	/// The transport refused or failed a server push
	#[error("server push failed: {0}")]
	Push(String),

	/// Any other failure while producing the response
	#[error("internal error: {0}")]
	Internal(String),
}

impl Error {
	/// Returns the HTTP status code this error maps to
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_http::Error;
	/// use hyper::StatusCode;
	///
	/// assert_eq!(Error::NotFound("/x".into()).status_code(), StatusCode::NOT_FOUND);
	/// assert_eq!(Error::Internal("boom".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
	/// ```
	pub fn status_code(&self) -> StatusCode {
		match self {
			Error::NotFound(_) => StatusCode::NOT_FOUND,
			Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
			Error::Push(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// Returns `true` for [`Error::NotFound`]
	pub fn is_not_found(&self) -> bool {
		matches!(self, Error::NotFound(_))
	}
}
