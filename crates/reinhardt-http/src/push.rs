//! Server push capability
//!
//! Transports that can initiate pushes (HTTP/2 `PUSH_PROMISE`) attach an
//! implementation of [`ServerPush`] to each [`Request`](crate::Request).
//! Transports without push support leave it unset.

use hyper::HeaderMap;

/// Initiates a server push of `target` on the connection of the current request
pub trait ServerPush: Send + Sync {
	/// Pushes `target` (an absolute path) as a synthetic GET request carrying `headers`
	///
	/// # Errors
	///
	/// Returns an error if the peer disabled push or the stream could not be opened.
	fn push(&self, target: &str, headers: &HeaderMap) -> crate::Result<()>;
}
