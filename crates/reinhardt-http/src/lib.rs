//! # Reinhardt HTTP
//!
//! Request and response boundary types shared by the asset cache and the
//! connection adapter.
//!
//! ## Module Structure
//!
//! - [`request`] - Incoming request view (method, path, headers, transport facts)
//! - [`response`] - Outgoing response with a full or streaming [`Body`]
//! - [`middleware`] - The [`Handler`] trait
//! - [`push`] - Server push capability exposed by the transport
//! - [`error`] - Error types

pub mod error;
pub mod middleware;
pub mod push;
pub mod request;
pub mod response;

pub use error::{Error, Result};
pub use middleware::Handler;
pub use push::ServerPush;
pub use request::Request;
pub use response::{Body, BoxError, Response, StreamBody};
