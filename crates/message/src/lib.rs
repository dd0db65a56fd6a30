//! Immutable HTTP message values
//!
//! This crate models HTTP messages as values: a request or response is never changed in place.
//! Every `with_*` operation returns a new message that shares the untouched parts with the
//! original, and returns the very same instance when nothing changes.
//!
//! # Features
//!
//! - Case-insensitive, order-preserving header collections
//! - RFC 3986 URIs with percent-encoding normalization and default-port elision
//! - Seekable and forward-only body streams with an explicit detach lifecycle
//! - Requests, responses and server-side requests with uploaded files and attributes
//! - HTTP/1.x head encoding and request decoding on top of `tokio_util` codecs
//!
//! # Example
//!
//! ```
//! use micro_message::protocol::{HttpMessage, Request, ServerRequest};
//!
//! let request = Request::new("POST", "http://example.com/users?page=2").unwrap();
//! let request = request.with_header("Content-Type", "application/json").unwrap().with_body(r#"{"name":"ann"}"#);
//!
//! assert_eq!(request.header_line("content-type"), "application/json");
//! assert_eq!(request.body().to_string(), r#"{"name":"ann"}"#);
//!
//! let server_request = ServerRequest::from(request).with_attribute("user_id", 42);
//! assert_eq!(server_request.attribute("user_id"), Some(&serde_json::json!(42)));
//! ```
//!
//! # Architecture
//!
//! The crate is organized into several key modules:
//!
//! - [`protocol`]: headers, the [`protocol::HttpMessage`] trait and the message types
//! - [`uri`]: URI parsing, building and validation
//! - [`stream`]: message body streams
//! - [`codec`]: HTTP/1.x wire encoding and decoding
//!
//! ## Error Handling
//!
//! The crate uses custom error types that implement `std::error::Error`:
//!
//! - [`protocol::HttpError`]: Top-level error type
//! - [`protocol::UriError`]: URI parsing and validation errors
//! - [`protocol::StreamError`]: Stream state and IO errors
//! - [`protocol::MessageError`]: Invalid message values
//! - [`protocol::ParseError`]: Request decoding errors
//! - [`protocol::SendError`]: Head encoding errors
//!
//! # Limitations
//!
//! - HTTP/1.x only
//! - Request bodies must be delimited by `Content-Length`
//! - Maximum header size: 8KB
//! - Maximum number of headers: 64

pub mod codec;
pub mod protocol;
pub mod stream;
pub mod uri;

mod utils;
pub(crate) use utils::ensure;
