//! HTTP message abstractions.
//!
//! Every message type in this module is an immutable value. "Mutation" goes through `with_*`
//! methods that return a new value, sharing the unchanged parts with the original.
//!
//! # Architecture
//!
//! - **Headers** ([`headers`]): [`HeaderCollection`], the case-insensitive ordered multimap
//! - **Message protocol** ([`message`]): [`MessageCore`] and the [`HttpMessage`] trait shared
//!   by every message type
//! - **Requests** ([`request`], [`method`]): [`Request`], [`RequestBuilder`], [`MethodPolicy`]
//! - **Responses** ([`response`]): [`Response`], [`ResponseBuilder`]
//! - **Server requests** ([`server_request`], [`uploaded_file`]): [`ServerRequest`] and
//!   [`UploadedFile`]
//! - **Error Handling** ([`error`]): [`HttpError`] and the per-concern error types
//!
//! # Example
//!
//! ```
//! use micro_message::protocol::{HttpMessage, Request, Response};
//!
//! let request = Request::new("GET", "https://example.com:8080/search?q=rust").unwrap();
//! assert_eq!(request.header("Host"), ["example.com:8080"]);
//! assert_eq!(request.request_target(), "/search?q=rust");
//!
//! let json = request.with_header("Accept", "application/json").unwrap();
//! assert!(!request.has_header("accept"));
//! assert!(json.has_header("accept"));
//!
//! let response = Response::new().with_status(404, "").unwrap();
//! assert_eq!(response.reason_phrase(), "Not Found");
//! ```

mod headers;
pub use headers::HeaderCollection;
pub use headers::HeaderValues;

mod message;
pub use message::DEFAULT_PROTOCOL_VERSION;
pub use message::HttpMessage;
pub use message::MessageCore;

mod method;
pub use method::KNOWN_METHODS;
pub use method::MethodPolicy;

mod request;
pub use request::Request;
pub use request::RequestBuilder;

mod response;
pub use response::Response;
pub use response::ResponseBuilder;

mod server_request;
pub use server_request::Attributes;
pub use server_request::Params;
pub use server_request::ServerRequest;
pub use server_request::UploadedFiles;

mod uploaded_file;
pub use uploaded_file::UploadStatus;
pub use uploaded_file::UploadedFile;

mod error;
pub use error::HttpError;
pub use error::MessageError;
pub use error::ParseError;
pub use error::SendError;
pub use error::StreamError;
pub use error::UriError;
