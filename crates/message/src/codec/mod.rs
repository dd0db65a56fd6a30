//! Wire codecs for HTTP/1.x message heads.
//!
//! The message types in [`crate::protocol`] know nothing about the wire. This module bridges
//! them to bytes through the `tokio_util` codec traits:
//!
//! - [`RequestDecoder`]: turns raw request bytes into a [`ServerRequest`](crate::protocol::ServerRequest),
//!   waiting for the complete `Content-Length` body
//! - [`ResponseHeadEncoder`]: writes the status line and headers of a [`Response`](crate::protocol::Response)
//! - [`RequestHeadEncoder`]: writes the request line and headers of a [`Request`](crate::protocol::Request)
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use micro_message::codec::{RequestDecoder, ResponseHeadEncoder};
//! use micro_message::protocol::{HttpMessage, Response};
//! use tokio_util::codec::{Decoder, Encoder};
//!
//! let mut buf = BytesMut::from("GET /hello?name=world HTTP/1.1\r\nHost: localhost\r\n\r\n");
//! let request = RequestDecoder::new().decode(&mut buf).unwrap().unwrap();
//! assert_eq!(request.query_params()["name"], "world");
//!
//! let response = Response::builder().status(204).build().unwrap();
//! let mut out = BytesMut::new();
//! ResponseHeadEncoder::new().encode(&response, &mut out).unwrap();
//! assert_eq!(&out[..], b"HTTP/1.1 204 No Content\r\n\r\n");
//! ```

mod head_encoder;
mod request_decoder;

pub use head_encoder::RequestHeadEncoder;
pub use head_encoder::ResponseHeadEncoder;
pub use request_decoder::DEFAULT_MAX_BODY_BYTES;
pub use request_decoder::RequestDecoder;
