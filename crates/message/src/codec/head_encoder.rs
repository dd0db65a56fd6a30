//! Serialization of message heads.
//!
//! [`ResponseHeadEncoder`] writes the status line of a [`Response`], [`RequestHeadEncoder`]
//! the request line of a [`Request`]. Both then write one `name: value` line per header value,
//! repeating the name for every value instead of comma-joining them, and finish with the empty
//! line that ends the head. Bodies are left to the caller.

use std::io;
use std::io::Write;

use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;
use tracing::error;

use crate::protocol::{HeaderCollection, HttpMessage, Request, Response, SendError, ServerRequest};

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

/// Encoder for response heads implementing the [`Encoder`] trait.
#[derive(Debug, Default)]
pub struct ResponseHeadEncoder;

impl ResponseHeadEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Encoder<&Response> for ResponseHeadEncoder {
    type Error = SendError;

    /// Writes `HTTP/<version> <code> <reason>` followed by the header lines.
    fn encode(&mut self, item: &Response, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(INIT_HEADER_SIZE);
        write!(
            FastWrite(dst),
            "HTTP/{} {} {}\r\n",
            item.protocol_version(),
            item.status().as_str(),
            item.reason_phrase()
        )?;
        encode_headers(item.headers(), dst)
    }
}

/// Encoder for request heads implementing the [`Encoder`] trait.
#[derive(Debug, Default)]
pub struct RequestHeadEncoder;

impl RequestHeadEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Encoder<&Request> for RequestHeadEncoder {
    type Error = SendError;

    /// Writes `<method> <request-target> HTTP/<version>` followed by the header lines.
    fn encode(&mut self, item: &Request, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(INIT_HEADER_SIZE);
        write!(
            FastWrite(dst),
            "{} {} HTTP/{}\r\n",
            item.method().as_str(),
            item.request_target(),
            item.protocol_version()
        )?;
        encode_headers(item.headers(), dst)
    }
}

impl Encoder<&ServerRequest> for RequestHeadEncoder {
    type Error = SendError;

    fn encode(&mut self, item: &ServerRequest, dst: &mut BytesMut) -> Result<(), Self::Error> {
        <Self as Encoder<&Request>>::encode(self, item.request(), dst)
    }
}

fn encode_headers(headers: &HeaderCollection, dst: &mut BytesMut) -> Result<(), SendError> {
    for (name, values) in headers.iter() {
        for value in values {
            if value.contains(['\r', '\n']) {
                error!(header_name = name, "header value contains line break");
                return Err(SendError::invalid_header(format!("line break in value of {name:?}")));
            }
            dst.put_slice(name.as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(b"\r\n");
        }
    }
    dst.put_slice(b"\r\n");
    Ok(())
}

/// Writer appending to a [`BytesMut`] whose capacity was reserved up front.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
