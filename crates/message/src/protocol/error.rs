use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("uri error: {source}")]
    UriError {
        #[from]
        source: UriError,
    },

    #[error("stream error: {source}")]
    StreamError {
        #[from]
        source: StreamError,
    },

    #[error("message error: {source}")]
    MessageError {
        #[from]
        source: MessageError,
    },

    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UriError {
    #[error("malformed uri: {reason}")]
    Malformed { reason: String },

    #[error("invalid scheme: {scheme:?}")]
    InvalidScheme { scheme: String },

    #[error("invalid host: {host:?}")]
    InvalidHost { host: String },

    #[error("invalid port {port}, must be between 1 and 65535")]
    InvalidPort { port: u32 },

    #[error("uri rejected: {reason}")]
    Rejected { reason: String },
}

impl UriError {
    pub fn malformed<S: ToString>(str: S) -> Self {
        Self::Malformed { reason: str.to_string() }
    }

    pub fn invalid_scheme<S: ToString>(scheme: S) -> Self {
        Self::InvalidScheme { scheme: scheme.to_string() }
    }

    pub fn invalid_host<S: ToString>(host: S) -> Self {
        Self::InvalidHost { host: host.to_string() }
    }

    pub fn rejected<S: ToString>(str: S) -> Self {
        Self::Rejected { reason: str.to_string() }
    }
}

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("stream is detached")]
    Detached,

    #[error("stream is not readable")]
    NotReadable,

    #[error("stream is not writable")]
    NotWritable,

    #[error("stream is not seekable")]
    NotSeekable,

    #[error("invalid stream mode: {mode:?}")]
    InvalidMode { mode: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl StreamError {
    pub fn invalid_mode<S: ToString>(mode: S) -> Self {
        Self::InvalidMode { mode: mode.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[derive(Error, Debug)]
pub enum MessageError {
    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid status code {code}, must be between 100 and 599")]
    InvalidStatus { code: u16 },

    #[error("invalid http method: {method:?}")]
    InvalidMethod { method: String },

    #[error("invalid protocol version: {version:?}")]
    InvalidProtocolVersion { version: String },

    #[error("invalid request target: {target:?}")]
    InvalidRequestTarget { target: String },

    #[error("uploaded file error: {reason}")]
    Upload { reason: String },

    #[error(transparent)]
    Uri(#[from] UriError),

    #[error(transparent)]
    Stream(#[from] StreamError),
}

impl MessageError {
    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_method<S: ToString>(method: S) -> Self {
        Self::InvalidMethod { method: method.to_string() }
    }

    pub fn invalid_protocol_version<S: ToString>(version: S) -> Self {
        Self::InvalidProtocolVersion { version: version.to_string() }
    }

    pub fn invalid_request_target<S: ToString>(target: S) -> Self {
        Self::InvalidRequestTarget { target: target.to_string() }
    }

    pub fn upload<S: ToString>(str: S) -> Self {
        Self::Upload { reason: str.to_string() }
    }
}

/// Errors raised while decoding a request from the wire.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The head grew past the header byte limit before it was complete.
    #[error("request head of {current_size} bytes is over the {max_size} bytes limit")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("request has more than {max_num} headers")]
    TooManyHeaders { max_num: usize },

    /// Malformed request line or header, including a `Host` that is not `host[:port]`.
    #[error("malformed request head: {reason}")]
    InvalidHeader { reason: String },

    #[error("unsupported http/1 minor version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("request target is not a valid uri: {source}")]
    InvalidUri {
        #[from]
        source: UriError,
    },

    /// Unparsable, conflicting or over-limit `Content-Length`.
    #[error("bad content-length: {reason}")]
    InvalidContentLength { reason: String },

    /// A framing the decoder does not handle, or a body its media type cannot decode.
    #[error("undecodable body: {reason}")]
    InvalidBody { reason: String },

    /// The decoded parts do not make a valid [`Request`](crate::protocol::Request).
    #[error("decoded request is invalid: {source}")]
    InvalidMessage {
        #[from]
        source: MessageError,
    },

    /// Transport failure surfaced through a framed reader.
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }
}

/// Errors raised while encoding a message head.
#[derive(Error, Debug)]
pub enum SendError {
    /// A header value that would break the head framing.
    #[error("header cannot be encoded: {reason}")]
    InvalidHeader { reason: String },

    /// Writing the head into the buffer failed.
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_errors_lift_into_http_error() {
        let from_io = ParseError::from(io::Error::other("connection reset"));
        assert!(matches!(from_io, ParseError::Io { .. }));

        let from_uri = ParseError::from(UriError::invalid_host("bad host"));
        assert_eq!(from_uri.to_string(), "request target is not a valid uri: invalid host: \"bad host\"");

        let error = HttpError::from(ParseError::invalid_content_length("body size 9 exceed the limit 4"));
        assert!(matches!(error, HttpError::RequestError { source: ParseError::InvalidContentLength { .. } }));
    }
}
