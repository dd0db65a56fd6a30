//! Decoding raw HTTP/1.x requests into [`ServerRequest`]s.
//!
//! The decoder parses the request head with `httparse`, waits until the whole
//! `Content-Length` body is buffered, and then builds a [`ServerRequest`] with:
//!
//! - an absolute [`Uri`] rebuilt from the `Host` header for origin-form targets
//! - query parameters decoded from the URI query
//! - cookie parameters from the `Cookie` header
//! - server parameters describing the request line
//! - a parsed body for `application/x-www-form-urlencoded` and `application/json` payloads
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum header size: 8KB
//! - Maximum body size: 8MB by default, see [`RequestDecoder::max_body_size`]
//! - Chunked request bodies are not supported

use bytes::{Buf, Bytes, BytesMut};
use httparse::{Error, Status};
use serde_json::{Map, Value};
use tokio_util::codec::Decoder;
use tracing::{debug, trace};

use crate::ensure;
use crate::protocol::{HttpMessage, MethodPolicy, Params, ParseError, Request, ServerRequest};
use crate::uri::{Uri, UriValidator};

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire header section
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Default maximum size in bytes of a `Content-Length` body
pub const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Owned copy of a parsed request head.
struct RawHead {
    method: String,
    target: String,
    version: &'static str,
    headers: Vec<(String, String)>,
    body_offset: usize,
}

impl RawHead {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)).map(|(_, value)| value.as_str())
    }

    fn content_length(&self, max_body_size: usize) -> Result<usize, ParseError> {
        ensure!(
            self.header("transfer-encoding").is_none(),
            ParseError::invalid_body("transfer-encoding bodies are not supported")
        );

        let mut lengths = self
            .headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case("content-length"))
            .map(|(_, value)| value.trim().parse::<usize>().map_err(|e| ParseError::invalid_content_length(e.to_string())));

        let Some(length) = lengths.next().transpose()? else {
            return Ok(0);
        };
        for other in lengths {
            ensure!(other? == length, ParseError::invalid_content_length("conflicting content-length headers"));
        }
        ensure!(
            length <= max_body_size,
            ParseError::invalid_content_length(format!("body size {length} exceed the limit {max_body_size}"))
        );
        Ok(length)
    }
}

/// Decoder turning raw request bytes into [`ServerRequest`]s.
#[derive(Debug, Clone)]
pub struct RequestDecoder {
    scheme: String,
    validator: UriValidator,
    method_policy: MethodPolicy,
    max_body_size: usize,
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestDecoder {
    pub fn new() -> Self {
        Self {
            scheme: "http".to_string(),
            validator: UriValidator::default(),
            method_policy: MethodPolicy::default(),
            max_body_size: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Scheme used when rebuilding absolute URIs from origin-form targets.
    #[must_use]
    pub fn scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_ascii_lowercase();
        self
    }

    #[must_use]
    pub fn validator(mut self, validator: UriValidator) -> Self {
        self.validator = validator;
        self
    }

    #[must_use]
    pub fn method_policy(mut self, method_policy: MethodPolicy) -> Self {
        self.method_policy = method_policy;
        self
    }

    /// Largest `Content-Length` accepted; longer bodies are rejected before any buffering.
    #[must_use]
    pub fn max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    fn parse_head(src: &[u8]) -> Result<Option<RawHead>, ParseError> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut req = httparse::Request::new(&mut headers);

        let parsed_result = req.parse(src).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            e => ParseError::invalid_header(e.to_string()),
        });

        let body_offset = match parsed_result? {
            Status::Complete(body_offset) => body_offset,
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                return Ok(None);
            }
        };
        trace!(header_size = body_offset, "parsed request head");
        ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

        let version = match req.version {
            Some(0) => "1.0",
            Some(1) => "1.1",
            // only http/1.x heads can be parsed here
            v => return Err(ParseError::InvalidVersion(v)),
        };

        let method = req.method.ok_or_else(|| ParseError::invalid_header("missing method"))?;
        let target = req.path.ok_or_else(|| ParseError::invalid_header("missing request target"))?;

        let mut owned_headers = Vec::with_capacity(req.headers.len());
        for header in req.headers.iter() {
            let value = std::str::from_utf8(header.value)
                .map_err(|_e| ParseError::invalid_header(format!("non utf-8 value for {}", header.name)))?;
            owned_headers.push((header.name.to_string(), value.to_string()));
        }

        Ok(Some(RawHead {
            method: method.to_string(),
            target: target.to_string(),
            version,
            headers: owned_headers,
            body_offset,
        }))
    }

    fn build(&self, head: &RawHead, body: Bytes) -> Result<ServerRequest, ParseError> {
        let host = head.header("host");
        let uri = match host {
            Some(host) if head.target.starts_with('/') => {
                // only `host[:port]` may be spliced in front of the target
                ensure!(
                    !host.is_empty() && !host.contains(['/', '?', '#', '@']),
                    ParseError::invalid_header(format!("invalid host header {host:?}"))
                );
                Uri::parse_with(&format!("{}://{host}{}", self.scheme, head.target), &self.validator)?
            }
            _ => Uri::parse_with(&head.target, &self.validator)?,
        };

        let mut builder = Request::builder()
            .method(&head.method)
            .method_policy(self.method_policy)
            .uri(&uri)
            .protocol_version(head.version)
            .body(body.clone());
        if !head.target.starts_with('/') {
            builder = builder.request_target(&head.target);
        }
        for (name, value) in &head.headers {
            builder = builder.header(name, value);
        }
        let request = builder.build()?;

        let mut server_params = Params::new();
        server_params.insert("REQUEST_METHOD".to_string(), head.method.clone());
        server_params.insert("REQUEST_URI".to_string(), head.target.clone());
        server_params.insert("SERVER_PROTOCOL".to_string(), format!("HTTP/{}", head.version));
        if let Some(host) = host {
            server_params.insert("HTTP_HOST".to_string(), host.to_string());
        }
        if !uri.query().is_empty() {
            server_params.insert("QUERY_STRING".to_string(), uri.query().to_string());
        }
        if !body.is_empty() {
            server_params.insert("CONTENT_LENGTH".to_string(), body.len().to_string());
        }

        let parsed_body = parse_body(request.header_line("content-type").as_str(), &body)?;

        Ok(ServerRequest::new(request, server_params)
            .with_query_params(parse_query(uri.query()))
            .with_cookie_params(parse_cookies(&head.headers))
            .with_parsed_body(parsed_body))
    }
}

fn parse_query(query: &str) -> Params {
    match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
        Ok(pairs) => pairs.into_iter().collect(),
        Err(e) => {
            debug!(cause = %e, query, "ignore undecodable query string");
            Params::new()
        }
    }
}

fn parse_cookies(headers: &[(String, String)]) -> Params {
    headers
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case("cookie"))
        .flat_map(|(_, value)| value.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            let value = value.trim();
            let value = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')).unwrap_or(value);
            (!name.is_empty()).then(|| (name.to_string(), value.to_string()))
        })
        .collect()
}

fn parse_body(content_type: &str, body: &[u8]) -> Result<Option<Value>, ParseError> {
    if body.is_empty() {
        return Ok(None);
    }

    let media_type = content_type.split(';').next().unwrap_or_default().trim();
    if media_type.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_bytes(body).map_err(|e| ParseError::invalid_body(e.to_string()))?;
        let fields: Map<String, Value> = pairs.into_iter().map(|(key, value)| (key, Value::String(value))).collect();
        return Ok(Some(Value::Object(fields)));
    }
    if media_type.eq_ignore_ascii_case("application/json") {
        let value = serde_json::from_slice(body).map_err(|e| ParseError::invalid_body(e.to_string()))?;
        return Ok(Some(value));
    }
    Ok(None)
}

impl Decoder for RequestDecoder {
    type Item = ServerRequest;
    type Error = ParseError;

    /// Attempts to decode one request from the buffer.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(request))` once the head and the whole body are buffered; those bytes are
    ///   consumed from `src`
    /// - `Ok(None)` if more data is needed
    /// - `Err(ParseError)` if the bytes are not a valid request
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Minimum valid HTTP request needs at least "GET / HTTP/1.1\r\n\r\n"
        if src.len() < 14 {
            return Ok(None);
        }

        let Some(head) = Self::parse_head(src)? else {
            return Ok(None);
        };

        let content_length = head.content_length(self.max_body_size)?;
        let total = head
            .body_offset
            .checked_add(content_length)
            .ok_or_else(|| ParseError::invalid_content_length(format!("body size {content_length} overflows")))?;
        if src.len() < total {
            trace!(buffered = src.len(), expected = total, "wait for request body");
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(head.body_offset);
        let body = src.split_to(content_length).freeze();
        self.build(&head, body).map(Some)
    }
}
