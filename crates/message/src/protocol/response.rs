//! HTTP response value.

use http::StatusCode;
use triomphe::Arc;

use crate::ensure;
use crate::protocol::message::DEFAULT_PROTOCOL_VERSION;
use crate::protocol::{HeaderValues, HttpMessage, MessageCore, MessageError};
use crate::stream::Stream;

#[derive(Debug, Clone)]
struct ResponseInner {
    core: MessageCore,
    status: StatusCode,
    reason: Option<String>,
}

/// An immutable HTTP response.
///
/// Without an explicit reason phrase, [`Response::reason_phrase`] falls back to the IANA
/// registered phrase of the status code, or an empty string for unregistered codes.
#[derive(Debug, Clone)]
pub struct Response {
    inner: Arc<ResponseInner>,
}

fn check_status(code: u16) -> Result<StatusCode, MessageError> {
    ensure!((100..600).contains(&code), MessageError::InvalidStatus { code });
    StatusCode::from_u16(code).map_err(|_e| MessageError::InvalidStatus { code })
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// A `200 OK` response with no headers and an empty body.
    pub fn new() -> Self {
        Self { inner: Arc::new(ResponseInner { core: MessageCore::default(), status: StatusCode::OK, reason: None }) }
    }

    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::default()
    }

    pub fn status(&self) -> StatusCode {
        self.inner.status
    }

    pub fn reason_phrase(&self) -> &str {
        match &self.inner.reason {
            Some(reason) => reason,
            None => self.inner.status.canonical_reason().unwrap_or(""),
        }
    }

    /// Replaces the status; an empty `reason` means the registered phrase of `code`.
    pub fn with_status(&self, code: u16, reason: &str) -> Result<Self, MessageError> {
        let status = check_status(code)?;
        let reason = (!reason.is_empty()).then(|| reason.to_string());
        if status == self.inner.status && reason == self.inner.reason {
            return Ok(self.clone());
        }

        let mut inner = self.inner.as_ref().clone();
        inner.status = status;
        inner.reason = reason;
        Ok(Self { inner: Arc::new(inner) })
    }

    /// Returns `true` when both values are handles to the same instance.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.inner, &other.inner)
    }
}

impl HttpMessage for Response {
    fn core(&self) -> &MessageCore {
        &self.inner.core
    }

    fn with_core(&self, core: MessageCore) -> Self {
        let mut inner = self.inner.as_ref().clone();
        inner.core = core;
        Self { inner: Arc::new(inner) }
    }
}

/// Builder for [`Response`]; nothing is validated before [`ResponseBuilder::build`].
#[derive(Debug)]
pub struct ResponseBuilder {
    status: u16,
    reason: String,
    headers: Vec<(String, HeaderValues)>,
    body: Option<Stream>,
    protocol_version: String,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            reason: String::new(),
            headers: Vec::new(),
            body: None,
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
        }
    }
}

impl ResponseBuilder {
    #[must_use]
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn reason(mut self, reason: &str) -> Self {
        self.reason = reason.to_string();
        self
    }

    /// Adds values for `name`; repeated names accumulate.
    #[must_use]
    pub fn header(mut self, name: &str, values: impl Into<HeaderValues>) -> Self {
        self.headers.push((name.to_string(), values.into()));
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Stream>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn protocol_version(mut self, protocol_version: &str) -> Self {
        self.protocol_version = protocol_version.to_string();
        self
    }

    pub fn build(self) -> Result<Response, MessageError> {
        let status = check_status(self.status)?;
        let core = MessageCore::new(&self.protocol_version, self.headers, self.body)?;
        let reason = (!self.reason.is_empty()).then_some(self.reason);
        Ok(Response { inner: Arc::new(ResponseInner { core, status, reason }) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_header_values_mean_absent() {
        let response = Response::builder().header("X-Empty", Vec::<String>::new()).build().unwrap();
        assert!(!response.has_header("x-empty"));

        let response = response.with_header("X-Foo", "bar").unwrap();
        let cleared = response.with_header("x-foo", Vec::<String>::new()).unwrap();
        assert!(!cleared.has_header("x-foo"));
        assert!(response.has_header("x-foo"));

        let untouched = cleared.with_header("X-Missing", Vec::<String>::new()).unwrap();
        assert!(Response::ptr_eq(&untouched, &cleared));
        assert!(!untouched.has_header("x-missing"));
    }

    #[test]
    fn default_is_ok() {
        let response = Response::new();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.reason_phrase(), "OK");
        assert_eq!(response.protocol_version(), "1.1");
        assert_eq!(response.body().to_string(), "");
    }

    #[test]
    fn reason_phrase_from_table() {
        let response = Response::new().with_status(404, "").unwrap();
        assert_eq!(response.status().as_u16(), 404);
        assert_eq!(response.reason_phrase(), "Not Found");

        let response = Response::new().with_status(418, "").unwrap();
        assert_eq!(response.reason_phrase(), "I'm a teapot");
    }

    #[test]
    fn explicit_reason_phrase() {
        let response = Response::new().with_status(404, "Gone-ish").unwrap();
        assert_eq!(response.reason_phrase(), "Gone-ish");

        let reset = response.with_status(404, "").unwrap();
        assert_eq!(reset.reason_phrase(), "Not Found");
    }

    #[test]
    fn unregistered_code_has_empty_phrase() {
        let response = Response::new().with_status(599, "").unwrap();
        assert_eq!(response.reason_phrase(), "");

        let response = Response::new().with_status(599, "Custom").unwrap();
        assert_eq!(response.reason_phrase(), "Custom");
    }

    #[test]
    fn status_range() {
        let response = Response::new();
        for code in [0, 99, 600, 999] {
            assert!(matches!(response.with_status(code, ""), Err(MessageError::InvalidStatus { .. })), "{code}");
        }
        assert!(response.with_status(100, "").is_ok());
        assert!(response.with_status(599, "").is_ok());
        assert!(matches!(Response::builder().status(700).build(), Err(MessageError::InvalidStatus { code: 700 })));
    }

    #[test]
    fn with_status_is_copy_on_write() {
        let response = Response::new();
        let not_found = response.with_status(404, "").unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert!(Response::ptr_eq(&not_found, &not_found.with_status(404, "").unwrap()));
        assert!(!Response::ptr_eq(&not_found, &not_found.with_status(404, "Nope").unwrap()));
    }

    #[test]
    fn builder() {
        let response = Response::builder()
            .status(201)
            .header("Location", "/items/1")
            .header("Set-Cookie", ["a=1", "b=2"])
            .body("{}")
            .protocol_version("2")
            .build()
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.header("location"), ["/items/1"]);
        assert_eq!(response.header("set-cookie"), ["a=1", "b=2"]);
        assert_eq!(response.body().to_string(), "{}");
        assert_eq!(response.protocol_version(), "2");
    }

    #[test]
    fn protocol_version_copy_on_write() {
        let response = Response::new();
        let http2 = response.with_protocol_version("2.0").unwrap();

        assert_eq!(http2.protocol_version(), "2.0");
        assert_eq!(response.protocol_version(), "1.1");
        assert!(Response::ptr_eq(&response, &response.with_protocol_version("1.1").unwrap()));
        assert!(response.with_protocol_version("HTTP/2").is_err());
    }

    #[test]
    fn with_body_replaces_only_body() {
        let response = Response::new().with_header("X-Foo", "bar").unwrap();
        let body = Stream::from("new body");
        let changed = response.with_body(body.clone());

        assert!(Stream::ptr_eq(changed.body(), &body));
        assert_eq!(response.body().to_string(), "");
        assert!(crate::protocol::HeaderCollection::ptr_eq(response.headers(), changed.headers()));
        assert!(Response::ptr_eq(&changed, &changed.with_body(body)));
    }
}
