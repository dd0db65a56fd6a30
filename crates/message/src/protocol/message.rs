//! The protocol shared by every message type.
//!
//! [`MessageCore`] holds what requests and responses have in common: the protocol version,
//! the headers and the body. Each message type embeds one by value and implements
//! [`HttpMessage`], which provides the getters and the copy-on-write `with_*` operations on
//! top of [`HttpMessage::core`] and [`HttpMessage::with_core`].
//!
//! A `with_*` call whose value would not change anything returns a clone of the receiver,
//! which for every message type is a handle to the same instance. Otherwise a new message is
//! built where only the touched field differs and the other fields are shared.

use http::{HeaderName, HeaderValue};
use once_cell::sync::OnceCell;

use crate::ensure;
use crate::protocol::{HeaderCollection, HeaderValues, MessageError};
use crate::stream::Stream;

/// Protocol version used when none is given.
pub const DEFAULT_PROTOCOL_VERSION: &str = "1.1";

/// Protocol version, headers and body of a message.
#[derive(Debug, Clone)]
pub struct MessageCore {
    protocol_version: String,
    headers: HeaderCollection,
    body: OnceCell<Stream>,
}

impl Default for MessageCore {
    fn default() -> Self {
        Self {
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            headers: HeaderCollection::new(),
            body: OnceCell::new(),
        }
    }
}

impl MessageCore {
    /// Validates and normalizes the parts of a message.
    ///
    /// Header names are folded to lowercase and values to sequences; names folding to the
    /// same key are merged and names without values are dropped.
    pub fn new<I, N, V>(protocol_version: &str, headers: I, body: Option<Stream>) -> Result<Self, MessageError>
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: Into<HeaderValues>,
    {
        check_protocol_version(protocol_version)?;

        let mut normalized = Vec::new();
        for (name, values) in headers {
            let name = name.as_ref();
            let values = normalize_values(name, values.into())?;
            if !values.as_slice().is_empty() {
                normalized.push((name.to_string(), values));
            }
        }

        let body = match body {
            Some(body) => OnceCell::with_value(body),
            None => OnceCell::new(),
        };

        Ok(Self { protocol_version: protocol_version.to_string(), headers: normalized.into_iter().collect(), body })
    }

    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    pub fn headers(&self) -> &HeaderCollection {
        &self.headers
    }

    /// The body; an empty stream is created on first access when none was supplied.
    pub fn body(&self) -> &Stream {
        self.body.get_or_init(Stream::empty)
    }

    #[must_use]
    pub(crate) fn replace_headers(&self, headers: HeaderCollection) -> Self {
        Self { headers, ..self.clone() }
    }
}

/// Accepts `digit` or `digit "." digit`, e.g. `1.1`, `2` or `2.0`.
fn check_protocol_version(version: &str) -> Result<(), MessageError> {
    let valid = match version.as_bytes() {
        [major] => major.is_ascii_digit(),
        [major, b'.', minor] => major.is_ascii_digit() && minor.is_ascii_digit(),
        _ => false,
    };
    ensure!(valid, MessageError::invalid_protocol_version(version));
    Ok(())
}

/// Checks the header name is a token and trims and checks every value.
fn normalize_values(name: &str, values: HeaderValues) -> Result<HeaderValues, MessageError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| MessageError::invalid_header(format!("invalid name {name:?}: {e}")))?;

    let mut normalized = Vec::with_capacity(values.as_slice().len());
    for value in values.into_vec() {
        let value = value.trim_matches([' ', '\t']);
        HeaderValue::from_bytes(value.as_bytes())
            .map_err(|e| MessageError::invalid_header(format!("invalid value {value:?} for {name:?}: {e}")))?;
        normalized.push(value.to_string());
    }
    Ok(HeaderValues::from(normalized))
}

/// Read access and copy-on-write updates shared by requests and responses.
pub trait HttpMessage: Clone {
    fn core(&self) -> &MessageCore;

    /// Returns a message equal to `self` except for its core.
    #[must_use]
    fn with_core(&self, core: MessageCore) -> Self;

    fn protocol_version(&self) -> &str {
        self.core().protocol_version()
    }

    fn with_protocol_version(&self, version: &str) -> Result<Self, MessageError> {
        if self.core().protocol_version == version {
            return Ok(self.clone());
        }
        check_protocol_version(version)?;
        Ok(self.with_core(MessageCore { protocol_version: version.to_string(), ..self.core().clone() }))
    }

    fn headers(&self) -> &HeaderCollection {
        self.core().headers()
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers().has(name)
    }

    /// All values of `name`, in any casing; empty when absent.
    fn header(&self, name: &str) -> &[String] {
        self.headers().get(name)
    }

    /// The values of `name` joined with `", "`.
    fn header_line(&self, name: &str) -> String {
        self.headers().line(name)
    }

    /// Replaces every value of `name`. An empty sequence removes the header.
    fn with_header(&self, name: &str, values: impl Into<HeaderValues>) -> Result<Self, MessageError> {
        let values = normalize_values(name, values.into())?;
        if values.as_slice().is_empty() {
            return Ok(self.without_header(name));
        }
        let headers = self.headers();
        if headers.has(name) && headers.get(name) == values.as_slice() {
            return Ok(self.clone());
        }
        Ok(self.with_core(self.core().replace_headers(headers.with(name, values))))
    }

    /// Appends values to `name`, creating it when absent.
    fn with_added_header(&self, name: &str, values: impl Into<HeaderValues>) -> Result<Self, MessageError> {
        let values = normalize_values(name, values.into())?;
        if values.as_slice().is_empty() {
            return Ok(self.clone());
        }
        Ok(self.with_core(self.core().replace_headers(self.headers().with_added(name, values))))
    }

    fn without_header(&self, name: &str) -> Self {
        if !self.has_header(name) {
            return self.clone();
        }
        self.with_core(self.core().replace_headers(self.headers().without(name)))
    }

    fn body(&self) -> &Stream {
        self.core().body()
    }

    fn with_body(&self, body: impl Into<Stream>) -> Self {
        let body = body.into();
        if self.core().body.get().is_some_and(|current| Stream::ptr_eq(current, &body)) {
            return self.clone();
        }
        self.with_core(MessageCore { body: OnceCell::with_value(body), ..self.core().clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_normalizes_headers() {
        let core = MessageCore::new("1.1", [("X-Foo", vec!["a", " b "]), ("x-foo", vec!["c"])], None).unwrap();

        assert_eq!(core.headers().get("X-FOO"), ["a", "b", "c"]);
        assert_eq!(core.headers().to_array()[0].0, "x-foo");
    }

    #[test]
    fn new_rejects_invalid_headers() {
        let bad_name = MessageCore::new("1.1", [("Bad Name", "x")], None);
        assert!(matches!(bad_name, Err(MessageError::InvalidHeader { .. })));

        let injected = MessageCore::new("1.1", [("X-Foo", "a\r\nX-Injected: 1")], None);
        assert!(matches!(injected, Err(MessageError::InvalidHeader { .. })));
    }

    #[test]
    fn protocol_versions() {
        for version in ["1.0", "1.1", "2", "2.0", "3"] {
            assert!(check_protocol_version(version).is_ok(), "{version}");
        }
        for version in ["", "1.", "HTTP/1.1", "11", "a.b"] {
            assert!(check_protocol_version(version).is_err(), "{version}");
        }
    }

    #[test]
    fn body_is_materialized_once() {
        let core = MessageCore::default();
        let body = core.body();
        assert_eq!(body.size(), Some(0));
        assert!(Stream::ptr_eq(body, core.body()));
    }
}
