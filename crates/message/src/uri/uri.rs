//! RFC 3986 URI value.
//!
//! A [`Uri`] is parsed once into seven components, each stored already normalized: scheme
//! and host lowercased, path/query/fragment/user-info percent-encoded, and the port dropped
//! whenever it is the default port of the scheme. `with_*` methods return a new `Uri`, or a
//! handle to the same one when the normalized component would not change.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use once_cell::sync::OnceCell;
use triomphe::Arc;

use crate::ensure;
use crate::protocol::UriError;
use crate::uri::UriValidator;
use crate::uri::encode::{Component, encode, is_escape, is_sub_delim, is_unreserved};

/// Returns the registered default port of `scheme`.
pub fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        "ftp" => Some(21),
        "ftps" => Some(990),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct UriParts {
    scheme: String,
    user_info: String,
    host: String,
    port: Option<u16>,
    path: String,
    query: String,
    fragment: String,
}

impl UriParts {
    fn parse(input: &str) -> Result<Self, UriError> {
        let (rest, fragment) = match input.split_once('#') {
            Some((rest, fragment)) => (rest, fragment),
            None => (input, ""),
        };
        let (rest, query) = match rest.split_once('?') {
            Some((rest, query)) => (rest, query),
            None => (rest, ""),
        };

        let (scheme, rest) = match rest.find([':', '/']) {
            Some(index) if rest.as_bytes()[index] == b':' && is_scheme(&rest[..index]) => {
                (rest[..index].to_ascii_lowercase(), &rest[index + 1..])
            }
            _ => (String::new(), rest),
        };

        let mut parts = UriParts { scheme, ..UriParts::default() };

        let path = match rest.strip_prefix("//") {
            Some(after) => {
                let end = after.find('/').unwrap_or(after.len());
                let (authority, path) = after.split_at(end);
                parts.parse_authority(authority, path)?;
                path
            }
            None => rest,
        };

        parts.path = encode(path, Component::Path).into_owned();
        parts.query = encode(query, Component::Query).into_owned();
        parts.fragment = encode(fragment, Component::Query).into_owned();
        Ok(parts)
    }

    fn parse_authority(&mut self, authority: &str, path: &str) -> Result<(), UriError> {
        if authority.is_empty() {
            // `file:///etc/hosts` style, an empty authority is only allowed before a path
            ensure!(!path.is_empty(), UriError::malformed("authority marker without host"));
            return Ok(());
        }

        let (user_info, host_port) = match authority.rfind('@') {
            Some(index) => (&authority[..index], &authority[index + 1..]),
            None => ("", authority),
        };

        let (host, port) = split_host_port(host_port)?;
        ensure!(!host.is_empty(), UriError::malformed(format!("authority {authority:?} has no host")));

        self.user_info = encode(user_info, Component::UserInfo).into_owned();
        self.host = normalize_host(host)?;
        self.port = match port {
            Some(port) if !port.is_empty() => elide_port(&self.scheme, parse_port(port)?),
            _ => None,
        };
        Ok(())
    }

    fn authority(&self) -> String {
        if self.host.is_empty() {
            return String::new();
        }

        let mut authority = String::with_capacity(self.user_info.len() + self.host.len() + 7);
        if !self.user_info.is_empty() {
            authority.push_str(&self.user_info);
            authority.push('@');
        }
        authority.push_str(&self.host);
        if let Some(port) = self.port {
            authority.push(':');
            authority.push_str(&port.to_string());
        }
        authority
    }

    fn compose(&self) -> String {
        let authority = self.authority();
        let mut uri = String::with_capacity(
            self.scheme.len() + authority.len() + self.path.len() + self.query.len() + self.fragment.len() + 6,
        );

        if !self.scheme.is_empty() {
            uri.push_str(&self.scheme);
            uri.push(':');
        }

        if !authority.is_empty() {
            uri.push_str("//");
            uri.push_str(&authority);
            if !self.path.is_empty() && !self.path.starts_with('/') {
                uri.push('/');
            }
            uri.push_str(&self.path);
        } else if self.path.starts_with("//") {
            uri.push('/');
            uri.push_str(self.path.trim_start_matches('/'));
        } else {
            uri.push_str(&self.path);
        }

        if !self.query.is_empty() {
            uri.push('?');
            uri.push_str(&self.query);
        }

        if !self.fragment.is_empty() {
            uri.push('#');
            uri.push_str(&self.fragment);
        }
        uri
    }
}

fn is_scheme(candidate: &str) -> bool {
    let mut bytes = candidate.bytes();
    bytes.next().is_some_and(|b| b.is_ascii_alphabetic())
        && bytes.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'))
}

fn normalize_scheme(scheme: &str) -> Result<String, UriError> {
    ensure!(scheme.is_empty() || is_scheme(scheme), UriError::invalid_scheme(scheme));
    Ok(scheme.to_ascii_lowercase())
}

fn split_host_port(host_port: &str) -> Result<(&str, Option<&str>), UriError> {
    if host_port.starts_with('[') {
        let end = host_port.find(']').ok_or_else(|| UriError::malformed("unterminated ip literal"))?;
        let (host, rest) = host_port.split_at(end + 1);
        return match rest {
            "" => Ok((host, None)),
            _ => match rest.strip_prefix(':') {
                Some(port) => Ok((host, Some(port))),
                None => Err(UriError::malformed(format!("unexpected {rest:?} after ip literal"))),
            },
        };
    }

    Ok(match host_port.rfind(':') {
        Some(index) => (&host_port[..index], Some(&host_port[index + 1..])),
        None => (host_port, None),
    })
}

fn normalize_host(host: &str) -> Result<String, UriError> {
    let bytes = host.as_bytes();
    let valid = match host.strip_prefix('[') {
        Some(literal) => literal
            .strip_suffix(']')
            .is_some_and(|inner| !inner.is_empty() && inner.bytes().all(|b| b.is_ascii_hexdigit() || matches!(b, b':' | b'.'))),
        None => (0..bytes.len()).all(|index| {
            let b = bytes[index];
            is_unreserved(b) || is_sub_delim(b) || is_escape(bytes, index)
        }),
    };
    ensure!(valid, UriError::invalid_host(host));
    Ok(host.to_ascii_lowercase())
}

fn parse_port(port: &str) -> Result<u16, UriError> {
    ensure!(port.bytes().all(|b| b.is_ascii_digit()), UriError::malformed(format!("invalid port {port:?}")));
    // digits only, so the parse can only overflow
    let value = port.parse::<u64>().unwrap_or(u64::MAX);
    check_port(u32::try_from(value).unwrap_or(u32::MAX))
}

fn check_port(port: u32) -> Result<u16, UriError> {
    match u16::try_from(port) {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(UriError::InvalidPort { port }),
    }
}

#[inline]
fn elide_port(scheme: &str, port: u16) -> Option<u16> {
    if default_port(scheme) == Some(port) { None } else { Some(port) }
}

#[derive(Debug)]
struct UriInner {
    parts: UriParts,
    rendered: OnceCell<String>,
}

/// An immutable, normalized URI.
///
/// Two `Uri`s are equal when their serializations are equal.
#[derive(Clone)]
pub struct Uri {
    inner: Arc<UriInner>,
}

impl Uri {
    /// Parses `input` after screening it with the default [`UriValidator`].
    pub fn parse(input: &str) -> Result<Self, UriError> {
        Self::parse_with(input, &UriValidator::default())
    }

    /// Parses `input` after screening it with `validator`.
    pub fn parse_with(input: &str, validator: &UriValidator) -> Result<Self, UriError> {
        validator.validate(input)?;
        Ok(Self::from_parts(UriParts::parse(input)?))
    }

    /// Starts building a `Uri` from explicit components.
    pub fn builder() -> UriBuilder {
        UriBuilder::default()
    }

    fn from_parts(parts: UriParts) -> Self {
        Self { inner: Arc::new(UriInner { parts, rendered: OnceCell::new() }) }
    }

    #[inline]
    fn parts(&self) -> &UriParts {
        &self.inner.parts
    }

    fn replace(&self, f: impl FnOnce(&mut UriParts)) -> Self {
        let mut parts = self.parts().clone();
        f(&mut parts);
        if parts == *self.parts() { self.clone() } else { Self::from_parts(parts) }
    }

    pub fn scheme(&self) -> &str {
        &self.parts().scheme
    }

    pub fn user_info(&self) -> &str {
        &self.parts().user_info
    }

    pub fn host(&self) -> &str {
        &self.parts().host
    }

    /// The explicit port; `None` when absent or equal to the scheme's default.
    pub fn port(&self) -> Option<u16> {
        self.parts().port
    }

    pub fn path(&self) -> &str {
        &self.parts().path
    }

    pub fn query(&self) -> &str {
        &self.parts().query
    }

    pub fn fragment(&self) -> &str {
        &self.parts().fragment
    }

    /// `[user-info "@"] host [":" port]`, or an empty string without a host.
    pub fn authority(&self) -> String {
        self.parts().authority()
    }

    pub fn with_scheme(&self, scheme: &str) -> Result<Self, UriError> {
        let scheme = normalize_scheme(scheme)?;
        Ok(self.replace(|parts| {
            parts.port = parts.port.and_then(|port| elide_port(&scheme, port));
            parts.scheme = scheme;
        }))
    }

    /// Sets the user-info from a user and an optional password.
    pub fn with_user_info(&self, user: &str, password: Option<&str>) -> Result<Self, UriError> {
        let mut user_info = encode(user, Component::User).into_owned();
        if let Some(password) = password.filter(|password| !password.is_empty()) {
            user_info.push(':');
            user_info.push_str(&encode(password, Component::UserInfo));
        }
        Ok(self.replace(|parts| parts.user_info = user_info))
    }

    pub fn with_host(&self, host: &str) -> Result<Self, UriError> {
        let host = if host.is_empty() { String::new() } else { normalize_host(host)? };
        Ok(self.replace(|parts| parts.host = host))
    }

    /// Sets or removes the port; a port equal to the scheme's default is dropped.
    pub fn with_port(&self, port: Option<u32>) -> Result<Self, UriError> {
        let port = port.map(check_port).transpose()?;
        Ok(self.replace(|parts| parts.port = port.and_then(|port| elide_port(&parts.scheme, port))))
    }

    pub fn with_path(&self, path: &str) -> Result<Self, UriError> {
        let path = encode(path, Component::Path);
        Ok(self.replace(|parts| parts.path = path.into_owned()))
    }

    pub fn with_query(&self, query: &str) -> Result<Self, UriError> {
        let query = encode(query, Component::Query);
        Ok(self.replace(|parts| parts.query = query.into_owned()))
    }

    pub fn with_fragment(&self, fragment: &str) -> Result<Self, UriError> {
        let fragment = encode(fragment, Component::Query);
        Ok(self.replace(|parts| parts.fragment = fragment.into_owned()))
    }

    /// Returns `true` when both values are handles to the same instance.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.inner, &other.inner)
    }

    /// The serialized form, computed once per instance.
    pub fn as_str(&self) -> &str {
        self.inner.rendered.get_or_init(|| self.parts().compose())
    }
}

impl Default for Uri {
    fn default() -> Self {
        Self::from_parts(UriParts::default())
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Uri").field(&self.as_str()).finish()
    }
}

impl PartialEq for Uri {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other) || self.as_str() == other.as_str()
    }
}

impl Eq for Uri {}

impl Hash for Uri {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl FromStr for Uri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for Uri {
    type Error = UriError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<String> for Uri {
    type Error = UriError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

/// Anything a request accepts in place of a [`Uri`]: a string to parse or an existing `Uri`.
pub trait IntoUri {
    fn into_uri(self) -> Result<Uri, UriError>;
}

impl IntoUri for Uri {
    fn into_uri(self) -> Result<Uri, UriError> {
        Ok(self)
    }
}

impl IntoUri for &Uri {
    fn into_uri(self) -> Result<Uri, UriError> {
        Ok(self.clone())
    }
}

impl IntoUri for &str {
    fn into_uri(self) -> Result<Uri, UriError> {
        Uri::parse(self)
    }
}

impl IntoUri for String {
    fn into_uri(self) -> Result<Uri, UriError> {
        Uri::parse(&self)
    }
}

impl IntoUri for &String {
    fn into_uri(self) -> Result<Uri, UriError> {
        Uri::parse(self)
    }
}

/// Builds a [`Uri`] from explicit components, applying the same normalization as the
/// `with_*` methods.
#[derive(Debug, Default)]
pub struct UriBuilder {
    scheme: String,
    user: String,
    password: Option<String>,
    host: String,
    port: Option<u32>,
    path: String,
    query: String,
    fragment: String,
}

impl UriBuilder {
    #[must_use]
    pub fn scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_string();
        self
    }

    #[must_use]
    pub fn user_info(mut self, user: &str, password: Option<&str>) -> Self {
        self.user = user.to_string();
        self.password = password.map(str::to_string);
        self
    }

    #[must_use]
    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u32) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    #[must_use]
    pub fn query(mut self, query: &str) -> Self {
        self.query = query.to_string();
        self
    }

    #[must_use]
    pub fn fragment(mut self, fragment: &str) -> Self {
        self.fragment = fragment.to_string();
        self
    }

    pub fn build(self) -> Result<Uri, UriError> {
        Uri::default()
            .with_scheme(&self.scheme)?
            .with_user_info(&self.user, self.password.as_deref())?
            .with_host(&self.host)?
            .with_port(self.port)?
            .with_path(&self.path)?
            .with_query(&self.query)?
            .with_fragment(&self.fragment)
    }
}
