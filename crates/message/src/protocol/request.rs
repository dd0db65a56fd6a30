//! HTTP request value.
//!
//! A [`Request`] adds a method, a [`Uri`] and a request target to the shared
//! [`MessageCore`]. The `Host` header follows the URI: it is filled in at construction when
//! missing, and recomputed by [`Request::with_uri`] unless the caller asks to keep it.

use http::Method;
use once_cell::sync::OnceCell;
use triomphe::Arc;

use crate::ensure;
use crate::protocol::message::DEFAULT_PROTOCOL_VERSION;
use crate::protocol::{HeaderValues, HttpMessage, MessageCore, MessageError, MethodPolicy};
use crate::stream::Stream;
use crate::uri::{IntoUri, Uri};

#[derive(Debug, Clone)]
struct RequestInner {
    core: MessageCore,
    method: Method,
    method_policy: MethodPolicy,
    uri: Uri,
    request_target: Option<String>,
    derived_target: OnceCell<String>,
}

/// An immutable HTTP request.
///
/// Cloning is cheap and yields a handle to the same instance, see [`Request::ptr_eq`].
#[derive(Debug, Clone)]
pub struct Request {
    inner: Arc<RequestInner>,
}

/// `host[:port]` of `uri`, or `None` when it has no host.
fn host_header(uri: &Uri) -> Option<String> {
    if uri.host().is_empty() {
        return None;
    }
    Some(match uri.port() {
        Some(port) => format!("{}:{port}", uri.host()),
        None => uri.host().to_string(),
    })
}

impl Request {
    /// Creates a request with the default [`MethodPolicy`], no headers besides `Host`, and an
    /// empty body.
    pub fn new(method: &str, uri: impl IntoUri) -> Result<Self, MessageError> {
        Self::builder().method(method).uri(uri).build()
    }

    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    fn update(&self, f: impl FnOnce(&mut RequestInner)) -> Self {
        let mut inner = self.inner.as_ref().clone();
        f(&mut inner);
        Self { inner: Arc::new(inner) }
    }

    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    pub fn method_policy(&self) -> MethodPolicy {
        self.inner.method_policy
    }

    /// Resolves `method` through this request's [`MethodPolicy`] and replaces it.
    pub fn with_method(&self, method: &str) -> Result<Self, MessageError> {
        let method = self.inner.method_policy.resolve(method)?;
        if method == self.inner.method {
            return Ok(self.clone());
        }
        Ok(self.update(|inner| inner.method = method))
    }

    pub fn uri(&self) -> &Uri {
        &self.inner.uri
    }

    /// Replaces the URI.
    ///
    /// The `Host` header is recomputed from the new URI unless `preserve_host` is set and a
    /// `Host` header already exists. A URI without host never touches the header. An equal URI
    /// that leaves the headers as they are returns the same instance.
    pub fn with_uri(&self, uri: impl IntoUri, preserve_host: bool) -> Result<Self, MessageError> {
        let uri = uri.into_uri()?;
        if Uri::ptr_eq(&uri, &self.inner.uri) {
            return Ok(self.clone());
        }

        let host = if preserve_host && self.has_header("host") { None } else { host_header(&uri) };
        if uri == self.inner.uri && host.as_deref().is_none_or(|host| self.host_is_first(host)) {
            return Ok(self.clone());
        }
        Ok(self.update(|inner| {
            if let Some(host) = host {
                inner.core = inner.core.replace_headers(inner.core.headers().with_first("host", host));
            }
            inner.uri = uri;
            inner.derived_target = OnceCell::new();
        }))
    }

    /// The explicit request target, or `path-or-"/"` followed by `?query` when the query is
    /// not empty.
    pub fn request_target(&self) -> &str {
        if let Some(target) = &self.inner.request_target {
            return target;
        }

        self.inner.derived_target.get_or_init(|| {
            let uri = &self.inner.uri;
            let path = if uri.path().is_empty() { "/" } else { uri.path() };
            match uri.query() {
                "" => path.to_string(),
                query => format!("{path}?{query}"),
            }
        })
    }

    pub fn with_request_target(&self, target: &str) -> Result<Self, MessageError> {
        ensure!(
            !target.is_empty() && !target.contains(char::is_whitespace),
            MessageError::invalid_request_target(target)
        );
        if self.inner.request_target.as_deref() == Some(target) {
            return Ok(self.clone());
        }
        Ok(self.update(|inner| inner.request_target = Some(target.to_string())))
    }

    /// `Host` is the first header and holds exactly `host`.
    fn host_is_first(&self, host: &str) -> bool {
        self.headers().iter().next().is_some_and(|(name, values)| name == "host" && values == [host])
    }

    /// Returns `true` when both values are handles to the same instance.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.inner, &other.inner)
    }
}

impl HttpMessage for Request {
    fn core(&self) -> &MessageCore {
        &self.inner.core
    }

    fn with_core(&self, core: MessageCore) -> Self {
        self.update(|inner| inner.core = core)
    }
}

/// Builder for [`Request`].
///
/// Errors are kept until [`RequestBuilder::build`], which either returns a complete request
/// or the first error.
#[derive(Debug)]
pub struct RequestBuilder {
    method: String,
    method_policy: MethodPolicy,
    uri: Result<Uri, MessageError>,
    headers: Vec<(String, HeaderValues)>,
    body: Option<Stream>,
    protocol_version: String,
    request_target: Option<String>,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self {
            method: Method::GET.to_string(),
            method_policy: MethodPolicy::default(),
            uri: Ok(Uri::default()),
            headers: Vec::new(),
            body: None,
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            request_target: None,
        }
    }
}

impl RequestBuilder {
    #[must_use]
    pub fn method(mut self, method: &str) -> Self {
        self.method = method.to_string();
        self
    }

    #[must_use]
    pub fn method_policy(mut self, method_policy: MethodPolicy) -> Self {
        self.method_policy = method_policy;
        self
    }

    #[must_use]
    pub fn uri(mut self, uri: impl IntoUri) -> Self {
        self.uri = uri.into_uri().map_err(MessageError::from);
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

    #[must_use]
    pub fn request_target(mut self, request_target: &str) -> Self {
        self.request_target = Some(request_target.to_string());
        self
    }

    pub fn build(self) -> Result<Request, MessageError> {
        let uri = self.uri?;
        let method = self.method_policy.resolve(&self.method)?;
        let mut core = MessageCore::new(&self.protocol_version, self.headers, self.body)?;

        if !core.headers().has("host")
            && let Some(host) = host_header(&uri)
        {
            core = core.replace_headers(core.headers().with_first("host", host));
        }

        let request = Request {
            inner: Arc::new(RequestInner {
                core,
                method,
                method_policy: self.method_policy,
                uri,
                request_target: None,
                derived_target: OnceCell::new(),
            }),
        };

        match self.request_target {
            Some(target) => request.with_request_target(&target),
            None => Ok(request),
        }
    }
}
