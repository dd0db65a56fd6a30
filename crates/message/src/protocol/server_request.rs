//! Server-side view of an incoming request.
//!
//! A [`ServerRequest`] wraps a [`Request`] and adds what a server learns about it: server
//! parameters, cookies, query parameters, uploaded files, the parsed body and arbitrary
//! attributes set by the application. Every field is held in its own `Arc` so a `with_*`
//! call only allocates the field it replaces.

use std::collections::BTreeMap;

use http::Method;
use serde_json::Value;
use triomphe::Arc;

use crate::protocol::{HttpMessage, MessageCore, MessageError, Request, UploadedFile};
use crate::uri::{IntoUri, Uri};

/// String parameters keyed by name: server, cookie and query parameters.
pub type Params = BTreeMap<String, String>;

/// Uploaded files keyed by form field name.
pub type UploadedFiles = BTreeMap<String, UploadedFile>;

/// Application attributes keyed by name.
pub type Attributes = BTreeMap<String, Value>;

#[derive(Debug, Clone)]
struct ServerRequestInner {
    request: Request,
    server_params: Arc<Params>,
    cookie_params: Arc<Params>,
    query_params: Arc<Params>,
    uploaded_files: Arc<UploadedFiles>,
    parsed_body: Option<Arc<Value>>,
    attributes: Arc<Attributes>,
}

/// An immutable server request.
#[derive(Debug, Clone)]
pub struct ServerRequest {
    inner: Arc<ServerRequestInner>,
}

impl ServerRequest {
    pub fn new(request: Request, server_params: Params) -> Self {
        Self {
            inner: Arc::new(ServerRequestInner {
                request,
                server_params: Arc::new(server_params),
                cookie_params: Arc::new(Params::new()),
                query_params: Arc::new(Params::new()),
                uploaded_files: Arc::new(UploadedFiles::new()),
                parsed_body: None,
                attributes: Arc::new(Attributes::new()),
            }),
        }
    }

    fn update(&self, f: impl FnOnce(&mut ServerRequestInner)) -> Self {
        let mut inner = self.inner.as_ref().clone();
        f(&mut inner);
        Self { inner: Arc::new(inner) }
    }

    /// The wrapped request.
    pub fn request(&self) -> &Request {
        &self.inner.request
    }

    pub fn method(&self) -> &Method {
        self.inner.request.method()
    }

    pub fn with_method(&self, method: &str) -> Result<Self, MessageError> {
        self.with_request(self.inner.request.with_method(method)?)
    }

    pub fn uri(&self) -> &Uri {
        self.inner.request.uri()
    }

    pub fn with_uri(&self, uri: impl IntoUri, preserve_host: bool) -> Result<Self, MessageError> {
        self.with_request(self.inner.request.with_uri(uri, preserve_host)?)
    }

    pub fn request_target(&self) -> &str {
        self.inner.request.request_target()
    }

    pub fn with_request_target(&self, target: &str) -> Result<Self, MessageError> {
        self.with_request(self.inner.request.with_request_target(target)?)
    }

    fn with_request(&self, request: Request) -> Result<Self, MessageError> {
        if Request::ptr_eq(&request, &self.inner.request) {
            return Ok(self.clone());
        }
        Ok(self.update(|inner| inner.request = request))
    }

    pub fn server_params(&self) -> &Params {
        &self.inner.server_params
    }

    #[must_use]
    pub fn with_server_params(&self, params: Params) -> Self {
        if *self.inner.server_params == params {
            return self.clone();
        }
        self.update(|inner| inner.server_params = Arc::new(params))
    }

    pub fn cookie_params(&self) -> &Params {
        &self.inner.cookie_params
    }

    #[must_use]
    pub fn with_cookie_params(&self, params: Params) -> Self {
        if *self.inner.cookie_params == params {
            return self.clone();
        }
        self.update(|inner| inner.cookie_params = Arc::new(params))
    }

    pub fn query_params(&self) -> &Params {
        &self.inner.query_params
    }

    #[must_use]
    pub fn with_query_params(&self, params: Params) -> Self {
        if *self.inner.query_params == params {
            return self.clone();
        }
        self.update(|inner| inner.query_params = Arc::new(params))
    }

    pub fn uploaded_files(&self) -> &UploadedFiles {
        &self.inner.uploaded_files
    }

    #[must_use]
    pub fn with_uploaded_files(&self, files: UploadedFiles) -> Self {
        if *self.inner.uploaded_files == files {
            return self.clone();
        }
        self.update(|inner| inner.uploaded_files = Arc::new(files))
    }

    pub fn parsed_body(&self) -> Option<&Value> {
        self.inner.parsed_body.as_deref()
    }

    #[must_use]
    pub fn with_parsed_body(&self, body: Option<Value>) -> Self {
        if self.parsed_body() == body.as_ref() {
            return self.clone();
        }
        self.update(|inner| inner.parsed_body = body.map(Arc::new))
    }

    pub fn attributes(&self) -> &Attributes {
        &self.inner.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.inner.attributes.get(name)
    }

    #[must_use]
    pub fn with_attribute(&self, name: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        if self.attribute(name) == Some(&value) {
            return self.clone();
        }
        let mut attributes = self.inner.attributes.as_ref().clone();
        attributes.insert(name.to_string(), value);
        self.update(|inner| inner.attributes = Arc::new(attributes))
    }

    #[must_use]
    pub fn without_attribute(&self, name: &str) -> Self {
        if self.attribute(name).is_none() {
            return self.clone();
        }
        let mut attributes = self.inner.attributes.as_ref().clone();
        attributes.remove(name);
        self.update(|inner| inner.attributes = Arc::new(attributes))
    }

    /// Returns `true` when both values are handles to the same instance.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.inner, &other.inner)
    }
}

impl From<Request> for ServerRequest {
    fn from(request: Request) -> Self {
        Self::new(request, Params::new())
    }
}

impl HttpMessage for ServerRequest {
    fn core(&self) -> &MessageCore {
        self.inner.request.core()
    }

    fn with_core(&self, core: MessageCore) -> Self {
        let request = self.inner.request.with_core(core);
        self.update(|inner| inner.request = request)
    }
}
