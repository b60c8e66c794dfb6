//! Client-side HTTP request value.
//!
//! A [`Request`] is immutable once built. Edits go through
//! [`Request::modify`] or the single-field `with_*` methods, both of which
//! return a new request.

use bytes::Bytes;
use http::{Method, Version};
use http_body_util::Full;
use tracing::debug;

use crate::config::RequestConfig;
use crate::error::{Error, Result};
use crate::headers::Headers;
use crate::message::{Head, Message, Sealed};
use crate::stream::Body;
use crate::uri::Uri;

/// An HTTP request: method, target URI and message head.
///
/// ```rust
/// use missive::{Message, Method, Request};
///
/// let req = Request::new(Method::GET, "https://example.com/users?page=2").unwrap();
/// assert_eq!(req.request_target(), "/users?page=2");
/// assert_eq!(req.header_line("host"), "example.com");
/// ```
#[derive(Clone, Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) target: Option<String>,
    pub(crate) uri: Uri,
    pub(crate) head: Head,
}

impl Request {
    /// Parses `target` and builds a request with the default configuration.
    pub fn new(method: Method, target: &str) -> Result<Self> {
        Self::builder().method(method).target(target).build()
    }

    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    /// Builder seeded with every field of `self`.
    pub fn to_builder(&self) -> RequestBuilder {
        RequestBuilder {
            method: self.method.clone(),
            target: None,
            request_target: self.target.clone(),
            uri: self.uri.clone(),
            head: self.head.clone(),
        }
    }

    /// Applies a batch of edits to a copy of `self`. The build rules run
    /// again on the result, so the edit can fail just like a fresh build.
    pub fn modify(&self, edit: impl FnOnce(RequestBuilder) -> RequestBuilder) -> Result<Self> {
        edit(self.to_builder()).build()
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }

    /// The host the request is addressed to, taken from its URI.
    pub fn host(&self) -> Option<&str> {
        self.uri.host().filter(|h| !h.is_empty())
    }

    /// The explicit request-target if one was set, otherwise the URI's
    /// origin form: its path (or `/`) followed by `?query` when present.
    pub fn request_target(&self) -> String {
        if let Some(target) = &self.target {
            return target.clone();
        }
        let path = match self.uri.path() {
            "" => "/",
            path => path,
        };
        match self.uri.query() {
            Some(query) => format!("{path}?{query}"),
            None => path.to_owned(),
        }
    }

    #[must_use]
    pub fn with_method(&self, method: Method) -> Self {
        Self { method, ..self.clone() }
    }

    /// Overrides the request-target, e.g. `*` or an absolute form.
    #[must_use]
    pub fn with_request_target(&self, target: &str) -> Self {
        Self { target: Some(target.to_owned()), ..self.clone() }
    }

    /// Copy addressed to `uri`.
    ///
    /// The `Host` header follows the new URI's host unless `preserve_host`
    /// is set and the request already carries a non-empty `Host`.
    #[must_use]
    pub fn with_uri(&self, uri: Uri, preserve_host: bool) -> Self {
        let mut next = Self { uri, ..self.clone() };
        if preserve_host && !next.head.headers.get_line("Host").is_empty() {
            return next;
        }
        if let Some(host) = host_header_value(&next.uri) {
            next.head.headers.insert("Host", host);
        }
        next
    }

    /// Converts into an `http` crate request with a fully buffered body.
    pub fn into_http(self) -> Result<http::Request<Full<Bytes>>> {
        let mut builder = http::Request::builder()
            .method(self.method)
            .version(self.head.version)
            .uri(self.uri.to_string());
        for (name, values) in self.head.headers.iter() {
            for value in values {
                builder = builder.header(name, value.as_str());
            }
        }
        let body = match &self.head.body {
            Some(body) => body.contents()?,
            None => Bytes::new(),
        };
        Ok(builder.body(Full::new(body))?)
    }
}

impl Sealed for Request {
    fn head(&self) -> &Head { &self.head }
    fn head_mut(&mut self) -> &mut Head { &mut self.head }
}

impl Message for Request {}

/// Adapts a request from the `http` ecosystem. Non-UTF-8 header bytes are
/// replaced lossily.
impl<B: Into<Body>> TryFrom<http::Request<B>> for Request {
    type Error = Error;

    fn try_from(req: http::Request<B>) -> Result<Self> {
        let (parts, body) = req.into_parts();
        let headers: Headers = parts
            .headers
            .iter()
            .map(|(name, value)| (name.as_str(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .collect();

        Request::builder()
            .method(parts.method)
            .uri(Uri::try_from(&parts.uri)?)
            .version(parts.version)
            .headers(headers)
            .body(body)
            .build()
    }
}

// ── RequestBuilder ────────────────────────────────────────────────────────────

/// Fluent builder for [`Request`].
///
/// Obtain via [`Request::builder()`] or [`Request::to_builder()`]. Defaults
/// to `GET /` over HTTP/1.1.
#[derive(Debug, Default)]
pub struct RequestBuilder {
    method: Method,
    target: Option<String>,
    request_target: Option<String>,
    uri: Uri,
    head: Head,
}

impl RequestBuilder {
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Target string to parse into the URI when the request is built.
    pub fn target(mut self, target: &str) -> Self {
        self.target = Some(target.to_owned());
        self
    }

    pub fn uri(mut self, uri: Uri) -> Self {
        self.target = None;
        self.uri = uri;
        self
    }

    /// Explicit request-target, independent of the URI.
    pub fn request_target(mut self, target: &str) -> Self {
        self.request_target = Some(target.to_owned());
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.head.version = version;
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.head.headers.insert(name, value);
        self
    }

    pub fn added_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.head.headers.append(name, value);
        self
    }

    pub fn without_header(mut self, name: &str) -> Self {
        self.head.headers.remove(name);
        self
    }

    /// Replaces the whole header collection.
    pub fn headers(mut self, headers: Headers) -> Self {
        self.head.headers = headers;
        self
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.head.body = Some(body.into());
        self
    }

    /// Builds with [`RequestConfig::default`].
    pub fn build(self) -> Result<Request> {
        self.build_with(&RequestConfig::default())
    }

    /// Builds the request.
    ///
    /// # Errors
    ///
    /// - Any [`Uri::parse`] error for the target or the `Host` header.
    /// - [`Error::InvalidHost`] if the host has characters outside
    ///   `[a-zA-Z0-9.\-_:\[\]]`.
    /// - [`Error::UntrustedHost`] if `config` does not trust the host.
    ///
    /// Validation applies to the host the URI ends up with. For an
    /// absolute-form target that is the target's own host; an existing `Host`
    /// header is kept as given and not checked.
    pub fn build_with(self, config: &RequestConfig) -> Result<Request> {
        let mut uri = match &self.target {
            Some(target) => Uri::parse(target)?,
            None => self.uri,
        };
        let mut head = self.head;

        if uri.host().is_none() {
            if let Some(value) = head.headers.first("Host").filter(|h| !h.is_empty()) {
                validate_host(value)?;
                let authority = Uri::parse(&format!("//{value}"))?;
                uri = uri.modify(|b| b.host(authority.host()).port(authority.raw_port()));
            }
        }

        if let Some(host) = uri.host().filter(|h| !h.is_empty()) {
            validate_host(host)?;
            config.check_host(host)?;
        }

        if !head.headers.contains("Host") {
            if let Some(value) = host_header_value(&uri) {
                head.headers.insert("Host", value);
            }
        }

        Ok(Request {
            method: self.method,
            target: self.request_target,
            uri,
            head,
        })
    }
}

/// `host[:port]` for the `Host` header, absent when the URI has no host.
fn host_header_value(uri: &Uri) -> Option<String> {
    let host = uri.host().filter(|h| !h.is_empty())?;
    Some(match uri.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    })
}

/// Accepts only `[a-zA-Z0-9.\-_:\[\]]+`.
pub(crate) fn validate_host(host: &str) -> Result<()> {
    let valid = !host.is_empty()
        && host
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_' | b':' | b'[' | b']'));
    if valid {
        return Ok(());
    }
    debug!(host, "rejected host");
    Err(Error::InvalidHost(host.to_owned()))
}
