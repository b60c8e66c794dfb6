//! Outgoing HTTP response value, its builder and cookies.
//!
//! Build a [`Response`] with a shortcut or with [`Response::builder()`]. A
//! built response never changes. [`Response::modify`] hands a builder seeded
//! from the response to a closure and returns what it builds.

use std::fmt;
use std::path::Path;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::{StatusCode, Version, header};
use http_body_util::Full;
use tracing::trace;

use crate::error::Result;
use crate::message::{Head, Message, Sealed};
use crate::query::raw_encode;
use crate::stream::{Body, OpenMode, Stream};

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseBuilder::bytes`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentType {
    Csv,          // text/csv
    EventStream,  // text/event-stream  (SSE)
    FormData,     // application/x-www-form-urlencoded
    Html,         // text/html; charset=utf-8
    Json,         // application/json; charset=utf-8
    MsgPack,      // application/msgpack
    OctetStream,  // application/octet-stream  (binary / file download)
    Pdf,          // application/pdf
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv         => "text/csv",
            Self::EventStream => "text/event-stream",
            Self::FormData    => "application/x-www-form-urlencoded",
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json; charset=utf-8",
            Self::MsgPack     => "application/msgpack",
            Self::OctetStream => "application/octet-stream",
            Self::Pdf         => "application/pdf",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }
}

// ── Cookie ───────────────────────────────────────────────────────────────────

/// A cookie to send with `Set-Cookie`.
///
/// A response holds at most one cookie per `(name, path, domain)`. The value
/// is stored percent-encoded and decoded on read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    expires: Option<DateTime<Utc>>,
    path: String,
    domain: String,
    secure: bool,
    http_only: bool,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: &str) -> Self {
        Self {
            name: name.into(),
            value: raw_encode(value),
            expires: None,
            path: String::new(),
            domain: String::new(),
            secure: false,
            http_only: false,
        }
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    #[must_use]
    pub fn expires(mut self, at: DateTime<Utc>) -> Self {
        self.expires = Some(at);
        self
    }

    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn raw_value(&self) -> &str { &self.value }
    pub fn cookie_path(&self) -> &str { &self.path }
    pub fn cookie_domain(&self) -> &str { &self.domain }
    pub fn expires_at(&self) -> Option<DateTime<Utc>> { self.expires }
    pub fn is_secure(&self) -> bool { self.secure }
    pub fn is_http_only(&self) -> bool { self.http_only }

    /// The decoded value.
    pub fn value(&self) -> String {
        percent_encoding::percent_decode_str(&self.value)
            .decode_utf8_lossy()
            .into_owned()
    }

    fn is(&self, name: &str, path: &str, domain: &str) -> bool {
        self.name == name && self.path == path && self.domain == domain
    }
}

/// The `Set-Cookie` header value.
impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(expires) = self.expires {
            write!(f, "; Expires={}", expires.format("%a, %d %b %Y %H:%M:%S GMT"))?;
        }
        if !self.path.is_empty() {
            write!(f, "; Path={}", self.path)?;
        }
        if !self.domain.is_empty() {
            write!(f, "; Domain={}", self.domain)?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        Ok(())
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// # Shortcuts (200 OK, no custom headers needed)
///
/// ```rust
/// use missive::{Response, StatusCode};
///
/// Response::json(r#"{"id":1}"#);
/// Response::text("hello");
/// Response::new(StatusCode::NO_CONTENT);
/// ```
///
/// # Builder (custom status or headers)
///
/// ```rust
/// use missive::{ContentType, Response, StatusCode};
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("Location", "/users/42")
///     .json(r#"{"id":42}"#);
///
/// Response::builder().bytes(ContentType::Xml, "<ok/>");
/// ```
/// Custom reason phrase carried as an extension on the `http::Response`
/// produced by [`Response::into_http`]. `http::Response` has no slot for one,
/// so servers that write reason phrases can pick it up from here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReasonPhrase(pub String);

#[derive(Clone, Debug)]
pub struct Response {
    pub(crate) status: StatusCode,
    pub(crate) reason: Option<String>,
    pub(crate) cookies: Vec<Cookie>,
    pub(crate) head: Head,
}

impl Response {
    /// Response with no body.
    pub fn new(status: StatusCode) -> Self {
        Self::builder().status(status).build()
    }

    /// `204 No Content`.
    pub fn empty() -> Self {
        Self::new(StatusCode::NO_CONTENT)
    }

    /// `200 OK` with `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// `200 OK` with `text/html; charset=utf-8`.
    pub fn html(body: impl Into<String>) -> Self {
        Self::builder().html(body)
    }

    /// `200 OK` with `application/json; charset=utf-8`.
    ///
    /// Pass bytes from your serialiser directly, e.g.
    /// `serde_json::to_vec(&val)?`.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::builder().json(body)
    }

    /// `301 Moved Permanently` to `location`.
    pub fn redirect(location: &str) -> Self {
        Self::builder()
            .status(StatusCode::MOVED_PERMANENTLY)
            .header("Location", location)
            .build()
    }

    /// `200 OK` streaming `stream`. `Content-Length` is set when the size is
    /// known.
    pub fn stream(stream: Stream, content_type: ContentType) -> Self {
        let mut builder = Self::builder().header("Content-Type", content_type.as_str());
        if let Some(size) = stream.size() {
            builder = builder.header("Content-Length", size.to_string());
        }
        builder.body(stream).build()
    }

    /// `200 OK` offering the file at `path` as an attachment named after it.
    pub fn download(path: impl AsRef<Path>, content_type: ContentType) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stream = Stream::open(path, OpenMode::Read)?;
        Ok(Self::stream(stream, content_type)
            .with_header("Content-Disposition", format!("attachment; filename=\"{file_name}\"")))
    }

    /// Builder for responses that need a custom status, headers or cookies.
    /// Defaults to `200 OK`.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder {
            status: StatusCode::OK,
            reason: None,
            cookies: Vec::new(),
            head: Head::default(),
        }
    }

    /// Builder seeded with every field of `self`.
    pub fn to_builder(&self) -> ResponseBuilder {
        ResponseBuilder {
            status: self.status,
            reason: self.reason.clone(),
            cookies: self.cookies.clone(),
            head: self.head.clone(),
        }
    }

    /// Applies a batch of edits to a copy of `self`.
    ///
    /// ```rust
    /// use missive::{Message, Response};
    ///
    /// let r = Response::text("ok");
    /// let tagged = r.modify(|b| b.header("X-A", "1").header("X-B", "2").header("X-C", "3"));
    ///
    /// assert!(tagged.has_header("x-c"));
    /// assert!(!r.has_header("x-a"));
    /// ```
    pub fn modify(&self, edit: impl FnOnce(ResponseBuilder) -> ResponseBuilder) -> Self {
        edit(self.to_builder()).build()
    }

    pub fn status(&self) -> StatusCode { self.status }

    /// The custom reason phrase if one was set, else the canonical phrase of
    /// the status, else an empty string.
    pub fn reason_phrase(&self) -> &str {
        self.reason
            .as_deref()
            .or_else(|| self.status.canonical_reason())
            .unwrap_or("")
    }

    /// Copy with `status` and its canonical reason phrase.
    #[must_use]
    pub fn with_status(&self, status: StatusCode) -> Self {
        Self { status, reason: None, ..self.clone() }
    }

    pub fn cookies(&self) -> &[Cookie] { &self.cookies }

    /// Decoded value of the cookie keyed by `(name, path, domain)`.
    pub fn cookie(&self, name: &str, path: &str, domain: &str) -> Option<String> {
        self.cookies.iter().find(|c| c.is(name, path, domain)).map(Cookie::value)
    }

    pub fn has_cookie(&self, name: &str, path: &str, domain: &str) -> bool {
        self.cookies.iter().any(|c| c.is(name, path, domain))
    }

    /// Converts into an `http` crate response with a fully buffered body and
    /// one `Set-Cookie` header per cookie. A custom reason phrase travels as a
    /// [`ReasonPhrase`] extension.
    pub fn into_http(self) -> Result<http::Response<Full<Bytes>>> {
        let mut builder = http::Response::builder()
            .status(self.status)
            .version(self.head.version);
        if let Some(reason) = &self.reason {
            builder = builder.extension(ReasonPhrase(reason.clone()));
        }
        for (name, values) in self.head.headers.iter() {
            for value in values {
                builder = builder.header(name, value.as_str());
            }
        }
        for cookie in &self.cookies {
            builder = builder.header(header::SET_COOKIE, cookie.to_string());
        }
        let body = match &self.head.body {
            Some(body) => body.contents()?,
            None => Bytes::new(),
        };
        trace!(status = %self.status, len = body.len(), "collected response body");
        Ok(builder.body(Full::new(body))?)
    }
}

impl Sealed for Response {
    fn head(&self) -> &Head { &self.head }
    fn head_mut(&mut self) -> &mut Head { &mut self.head }
}

impl Message for Response {}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`] or [`Response::to_builder()`].
/// Finish with [`build`](Self::build) or a typed body method.
#[derive(Debug)]
pub struct ResponseBuilder {
    status: StatusCode,
    reason: Option<String>,
    cookies: Vec<Cookie>,
    head: Head,
}

impl ResponseBuilder {
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn reason(mut self, reason: &str) -> Self {
        self.reason = Some(reason.to_owned());
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

    /// Adds `cookie`, replacing one with the same name, path and domain.
    pub fn cookie(mut self, cookie: Cookie) -> Self {
        match self.cookies.iter_mut().find(|c| c.is(&cookie.name, &cookie.path, &cookie.domain)) {
            Some(existing) => *existing = cookie,
            None => self.cookies.push(cookie),
        }
        self
    }

    pub fn clear_cookie(mut self, name: &str, path: &str, domain: &str) -> Self {
        self.cookies.retain(|c| !c.is(name, path, domain));
        self
    }

    pub fn clear_cookies(mut self) -> Self {
        self.cookies.clear();
        self
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.head.body = Some(body.into());
        self
    }

    pub fn build(self) -> Response {
        Response {
            status: self.status,
            reason: self.reason,
            cookies: self.cookies,
            head: self.head,
        }
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish(ContentType::Text, Bytes::from(body.into()))
    }

    /// Terminate with an HTML body (`text/html; charset=utf-8`).
    pub fn html(self, body: impl Into<String>) -> Response {
        self.finish(ContentType::Html, Bytes::from(body.into()))
    }

    /// Terminate with a JSON body (`application/json; charset=utf-8`).
    pub fn json(self, body: impl Into<Bytes>) -> Response {
        self.finish(ContentType::Json, body.into())
    }

    /// Terminate with a typed body. Use this for XML, binary, SSE, etc.
    pub fn bytes(self, content_type: ContentType, body: impl Into<Bytes>) -> Response {
        self.finish(content_type, body.into())
    }

    /// Terminate with no body (e.g. `204 No Content`, `301 Moved Permanently`).
    pub fn no_body(mut self) -> Response {
        self.head.body = None;
        self.head.headers.remove("Content-Length");
        self.build()
    }

    /// A `Content-Type` already set on the builder wins. An empty body means
    /// no body and no `Content-Length`.
    fn finish(mut self, content_type: ContentType, body: Bytes) -> Response {
        if !self.head.headers.contains("Content-Type") {
            self.head.headers.insert("Content-Type", content_type.as_str());
        }
        if body.is_empty() {
            return self.no_body();
        }
        self.head.headers.insert("Content-Length", body.len().to_string());
        self.body(body).build()
    }
}
