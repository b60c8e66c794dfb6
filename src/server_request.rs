//! Server-side request: a [`Request`] plus everything the server knows about it.
//!
//! [`ServerRequest::from_server`] reads a CGI-style variable map
//! (`REQUEST_METHOD`, `HTTP_HOST`, `QUERY_STRING` ...) and produces the
//! request a handler works with. Nothing is read from process globals; the
//! caller decides where the variables come from.

use std::collections::BTreeMap;
use std::sync::Arc;

use http::Method;
use tracing::debug;

use crate::config::RequestConfig;
use crate::error::{Error, Result};
use crate::headers::Headers;
use crate::message::{Head, Message, Sealed, parse_version};
use crate::query::{form_decode, parse_query};
use crate::request::{Request, validate_host};
use crate::upload::UploadedFile;
use crate::uri::Uri;

/// Methods a `POST` may be re-labelled as through `X-HTTP-Method-Override`.
const OVERRIDABLE: &[&str] = &["PUT", "PATCH", "DELETE", "HEAD", "OPTIONS", "TRACE", "CONNECT", "GET"];

/// Headers the CGI convention passes without an `HTTP_` prefix.
const CONTENT_VARS: &[&str] = &["CONTENT_TYPE", "CONTENT_LENGTH", "CONTENT_MD5"];

// ── ServerVariables ──────────────────────────────────────────────────────────

/// Raw server variables, the CGI-style environment of one request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerVariables {
    vars: BTreeMap<String, String>,
}

impl ServerVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current process environment, as a CGI program receives it.
    pub fn from_env() -> Self {
        std::env::vars().collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).unwrap_or(default)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize { self.vars.len() }
    pub fn is_empty(&self) -> bool { self.vars.is_empty() }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ServerVariables {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self { vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

// ── ServerRequest ────────────────────────────────────────────────────────────

/// An incoming request together with its server parameters, cookies, query
/// parameters, uploads, parsed body and handler-defined attributes.
///
/// Every `with_*` method returns a new value. Uploaded files are shared
/// between copies, so a file moved through one copy reads as moved in all.
#[derive(Clone, Debug)]
pub struct ServerRequest {
    request: Request,
    server: ServerVariables,
    cookies: BTreeMap<String, String>,
    query: Vec<(String, String)>,
    uploaded_files: BTreeMap<String, Arc<UploadedFile>>,
    parsed_body: Option<Vec<(String, String)>>,
    attributes: BTreeMap<String, String>,
}

impl ServerRequest {
    /// Wraps `request` with no server parameters. Query parameters are read
    /// from the URI and cookies from the `Cookie` header.
    pub fn new(request: Request) -> Self {
        Self::with_server(request, ServerVariables::new())
    }

    fn with_server(request: Request, server: ServerVariables) -> Self {
        let query = request.uri().query().map(parse_query).unwrap_or_default();
        let cookies = parse_cookie_header(&request.header_line("Cookie"));
        Self {
            request,
            server,
            cookies,
            query,
            uploaded_files: BTreeMap::new(),
            parsed_body: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Extracts a request from server variables.
    ///
    /// # Errors
    ///
    /// - Any [`Uri::parse`] error for the request-target or the `Host` header.
    /// - [`Error::InvalidHost`] or [`Error::UntrustedHost`] for a host that
    ///   fails validation.
    /// - [`Error::InvalidPort`] for a malformed `SERVER_PORT`.
    /// - [`Error::Http`] for a method that is not a valid token.
    ///
    /// ```rust
    /// use missive::{Message, RequestConfig, ServerRequest, ServerVariables};
    ///
    /// let vars: ServerVariables = [
    ///     ("REQUEST_METHOD", "GET"),
    ///     ("REQUEST_URI", "/search?q=rust"),
    ///     ("HTTP_HOST", "example.com"),
    /// ]
    /// .into_iter()
    /// .collect();
    ///
    /// let req = ServerRequest::from_server(vars, &RequestConfig::default()).unwrap();
    /// assert_eq!(req.uri().to_string(), "http://example.com/search?q=rust");
    /// assert_eq!(req.query_params()[0].1, "rust");
    /// assert_eq!(req.header_line("host"), "example.com");
    /// ```
    pub fn from_server(vars: ServerVariables, config: &RequestConfig) -> Result<Self> {
        let method = resolve_method(&vars, config)?;
        let headers = extract_headers(&vars);

        let target = match vars.get("PATH_INFO") {
            Some(path) => match vars.get("QUERY_STRING") {
                Some(query) => format!("{path}?{query}"),
                None => path.to_owned(),
            },
            None => vars.get_or("REQUEST_URI", "/").to_owned(),
        };
        let version = vars
            .get("SERVER_PROTOCOL")
            .and_then(parse_version)
            .unwrap_or_default();
        let secure = vars.get("HTTPS").is_some_and(|v| !v.eq_ignore_ascii_case("off"));

        let mut uri = Uri::parse(&target)?;
        if uri.host().is_none() {
            let (host, port) = resolve_authority(&vars, &headers)?;
            if let Some(host) = host {
                let scheme = if secure { "https" } else { "http" };
                uri = uri.modify(|b| b.scheme(uri.scheme().unwrap_or(scheme)).host(host.as_str()).port(port));
            }
        }

        let request = Request::builder()
            .method(method)
            .uri(uri)
            .version(version)
            .headers(headers)
            .build_with(config)?;

        debug!(
            method = %request.method(),
            uri = %request.uri(),
            version = ?request.protocol_version(),
            "extracted server request"
        );
        Ok(Self::with_server(request, vars))
    }

    /// The plain request, without the server-side extras.
    pub fn request(&self) -> &Request { &self.request }
    pub fn method(&self) -> &Method { self.request.method() }
    pub fn uri(&self) -> &Uri { self.request.uri() }
    pub fn request_target(&self) -> String { self.request.request_target() }

    #[must_use]
    pub fn with_method(&self, method: Method) -> Self {
        Self { request: self.request.with_method(method), ..self.clone() }
    }

    /// See [`Request::with_uri`]. Query parameters are left as they were.
    #[must_use]
    pub fn with_uri(&self, uri: Uri, preserve_host: bool) -> Self {
        Self { request: self.request.with_uri(uri, preserve_host), ..self.clone() }
    }

    pub fn server_params(&self) -> &ServerVariables { &self.server }

    pub fn cookie_params(&self) -> &BTreeMap<String, String> { &self.cookies }

    #[must_use]
    pub fn with_cookie_params<I, K, V>(&self, cookies: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let cookies = cookies.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self { cookies, ..self.clone() }
    }

    /// Form-decoded query parameters in their original order.
    pub fn query_params(&self) -> &[(String, String)] { &self.query }

    #[must_use]
    pub fn with_query_params<I, K, V>(&self, query: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let query = query.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self { query, ..self.clone() }
    }

    pub fn uploaded_files(&self) -> &BTreeMap<String, Arc<UploadedFile>> { &self.uploaded_files }

    #[must_use]
    pub fn with_uploaded_files<I, K>(&self, files: I) -> Self
    where
        I: IntoIterator<Item = (K, UploadedFile)>,
        K: Into<String>,
    {
        let uploaded_files = files.into_iter().map(|(k, f)| (k.into(), Arc::new(f))).collect();
        Self { uploaded_files, ..self.clone() }
    }

    pub fn parsed_body(&self) -> Option<&[(String, String)]> { self.parsed_body.as_deref() }

    #[must_use]
    pub fn with_parsed_body(&self, data: Option<Vec<(String, String)>>) -> Self {
        Self { parsed_body: data, ..self.clone() }
    }

    /// Copy whose parsed body holds the decoded fields of an
    /// `application/x-www-form-urlencoded` body. Any other content type, or
    /// no body at all, yields a copy with no parsed body.
    pub fn with_form_body(&self) -> Result<Self> {
        let is_form = self
            .request
            .header_line("Content-Type")
            .split(';')
            .next()
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("application/x-www-form-urlencoded"));

        let parsed = match (is_form, self.request.body()) {
            (true, Some(body)) => Some(parse_query(&String::from_utf8_lossy(&body.contents()?))),
            _ => None,
        };
        Ok(self.with_parsed_body(parsed))
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> { &self.attributes }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn with_attribute(&self, name: &str, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.attributes.insert(name.to_owned(), value.into());
        next
    }

    #[must_use]
    pub fn without_attribute(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.attributes.remove(name);
        next
    }
}

impl From<Request> for ServerRequest {
    fn from(request: Request) -> Self { Self::new(request) }
}

impl Sealed for ServerRequest {
    fn head(&self) -> &Head { &self.request.head }
    fn head_mut(&mut self) -> &mut Head { &mut self.request.head }
}

impl Message for ServerRequest {}

// ── Extraction helpers ───────────────────────────────────────────────────────

fn resolve_method(vars: &ServerVariables, config: &RequestConfig) -> Result<Method> {
    let mut method = vars.get_or("REQUEST_METHOD", "GET").trim().to_ascii_uppercase();
    if method == "POST" && config.method_override {
        if let Some(wanted) = vars.get("HTTP_X_HTTP_METHOD_OVERRIDE") {
            let wanted = wanted.trim().to_ascii_uppercase();
            if OVERRIDABLE.contains(&wanted.as_str()) {
                method = wanted;
            }
        }
    }
    Method::from_bytes(method.as_bytes()).map_err(|e| Error::Http(e.into()))
}

/// `HTTP_ACCEPT_LANGUAGE` becomes `Accept-Language`.
fn extract_headers(vars: &ServerVariables) -> Headers {
    vars.iter()
        .filter_map(|(key, value)| {
            let name = key
                .strip_prefix("HTTP_")
                .or_else(|| CONTENT_VARS.contains(&key).then_some(key))?;
            Some((header_name(name), value))
        })
        .collect()
}

fn header_name(var: &str) -> String {
    var.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Host from the `Host` header, else `SERVER_NAME`, else `SERVER_ADDR`.
///
/// A `Host` header fully decides the authority: without an explicit port the
/// scheme default applies. `SERVER_PORT` is only read when there is no header.
fn resolve_authority(vars: &ServerVariables, headers: &Headers) -> Result<(Option<String>, Option<u16>)> {
    let (host, port) = match headers.first("Host").filter(|h| !h.is_empty()) {
        Some(value) => {
            validate_host(value)?;
            let authority = Uri::parse(&format!("//{value}"))?;
            (authority.host().map(str::to_owned), authority.raw_port())
        }
        None => {
            let host = vars.get("SERVER_NAME").or_else(|| vars.get("SERVER_ADDR")).map(str::to_owned);
            let port = match vars.get("SERVER_PORT") {
                Some(raw) => Some(raw.trim().parse().map_err(|_| Error::InvalidPort(raw.to_owned()))?),
                None => None,
            };
            (host, port)
        }
    };
    Ok((host.filter(|h| !h.is_empty()), port))
}

/// `a=1; b=two%20words` into decoded pairs. Later duplicates win.
fn parse_cookie_header(header: &str) -> BTreeMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_owned(), form_decode(value.trim())))
        })
        .collect()
}
