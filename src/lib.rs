//! # missive
//!
//! Immutable HTTP messages for Rust code that should not care which server
//! delivered them.
//!
//! ## The contract
//!
//! A request, a response and a URI are values. Once built they never change.
//! Every edit returns a new value and leaves the old one exactly as it was,
//! so a message can be handed to any number of readers without surprises.
//!
//! What missive owns:
//!
//! - **URI parsing**: absolute URIs, relative references, bare paths and `*`,
//!   with standard-port elision and absent-versus-empty components
//! - **Message values**: [`Request`], [`ServerRequest`] and [`Response`],
//!   sharing the [`Message`] copy-on-write protocol
//! - **Bodies**: seekable in-memory or file [`Stream`]s behind a shared
//!   [`Body`] handle
//! - **Server glue**: CGI-style variables into a [`ServerRequest`], uploads,
//!   cookies and query strings
//!
//! What it leaves to others: sockets, routing, TLS and everything else a
//! server does. [`Request::into_http`] and [`Response::into_http`] hand off to
//! the `http` crate ecosystem.
//!
//! ## Quick start
//!
//! ```rust
//! use missive::{Message, Method, Request, Response, StatusCode, Uri};
//!
//! let uri = Uri::parse("http://example.com:80/users?id=7").unwrap();
//! assert_eq!(uri.port(), None);
//! assert_eq!(uri.with_scheme("https").port(), Some(80));
//!
//! let req = Request::new(Method::GET, "https://example.com/users/7").unwrap();
//! assert_eq!(req.header_line("Host"), "example.com");
//!
//! let res = Response::builder()
//!     .status(StatusCode::CREATED)
//!     .header("Location", "/users/7")
//!     .json(r#"{"id":7}"#);
//!
//! // edits produce new values
//! let tagged = res.with_header("X-Request-Id", "abc");
//! assert!(tagged.has_header("x-request-id"));
//! assert!(!res.has_header("x-request-id"));
//! ```

mod config;
mod error;
mod headers;
mod message;
mod request;
mod response;
mod server_request;
mod stream;
mod upload;
mod uri;

pub mod query;

pub use config::RequestConfig;
pub use error::{Error, Result};
pub use headers::{HeaderEntry, Headers};
pub use message::{Message, parse_version};
pub use request::{Request, RequestBuilder};
pub use response::{ContentType, Cookie, ReasonPhrase, Response, ResponseBuilder};
pub use server_request::{ServerRequest, ServerVariables};
pub use stream::{Body, OpenMode, Stream};
pub use upload::{UploadErrorCode, UploadedFile};
pub use uri::{Components, Uri, UriBuilder, default_port};

pub use http::{Method, StatusCode, Version};
