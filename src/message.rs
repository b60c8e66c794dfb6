//! The copy-on-write protocol shared by requests and responses.
//!
//! Every message type carries a [`Head`]: protocol version, headers and an
//! optional body. [`Message`] exposes read access to it plus `with_*` methods
//! that clone the message, change one thing and return the clone. The
//! receiver is never altered.
//!
//! Cloning copies the header collection but only the handle to the body, so
//! a derived message and its origin read from the same [`Body`] stream.

use http::Version;

use crate::headers::Headers;
use crate::stream::Body;

/// Version, headers and body of a message.
#[derive(Clone, Debug, Default)]
pub struct Head {
    pub(crate) version: Version,
    pub(crate) headers: Headers,
    pub(crate) body: Option<Body>,
}

/// The sealing module. Because `Sealed` is private, external crates cannot
/// name it and therefore cannot implement `Message` on their own types, nor
/// reach a message's head mutably.
mod private {
    pub trait Sealed {
        fn head(&self) -> &super::Head;
        fn head_mut(&mut self) -> &mut super::Head;

        fn derive(&self, edit: impl FnOnce(&mut super::Head)) -> Self
        where
            Self: Clone,
        {
            let mut next = self.clone();
            edit(next.head_mut());
            next
        }
    }
}

pub(crate) use private::Sealed;

/// Read access and copy-on-write edits common to every message.
///
/// Implemented by [`Request`](crate::Request),
/// [`ServerRequest`](crate::ServerRequest) and [`Response`](crate::Response).
///
/// ```rust
/// use missive::{Message, Response};
///
/// let original = Response::text("hi");
/// let tagged = original.with_header("X-Trace", "abc");
///
/// assert!(tagged.has_header("x-trace"));
/// assert!(!original.has_header("x-trace"));
/// ```
pub trait Message: private::Sealed + Clone {
    fn protocol_version(&self) -> Version {
        self.head().version
    }

    fn headers(&self) -> &Headers {
        &self.head().headers
    }

    fn has_header(&self, name: &str) -> bool {
        self.head().headers.contains(name)
    }

    /// All values of `name`, empty when absent.
    fn header(&self, name: &str) -> &[String] {
        self.head().headers.get(name)
    }

    /// All values of `name` joined with `,`, empty when absent.
    fn header_line(&self, name: &str) -> String {
        self.head().headers.get_line(name)
    }

    fn body(&self) -> Option<&Body> {
        self.head().body.as_ref()
    }

    #[must_use]
    fn with_protocol_version(&self, version: Version) -> Self {
        self.derive(|head| head.version = version)
    }

    /// Replaces every value of `name`.
    #[must_use]
    fn with_header(&self, name: &str, value: impl Into<String>) -> Self {
        self.derive(|head| head.headers.insert(name, value))
    }

    /// Appends `value` to the values of `name`.
    #[must_use]
    fn with_added_header(&self, name: &str, value: impl Into<String>) -> Self {
        self.derive(|head| head.headers.append(name, value))
    }

    #[must_use]
    fn without_header(&self, name: &str) -> Self {
        self.derive(|head| {
            head.headers.remove(name);
        })
    }

    /// Swaps the body handle. The previous stream is left open for whoever
    /// still holds it.
    #[must_use]
    fn with_body(&self, body: impl Into<Body>) -> Self {
        let body = body.into();
        self.derive(|head| head.body = Some(body))
    }

    #[must_use]
    fn without_body(&self) -> Self {
        self.derive(|head| head.body = None)
    }
}

/// Maps a server-protocol string (`HTTP/1.1`, `1.0`, `HTTP/2` ...) to a
/// [`Version`].
pub fn parse_version(protocol: &str) -> Option<Version> {
    let protocol = protocol.trim();
    let number = protocol
        .get(..5)
        .filter(|prefix| prefix.eq_ignore_ascii_case("HTTP/"))
        .map_or(protocol, |_| &protocol[5..]);

    match number {
        "0.9" => Some(Version::HTTP_09),
        "1.0" => Some(Version::HTTP_10),
        "1.1" => Some(Version::HTTP_11),
        "2" | "2.0" => Some(Version::HTTP_2),
        "3" | "3.0" => Some(Version::HTTP_3),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Probe(Head);

    impl Sealed for Probe {
        fn head(&self) -> &Head { &self.0 }
        fn head_mut(&mut self) -> &mut Head { &mut self.0 }
    }

    impl Message for Probe {}

    #[test]
    fn test_should_leave_receiver_untouched() {
        let original = Probe::default().with_header("X-Foo", "1");
        let changed = original
            .with_protocol_version(Version::HTTP_2)
            .with_added_header("x-foo", "2")
            .with_header("X-Bar", "b")
            .with_body("payload");

        assert_eq!(original.protocol_version(), Version::HTTP_11);
        assert_eq!(original.header("X-Foo"), ["1"]);
        assert!(!original.has_header("X-Bar"));
        assert!(original.body().is_none());

        assert_eq!(changed.protocol_version(), Version::HTTP_2);
        assert_eq!(changed.header_line("X-FOO"), "1,2");
        assert_eq!(changed.body().unwrap().contents().unwrap(), "payload");
    }

    #[test]
    fn test_should_report_original_casing() {
        let probe = Probe::default().with_header("X-Foo", "1");
        assert!(probe.has_header("x-foo"));
        assert_eq!(probe.headers().iter().next().unwrap().0, "X-Foo");
    }

    #[test]
    fn test_should_remove_header_and_body_on_copy() {
        let full = Probe::default().with_header("A", "1").with_body("x");
        let bare = full.without_header("a").without_body();
        assert!(bare.headers().is_empty());
        assert!(bare.body().is_none());
        assert!(full.has_header("A"));
    }

    #[test]
    fn test_should_share_body_handle_between_copies() {
        let first = Probe::default().with_body(crate::stream::Stream::memory());
        let second = first.with_header("X", "y");
        assert!(first.body().unwrap().ptr_eq(second.body().unwrap()));

        // replacing leaves the old stream usable
        let third = second.with_body("new");
        assert!(!first.body().unwrap().lock().is_closed());
        assert_eq!(third.body().unwrap().contents().unwrap(), "new");
    }

    #[test]
    fn test_should_parse_server_protocol_strings() {
        assert_eq!(parse_version("HTTP/1.0"), Some(Version::HTTP_10));
        assert_eq!(parse_version("http/1.1"), Some(Version::HTTP_11));
        assert_eq!(parse_version("HTTP/2.0"), Some(Version::HTTP_2));
        assert_eq!(parse_version("3"), Some(Version::HTTP_3));
        assert_eq!(parse_version("HTTP/4"), None);
        assert_eq!(parse_version(""), None);
    }
}
