//! Request-construction settings.
//!
//! Configuration is an explicit value handed to whatever builds requests.
//! There is no process-wide state.

use tracing::warn;

use crate::error::{Error, Result};

/// Settings applied while turning raw input into a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestConfig {
    /// Host patterns a request may name. Empty means unrestricted.
    ///
    /// `*` matches any host, `*.example.com` matches any sub-domain of
    /// `example.com` (but not `example.com` itself), anything else matches
    /// exactly, ignoring ASCII case.
    pub trusted_hosts: Vec<String>,
    /// Whether a `POST` may be re-labelled via `X-HTTP-Method-Override`.
    pub method_override: bool,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { trusted_hosts: Vec::new(), method_override: true }
    }
}

impl RequestConfig {
    /// Load configuration from environment variables.
    ///
    /// `TRUSTED_HOSTS` is a comma-separated pattern list and
    /// `HTTP_METHOD_OVERRIDE` accepts `1` or `true` (case-insensitive).
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("TRUSTED_HOSTS") {
            config.trusted_hosts = v
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_owned)
                .collect();
        }
        if let Some(v) = lookup("HTTP_METHOD_OVERRIDE") {
            config.method_override = v == "1" || v.eq_ignore_ascii_case("true");
        }

        config
    }

    /// Restricts requests to the given host patterns.
    #[must_use]
    pub fn with_trusted_hosts<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trusted_hosts = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_trusted_host(&self, host: &str) -> bool {
        self.trusted_hosts.is_empty()
            || self.trusted_hosts.iter().any(|pattern| host_matches(pattern, host))
    }

    /// Fails with [`Error::UntrustedHost`] when `host` matches no pattern.
    pub fn check_host(&self, host: &str) -> Result<()> {
        if self.is_trusted_host(host) {
            return Ok(());
        }
        warn!(host, patterns = ?self.trusted_hosts, "untrusted host");
        Err(Error::UntrustedHost(host.to_owned()))
    }
}

fn host_matches(pattern: &str, host: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match pattern.strip_prefix("*.") {
        Some(domain) => host
            .len()
            .checked_sub(domain.len() + 1)
            .filter(|&dot| host.as_bytes()[dot] == b'.' && dot > 0)
            .is_some_and(|dot| host[dot + 1..].eq_ignore_ascii_case(domain)),
        None => pattern.eq_ignore_ascii_case(host),
    }
}
