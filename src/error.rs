//! Unified error type.

use crate::upload::UploadErrorCode;

/// The error type returned by missive's fallible operations.
///
/// Every variant is a local, deterministic failure caused by malformed input
/// or by misuse of a resource. None of them are transient: retrying the same
/// call with the same input fails the same way.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input cannot be split into URI components at all.
    #[error("invalid URI syntax: {0:?}")]
    InvalidUriSyntax(String),

    /// The authority section is not shaped like `userinfo@host:port`.
    #[error("invalid URI authority: {0:?}")]
    InvalidAuthority(String),

    /// The port is not an integer in `0..=65535`.
    #[error("invalid port: {0:?}")]
    InvalidPort(String),

    /// The host contains characters outside `[a-zA-Z0-9.\-_:\[\]]`.
    #[error("invalid host: {0:?}")]
    InvalidHost(String),

    /// The host does not match any configured trusted-host pattern.
    #[error("untrusted host: {0:?}")]
    UntrustedHost(String),

    /// The stream was closed and can no longer be used.
    #[error("stream is closed")]
    StreamClosed,

    /// The stream was not opened for reading.
    #[error("stream is not readable")]
    StreamNotReadable,

    /// The stream was not opened for writing.
    #[error("stream is not writable")]
    StreamNotWritable,

    /// The upload carries an error code other than `Ok`.
    #[error("upload failed: {0}")]
    UploadFailed(UploadErrorCode),

    /// The uploaded file was already moved.
    #[error("uploaded file was already moved")]
    UploadAlreadyMoved,

    /// Underlying I/O failure.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Conversion into an `http` crate type failed.
    #[error("http: {0}")]
    Http(#[from] http::Error),
}

/// Convenience result type for missive operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
