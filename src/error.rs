//! Error taxonomy for the connection worker.
//!
//! Each variant maps to exactly one client-facing status line (see
//! [`WorkerError::status_line`]); cache-internal failures never appear
//! here because the cache engine absorbs them silently (oversize
//! rejection, best-effort capture) rather than surfacing them to a
//! worker.

use thiserror::Error;

/// A failure in the per-connection forwarding pipeline.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The request line or headers did not parse.
    #[error("malformed request: {0}")]
    MalformedRequest(#[from] crate::request::ParseError),

    /// The request carried no usable host, so no upstream address could
    /// be derived.
    #[error("request is missing a host")]
    MissingHost,

    /// DNS resolution or the TCP handshake to the origin failed.
    #[error("could not resolve or connect to upstream: {0}")]
    UpstreamUnreachable(#[source] std::io::Error),
}

impl WorkerError {
    /// The HTTP status line this error is reported to the client as.
    pub fn status_line(&self) -> (u16, &'static str) {
        match self {
            WorkerError::MalformedRequest(_) => (400, "Bad Request"),
            WorkerError::MissingHost => (400, "Bad Request"),
            WorkerError::UpstreamUnreachable(_) => (502, "Bad Gateway"),
        }
    }
}
