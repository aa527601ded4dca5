//! Structured view of an absolute-URI HTTP/1.x request line and headers.
//!
//! This mirrors the request representation a forwarding proxy needs:
//! enough structure to compute a cache key, rewrite a handful of
//! headers, and re-serialize a request line and header block — nothing
//! more. Byte-level HTTP semantics beyond that (chunked encoding,
//! `Vary`, conditional requests, ...) are out of scope.

use std::fmt;

/// Minimum buffer length that can possibly contain a request line.
const MIN_REQUEST_LEN: usize = 4;

const DEFAULT_PROTOCOL: &str = "http";
const DEFAULT_PORT: &str = "80";
const DEFAULT_PATH: &str = "/";

/// Why a raw buffer could not be parsed into a [`ParsedRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Buffer shorter than the minimum possible request.
    TooShort,
    /// No `\r\n` terminator was found anywhere in the buffer.
    MissingCrlf,
    /// The request line did not split into exactly method/target/version.
    MalformedRequestLine,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::TooShort => write!(f, "request buffer shorter than {MIN_REQUEST_LEN} bytes"),
            ParseError::MissingCrlf => write!(f, "no CRLF terminator found"),
            ParseError::MalformedRequestLine => write!(f, "malformed request line"),
        }
    }
}

impl std::error::Error for ParseError {}

/// A single `key: value` header, preserving original casing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Original casing as received, e.g. `"Host"` or `"user-agent"`.
    pub key: String,
    /// Raw value, leading whitespace after the colon stripped.
    pub value: String,
}

/// A parsed HTTP/1.x request line plus an ordered, case-insensitively
/// keyed header list.
///
/// All fields are independently owned `String`s. The original C proxy
/// this is modeled on aliased `path` into its request buffer and later
/// overwrote `version` with a string literal before freeing that
/// buffer — a dangling-pointer hazard this representation avoids by
/// construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRequest {
    /// Request method, e.g. `"GET"`.
    pub method: String,
    /// Scheme, defaulted to `"http"` when the request target omitted it.
    pub protocol: String,
    /// Target host, without port.
    pub host: String,
    /// Target port as a decimal string, defaulted to `"80"`.
    pub port: String,
    /// Origin-form path, defaulted to `"/"`.
    pub path: String,
    /// HTTP version token from the request line, e.g. `"HTTP/1.1"`.
    pub version: String,
    headers: Vec<Header>,
}

impl ParsedRequest {
    /// Parses `buf` into a request. See module docs for the grammar.
    pub fn parse(buf: &[u8]) -> Result<Self, ParseError> {
        if buf.len() < MIN_REQUEST_LEN {
            return Err(ParseError::TooShort);
        }

        let crlf = find(buf, b"\r\n").ok_or(ParseError::MissingCrlf)?;
        let request_line = &buf[..crlf];
        let mut req = parse_request_line(request_line)?;

        let mut cursor = crlf + 2;
        while cursor < buf.len() {
            if buf[cursor..].starts_with(b"\r\n") {
                break;
            }
            let Some(line_end) = find(&buf[cursor..], b"\r\n") else {
                break;
            };
            let line = &buf[cursor..cursor + line_end];
            if let Some(colon) = line.iter().position(|&b| b == b':') {
                let key = String::from_utf8_lossy(&line[..colon]).into_owned();
                let mut rest = &line[colon + 1..];
                while rest.first() == Some(&b' ') {
                    rest = &rest[1..];
                }
                let value = String::from_utf8_lossy(rest).into_owned();
                req.set(&key, &value);
            }
            cursor += line_end + 2;
        }

        Ok(req)
    }

    /// Sets a header, replacing an existing case-insensitive match in
    /// place or appending a new one.
    pub fn set(&mut self, key: &str, value: &str) {
        if let Some(h) = self
            .headers
            .iter_mut()
            .find(|h| h.key.eq_ignore_ascii_case(key))
        {
            h.value = value.to_string();
        } else {
            self.headers.push(Header {
                key: key.to_string(),
                value: value.to_string(),
            });
        }
    }

    /// Looks up a header by case-insensitive key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.key.eq_ignore_ascii_case(key))
            .map(|h| h.value.as_str())
    }

    /// Removes a header by case-insensitive key. Returns whether a
    /// header was actually removed.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.headers.len();
        self.headers.retain(|h| !h.key.eq_ignore_ascii_case(key));
        self.headers.len() != before
    }

    /// Returns the list of headers.
    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// Length in bytes of `"{method} {path} {version}\r\n"`.
    pub fn request_line_length(&self) -> usize {
        self.method.len() + 1 + self.path.len() + 1 + self.version.len() + 2
    }

    /// Length in bytes of all headers re-serialized, including the
    /// final blank-line CRLF that ends the header block.
    pub fn headers_length(&self) -> usize {
        let mut len = 2; // final CRLF
        for h in &self.headers {
            len += h.key.len() + h.value.len() + 4; // ": " + "\r\n"
        }
        len
    }

    /// Appends `"{method} {path} {version}\r\n"` to `buf`.
    ///
    /// Note this uses `path`, not the original request-target — a
    /// request parsed from an absolute URI is re-emitted in
    /// origin-form, which is what an upstream origin server expects.
    pub fn unparse_request_line(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.method.as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.path.as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.version.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    /// Appends each header as `"{key}: {value}\r\n"` to `buf`, followed
    /// by the header-block-terminating blank line.
    pub fn unparse_headers(&self, buf: &mut Vec<u8>) {
        for h in &self.headers {
            buf.extend_from_slice(h.key.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(h.value.as_bytes());
            buf.extend_from_slice(b"\r\n");
        }
        buf.extend_from_slice(b"\r\n");
    }

    /// Serializes the full request (line + headers) into one buffer,
    /// as sent verbatim to an upstream origin.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.request_line_length() + self.headers_length());
        self.unparse_request_line(&mut buf);
        self.unparse_headers(&mut buf);
        buf
    }

    /// The canonical cache key: `"{protocol}://{host}:{port}{path}"`.
    pub fn cache_key(&self) -> String {
        format!("{}://{}:{}{}", self.protocol, self.host, self.port, self.path)
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn parse_request_line(line: &[u8]) -> Result<ParsedRequest, ParseError> {
    let line = String::from_utf8_lossy(line);
    let mut parts = line.splitn(3, ' ');
    let method = parts.next().filter(|s| !s.is_empty());
    let target = parts.next().filter(|s| !s.is_empty());
    let version = parts.next().filter(|s| !s.is_empty());

    let (method, target, version) = match (method, target, version) {
        (Some(m), Some(t), Some(v)) => (m, t, v),
        _ => return Err(ParseError::MalformedRequestLine),
    };

    let (protocol, authority_and_path) = match target.split_once("://") {
        Some((scheme, rest)) => (scheme.to_string(), rest),
        None => (DEFAULT_PROTOCOL.to_string(), target),
    };

    let (authority, path) = match authority_and_path.find('/') {
        Some(idx) => (
            &authority_and_path[..idx],
            authority_and_path[idx..].to_string(),
        ),
        None => (authority_and_path, DEFAULT_PATH.to_string()),
    };

    let (host, port) = match authority.split_once(':') {
        Some((h, p)) => (h.to_string(), p.to_string()),
        None => (authority.to_string(), DEFAULT_PORT.to_string()),
    };

    Ok(ParsedRequest {
        method: method.to_string(),
        protocol,
        host,
        port,
        path,
        version: version.trim_end_matches(['\r', '\n']).to_string(),
        headers: Vec::new(),
    })
}
