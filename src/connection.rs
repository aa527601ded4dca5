//! Per-connection forwarding pipeline: read, parse, cache lookup,
//! upstream forward, relay, and best-effort cache admission.
//!
//! One [`serve`] call handles one accepted client socket start to
//! finish, on its own thread. The only state shared with other
//! connections is the [`Cache`] handle.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Instant;

use crate::cache::Cache;
use crate::error::WorkerError;
use crate::request::ParsedRequest;

/// Single-`recv` read limit. The worker does not loop to assemble a
/// request spanning multiple TCP segments — an explicit, documented
/// simplification inherited from the reference design.
pub const MAX_REQUEST_SIZE: usize = 8192;

/// Handles one client connection from accept to close.
///
/// `cache` is `None` when the proxy was started with caching disabled;
/// in that case lookup and admission are skipped entirely and every
/// request is forwarded.
pub fn serve(mut client: TcpStream, cache: Option<Arc<Cache>>) {
    let peer = client
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let started = Instant::now();

    let mut buf = [0u8; MAX_REQUEST_SIZE];
    let n = match client.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };

    let req = match ParsedRequest::parse(&buf[..n]) {
        Ok(req) => req,
        Err(e) => {
            tracing::warn!(%peer, error = %e, "failed to parse request");
            respond_error(&mut client, WorkerError::MalformedRequest(e));
            return;
        }
    };

    if req.host.is_empty() {
        tracing::warn!(%peer, "request missing host");
        respond_error(&mut client, WorkerError::MissingHost);
        return;
    }

    let key = req.cache_key();
    tracing::info!(%peer, url = %key, "received request");

    if let Some(cache) = &cache {
        if let Some(payload) = cache.get(&key) {
            tracing::info!(%peer, url = %key, "cache hit");
            let _ = client.write_all(&payload);
            tracing::debug!(%peer, elapsed = ?started.elapsed(), "connection served from cache");
            return;
        }
        tracing::debug!(%peer, url = %key, "cache miss");
    }

    if let Err(e) = forward(&mut client, req, &key, cache.as_deref()) {
        tracing::warn!(%peer, error = %e, "forwarding failed");
        respond_error(&mut client, e);
    }

    tracing::debug!(%peer, elapsed = ?started.elapsed(), "connection complete");
}

/// Connects to the origin, rewrites and forwards the request, and
/// relays the response back to the client, capturing it for the cache
/// along the way.
fn forward(
    client: &mut TcpStream,
    mut req: ParsedRequest,
    key: &str,
    cache: Option<&Cache>,
) -> Result<(), WorkerError> {
    let origin_addr = format!("{}:{}", req.host, req.port);
    let mut origin = TcpStream::connect(&origin_addr).map_err(WorkerError::UpstreamUnreachable)?;

    req.set("Host", &req.host.clone());
    req.set("Connection", "close");
    req.version = "HTTP/1.0".to_string();

    let outgoing = req.serialize();
    if origin.write_all(&outgoing).is_err() {
        // The origin connection itself is gone; nothing useful to relay.
        return Ok(());
    }

    relay(client, &mut origin, key, cache);
    Ok(())
}

/// Streams the origin's response to the client, optionally capturing
/// it for cache admission.
///
/// Capture uses a plain growable `Vec<u8>`, whose amortized-doubling
/// growth strategy is exactly the capture-buffer contract this worker
/// needs. An upstream read error discards whatever was captured (a
/// partial response would poison the cache under this key); a client
/// write error still admits what was captured, since the response
/// itself completed successfully from the origin's point of view.
fn relay(client: &mut TcpStream, origin: &mut TcpStream, key: &str, cache: Option<&Cache>) {
    let mut capture = cache.map(|_| Vec::new());
    let mut discard = false;
    let mut chunk = [0u8; MAX_REQUEST_SIZE];

    loop {
        match origin.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                if client.write_all(&chunk[..n]).is_err() {
                    tracing::warn!(url = %key, "client send error, stopping relay");
                    break;
                }
                if let Some(buf) = capture.as_mut() {
                    buf.extend_from_slice(&chunk[..n]);
                }
            }
            Err(e) => {
                tracing::warn!(url = %key, error = %e, "upstream recv error");
                discard = true;
                break;
            }
        }
    }

    if discard {
        capture = None;
    }

    if let (Some(cache), Some(buf)) = (cache, capture) {
        if !buf.is_empty() {
            cache.put(key.to_string(), buf);
        }
    }
}

/// Writes a minimal status-line-only error response, best effort.
fn respond_error(stream: &mut TcpStream, error: WorkerError) {
    let (status, reason) = error.status_line();
    let response = format!("HTTP/1.0 {status} {reason}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
    let _ = stream.write_all(response.as_bytes());
}
