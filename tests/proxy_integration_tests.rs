//! End-to-end tests driving the proxy over real loopback sockets: a
//! fake origin server plus direct calls into [`cache_proxy::connection`].

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cache_proxy::{Cache, CacheConfig};

/// Spawns a one-shot origin server that replies with a fixed body and
/// counts how many connections it accepted.
fn spawn_origin(body: &'static str) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_clone = hits.clone();

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            hits_clone.fetch_add(1, Ordering::SeqCst);
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf);
            let response = format!(
                "HTTP/1.0 200 OK\r\nContent-Length: {}\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    (addr.to_string(), hits)
}

fn send_request(proxy_addr: &str, request: &str) -> Vec<u8> {
    let mut stream = TcpStream::connect(proxy_addr).unwrap();
    stream.write_all(request.as_bytes()).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    let mut response = Vec::new();
    let _ = stream.read_to_end(&mut response);
    response
}

fn spawn_proxy(cache: Option<Arc<Cache>>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { continue };
            let cache = cache.clone();
            thread::spawn(move || cache_proxy::connection::serve(stream, cache));
        }
    });
    addr
}

#[test]
fn forwards_request_and_relays_origin_response() {
    let (origin_addr, hits) = spawn_origin("hello from origin");
    let proxy_addr = spawn_proxy(None);

    let request = format!("GET http://{origin_addr}/ HTTP/1.1\r\nHost: {origin_addr}\r\n\r\n");
    let response = send_request(&proxy_addr, &request);
    let text = String::from_utf8_lossy(&response);

    assert!(text.contains("200 OK"), "unexpected response: {text}");
    assert!(text.ends_with("hello from origin"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn second_identical_request_is_served_from_cache_without_hitting_origin_again() {
    let (origin_addr, hits) = spawn_origin("cached body");
    let cache = Arc::new(Cache::new(CacheConfig::new(1024 * 1024, 1024 * 1024)));
    let proxy_addr = spawn_proxy(Some(cache));

    let request = format!("GET http://{origin_addr}/page HTTP/1.1\r\nHost: {origin_addr}\r\n\r\n");
    let first = send_request(&proxy_addr, &request);
    let second = send_request(&proxy_addr, &request);

    assert!(String::from_utf8_lossy(&first).ends_with("cached body"));
    assert_eq!(first, second);
    assert_eq!(hits.load(Ordering::SeqCst), 1, "origin should only see one connection");
}

#[test]
fn malformed_request_gets_a_400_without_touching_any_origin() {
    let proxy_addr = spawn_proxy(None);
    let response = send_request(&proxy_addr, "not a valid request line\r\n\r\n");
    let text = String::from_utf8_lossy(&response);
    assert!(text.starts_with("HTTP/1.0 400"), "unexpected response: {text}");
}

#[test]
fn unreachable_origin_gets_a_502() {
    let proxy_addr = spawn_proxy(None);
    // Port 1 is reserved and will refuse the connection immediately on loopback.
    let request = "GET http://127.0.0.1:1/ HTTP/1.1\r\nHost: 127.0.0.1:1\r\n\r\n";
    let response = send_request(&proxy_addr, request);
    let text = String::from_utf8_lossy(&response);
    assert!(text.starts_with("HTTP/1.0 502"), "unexpected response: {text}");
}
