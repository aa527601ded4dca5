//! TCP listener loop: binds the listening socket and hands each
//! accepted connection to its own worker thread.

use std::net::{Ipv4Addr, SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread;

use socket2::{Domain, Socket, Type};

use crate::cache::Cache;
use crate::connection;

/// Queued-connection backlog passed to the listening socket.
pub const MAX_CLIENTS: u32 = 100;

/// Binds `port` on all interfaces and serves connections until the
/// process is terminated.
///
/// Each accepted connection is handed to [`connection::serve`] on a
/// freshly spawned, detached thread — one thread per connection,
/// matching the base proxy's concurrency model. A failed `accept` is
/// logged and does not stop the loop; only a failed `bind` is fatal.
pub fn run(port: u16, cache: Option<Arc<Cache>>) -> std::io::Result<()> {
    let listener = bind_listener(port)?;
    tracing::info!(port, backlog = MAX_CLIENTS, "proxy listening");

    for incoming in listener.incoming() {
        match incoming {
            Ok(stream) => {
                let cache = cache.clone();
                thread::spawn(move || connection::serve(stream, cache));
            }
            Err(e) => {
                tracing::warn!(error = %e, "accept failed, continuing");
            }
        }
    }

    Ok(())
}

/// Builds the listening socket directly through `socket2` so the
/// `MAX_CLIENTS` backlog is actually passed to `listen(2)` — a plain
/// `TcpListener::bind` has no way to configure it.
fn bind_listener(port: u16) -> std::io::Result<TcpListener> {
    let addr: SocketAddr = (Ipv4Addr::UNSPECIFIED, port).into();
    let socket = Socket::new(Domain::IPV4, Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(MAX_CLIENTS as i32)?;
    Ok(socket.into())
}
