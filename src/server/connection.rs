// Connection handling module
// Accepts a single TCP connection, enforces the connection limit and serves it

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::AppState;
use crate::error::AppError;
use crate::handler;
use crate::http::ResponseWriter;
use crate::logger;

/// How long a rejected socket lingers to read the peer's pending request
const REJECT_LINGER: Duration = Duration::from_millis(500);

/// Accept a connection, checking the connection limit.
///
/// The counter is incremented before the check so concurrent accepts cannot
/// both slip under the limit. Rejected peers get a 503 before the socket closes.
pub fn accept_connection(stream: TcpStream, peer_addr: SocketAddr, state: &Arc<AppState>) {
    let prev_count = state.active_connections.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            state.active_connections.fetch_sub(1, Ordering::SeqCst);
            logger::log_connection_rejected(&peer_addr, prev_count, max_conn);
            reject_connection(stream, state, max_conn);
            return;
        }
    }

    logger::log_connection_accepted(&peer_addr);
    handle_connection(stream, peer_addr, Arc::clone(state));
}

/// Write a raw 503 and close; hyper is never involved for rejected peers
fn reject_connection(mut stream: TcpStream, state: &AppState, max_conn: u64) {
    let writer = ResponseWriter::new(&state.config.http);
    let wire = ResponseWriter::encode(&writer.write(Err(AppError::Overloaded { max: max_conn })));

    tokio::spawn(async move {
        if let Err(e) = stream.write_all(&wire).await {
            logger::log_connection_error(&e);
            return;
        }
        let _ = stream.shutdown().await;

        // Consume whatever the peer already sent so the close is a FIN, not a reset
        let mut sink = [0u8; 1024];
        let _ = tokio::time::timeout(REJECT_LINGER, async {
            while matches!(stream.read(&mut sink).await, Ok(n) if n > 0) {}
        })
        .await;
    });
}

/// Serve one connection in a spawned task.
///
/// The whole connection runs under `max(read_timeout, write_timeout)`; the
/// active connection counter is released when the task ends.
fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, state: Arc<AppState>) {
    tokio::spawn(async move {
        if let Err(e) = stream.set_nodelay(true) {
            logger::log_warning(&format!("Failed to set TCP_NODELAY: {e}"));
        }
        let io = TokioIo::new(stream);

        let perf = &state.config.performance;
        let timeout_secs = perf.read_timeout.max(perf.write_timeout);

        let mut builder = http1::Builder::new();
        builder.keep_alive(perf.keep_alive);

        let service_state = Arc::clone(&state);
        let service = service_fn(move |req| {
            handler::handle_request(req, Arc::clone(&service_state), peer_addr)
        });
        let conn = builder.serve_connection(io, service);

        match tokio::time::timeout(Duration::from_secs(timeout_secs), conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => logger::log_connection_timeout(timeout_secs),
        }

        state.active_connections.fetch_sub(1, Ordering::SeqCst);
    });
}
