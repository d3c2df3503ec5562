// Server loop module
// Accepts connections until the shutdown future resolves, then drains

use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::Instant;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// How often the drain phase re-checks the connection counter
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Run the accept loop.
///
/// Accept errors are logged and the loop keeps going. Once `shutdown`
/// resolves the listener is dropped and in-flight connections get up to
/// `performance.shutdown_grace` seconds to finish.
#[allow(clippy::ignored_unit_patterns)]
pub async fn run<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => accept_connection(stream, peer_addr, &state),
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }
            _ = &mut shutdown => break,
        }
    }

    drop(listener);
    logger::log_shutdown_started(state.active_connections.load(Ordering::SeqCst));

    let grace = Duration::from_secs(state.config.performance.shutdown_grace);
    let remaining = drain(&state, grace).await;
    logger::log_shutdown_complete(remaining);
}

/// Wait for open connections to close, returning how many are left at the deadline
async fn drain(state: &AppState, grace: Duration) -> usize {
    let deadline = Instant::now() + grace;
    loop {
        let active = state.active_connections.load(Ordering::SeqCst);
        if active == 0 || Instant::now() >= deadline {
            return active;
        }
        tokio::time::sleep(DRAIN_POLL).await;
    }
}
