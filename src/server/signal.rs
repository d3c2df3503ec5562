// Signal handling module
//
// - SIGTERM: graceful shutdown
// - SIGINT:  graceful shutdown (Ctrl+C)
// Non-unix targets only listen for Ctrl+C.

use crate::logger;

/// Resolves when the process is asked to stop
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            logger::log_error(&format!("Failed to register signal handlers: {e}"));
            return std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => logger::log_warning("SIGTERM received"),
        _ = sigint.recv() => logger::log_warning("SIGINT received"),
    }
}

/// Resolves when the process is asked to stop
#[cfg(not(unix))]
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => logger::log_warning("Ctrl+C received"),
        Err(e) => {
            logger::log_error(&format!("Failed to listen for Ctrl+C: {e}"));
            std::future::pending::<()>().await;
        }
    }
}
