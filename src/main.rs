use std::sync::Arc;

mod config;
mod error;
mod handler;
mod http;
mod logger;
mod point;
mod routing;
mod server;
mod validation;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::Config::load_from(&config_path)?;
    logger::init(&cfg.logging)?;

    // Worker threads follow `server.workers`, defaulting to CPU cores
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    tracing::debug!(workers = ?cfg.server.workers, config = %config_path, "building runtime");

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let state = Arc::new(config::AppState::new(&cfg)?);
    let listener = server::create_reusable_listener(addr)?;

    logger::log_server_start(&addr, &cfg);
    server::run(listener, state, server::shutdown_signal()).await;
    Ok(())
}
