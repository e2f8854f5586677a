//main.rs
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use common::config::JudgeConfig;
use common::logger::init_logging;
use invoker_pool::worker::{serve, PythonBackend};
use tokio::net::TcpListener;

/// Sandbox worker. Usage: `invoker [PORT]`, falling back to `INVOKER_PORT`.
#[tokio::main]
async fn main() {
    let config = JudgeConfig::global().clone();
    let _guard = init_logging(&config.log_file, &config.log_level);

    let port: u16 = env::args()
        .nth(1)
        .or_else(|| env::var("INVOKER_PORT").ok())
        .unwrap_or_else(|| "65000".into())
        .parse()
        .expect("Invalid port");

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind invoker port");

    let backend = Arc::new(PythonBackend::new(config.python_binary));
    if let Err(e) = serve(listener, backend).await {
        tracing::error!("Invoker stopped: {}", e);
    }
}
