// Background workers: the polling loop and the optional status endpoint.

use crate::modules::package_updates::use_cases::dispatch_updates::engine::{DispatchEngine, EngineError};
use crate::shell::http::router;
use crate::shell::state::AppState;
use std::net::SocketAddr;
use tokio::task::JoinHandle;

/// Serve the status router until the process exits.
pub async fn spawn_status_server(addr: SocketAddr, state: AppState) -> std::io::Result<JoinHandle<()>> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "status endpoint listening");
    Ok(tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router(state)).await {
            tracing::error!(error = %err, "status endpoint stopped");
        }
    }))
}

/// Run the engine until it fails or ctrl-c arrives.
pub async fn run_until_shutdown(engine: DispatchEngine) -> Result<(), EngineError> {
    tokio::select! {
        result = engine.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            Ok(())
        }
    }
}
