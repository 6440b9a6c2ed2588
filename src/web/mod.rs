//! Status webpage: dashboard, liveness probe and JSON stats.

pub mod dashboard;
pub mod status;

pub use status::{StatusState, status_routes};

use tokio::net::TcpListener;

/// Serve the status routes on an already-bound listener until the task is dropped.
pub async fn serve(listener: TcpListener, state: StatusState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "Status server started");
    }
    axum::serve(listener, status_routes(state)).await
}
