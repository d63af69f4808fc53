//! HTTP transport over the pipeline. Each request runs one pipeline
//! invocation on its own task; pipeline outcomes always answer 200 and carry
//! their status in the body.

mod handlers;
mod router;
mod state;

pub use router::create_router;
pub use state::AppState;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

pub(crate) const TARGET: &str = "http_server";

pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(state.upload_dir())
        .await
        .with_context(|| {
            format!(
                "failed to create upload directory {}",
                state.upload_dir().display()
            )
        })?;

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;
    info!(
        target: TARGET,
        address = %listener.local_addr()?,
        upload_dir = %state.upload_dir().display(),
        "api server listening"
    );

    axum::serve(listener, create_router(state))
        .await
        .context("api server terminated")
}
