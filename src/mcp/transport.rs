//! Transports for the filesystem tool server: stdio and streamable HTTP.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rmcp::ServiceExt;
use rmcp::transport::io::stdio;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use tokio::net::TcpListener;
use tracing::info;

use super::server::FilesystemServer;

/// Serves the filesystem tools over stdin/stdout until the peer disconnects.
///
/// # Errors
///
/// Returns an error if the root is missing or the session fails.
pub async fn serve_stdio(root: Option<&Path>) -> anyhow::Result<()> {
    let server = FilesystemServer::new(root)?;
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}

/// Serves the filesystem tools over streamable HTTP at `/mcp` until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve_http(host: &str, port: u16, root: Option<&Path>) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "filesystem tool server listening on http://{addr}/mcp");

    serve_http_on(listener, root.map(Path::to_path_buf), async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

/// Serves on an already-bound listener until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the root is missing or the server fails.
pub async fn serve_http_on(
    listener: TcpListener,
    root: Option<PathBuf>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    // Fail before accepting connections if the root is unusable.
    FilesystemServer::new(root.as_deref())?;

    let ct = tokio_util::sync::CancellationToken::new();
    let service = StreamableHttpService::new(
        move || FilesystemServer::new(root.as_deref()),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig {
            cancellation_token: ct.child_token(),
            ..Default::default()
        },
    );

    let router = axum::Router::new().nest_service("/mcp", service);
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown.await;
            ct.cancel();
        })
        .await?;

    Ok(())
}
