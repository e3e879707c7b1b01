//! Transports that carry JSON-RPC messages to the dispatcher.
//!
//! * stdio: one message per line on stdin, one response per line on stdout.
//! * streamable-http: axum `POST /mcp` with one message per request body.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use clap::ValueEnum;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::handlers::{self, AppState};
use crate::mcp_server::McpServer;

/// Largest accepted `POST /mcp` body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    Stdio,
    #[value(name = "streamable-http", alias = "http")]
    StreamableHttp,
}

/// Serves newline-delimited JSON-RPC on the process's stdin/stdout until EOF.
pub async fn serve_stdio(server: McpServer) -> anyhow::Result<()> {
    tracing::info!("Serving on stdio");
    let reader = BufReader::new(tokio::io::stdin());
    serve_lines(&server, reader, tokio::io::stdout()).await
}

/// Line loop behind [`serve_stdio`], generic over the streams.
pub async fn serve_lines<R, W>(server: &McpServer, reader: R, mut writer: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(response) = server.handle_line(line).await {
            writer.write_all(response.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
    }

    tracing::info!("stdin closed; shutting down");
    Ok(())
}

/// Builds the HTTP app: `POST /mcp` and `GET /health`.
pub fn router(server: McpServer) -> Router {
    let app_state = Arc::new(AppState { server });

    let mcp_routes = Router::new()
        .route("/mcp", post(handlers::mcp_post))
        .layer(ServiceBuilder::new().layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(mcp_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Binds `host:port`. `host` may be a hostname or an IPv4/IPv6 literal.
pub async fn bind(host: &str, port: u16) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind((host, port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}:{}: {}", host, port, e))?;
    Ok(listener)
}

/// Serves the HTTP app on `listener` until the process exits.
pub async fn serve_http(server: McpServer, listener: TcpListener) -> anyhow::Result<()> {
    tracing::info!("Server listening on http://{}/mcp", listener.local_addr()?);

    axum::serve(listener, router(server)).await?;

    Ok(())
}
