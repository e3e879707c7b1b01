use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use experian_mcp::config::ExperianConfig;
use experian_mcp::experian_client::ExperianClient;
use experian_mcp::mcp_server::McpServer;
use experian_mcp::report_request::CreditReportRequest;
use experian_mcp::services::{FixtureReportSource, LiveReportSource, ReportSource};
use experian_mcp::session::ExperianSession;
use experian_mcp::transport::{self, Transport};

/// Experian credit score tool host.
#[derive(Debug, Parser)]
#[command(name = "experian-mcp-server", version, about)]
struct Args {
    /// Transport to serve on.
    #[arg(long, value_enum, default_value = "stdio")]
    transport: Transport,

    /// Bind host for streamable-http.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Bind port for streamable-http.
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Credit report request body to send (overrides EXPERIAN_REQUEST_FIXTURE).
    #[arg(long)]
    request_fixture: Option<PathBuf>,

    /// Serve this saved credit report instead of calling Experian.
    #[arg(long)]
    report_fixture: Option<PathBuf>,
}

/// Main entry point for the tool host.
///
/// Loads configuration, obtains the first Experian token (live mode), and
/// serves the `credit_score` tool on the selected transport.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the stdio protocol, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "experian_mcp=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = match ExperianConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(path) = args.request_fixture {
        config.request_fixture = Some(path);
    }
    tracing::info!("Configuration loaded successfully");

    let source: Arc<dyn ReportSource> = match args.report_fixture {
        Some(path) => {
            tracing::info!("Offline mode: serving credit reports from {}", path.display());
            Arc::new(FixtureReportSource::new(path))
        }
        None => Arc::new(connect_live(&config).await),
    };

    let server = McpServer::credit_host(source);

    match args.transport {
        Transport::Stdio => transport::serve_stdio(server).await?,
        Transport::StreamableHttp => {
            let listener = transport::bind(&args.host, args.port).await?;
            transport::serve_http(server, listener).await?;
        }
    }

    Ok(())
}

/// Builds the live report source, exiting with status 1 on missing
/// credentials or a failed startup token request.
async fn connect_live(config: &ExperianConfig) -> LiveReportSource {
    if let Err(e) = config.require_credentials() {
        tracing::error!("{}", e);
        std::process::exit(1);
    }

    let template = match CreditReportRequest::from_config(config) {
        Ok(template) => template,
        Err(e) => {
            tracing::error!("Failed to load credit report request: {}", e);
            std::process::exit(1);
        }
    };

    let client = match ExperianClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to initialize Experian client: {}", e);
            std::process::exit(1);
        }
    };

    match ExperianSession::connect(client).await {
        Ok(session) => {
            tracing::info!("✓ Experian session established: {}", config.base_url);
            LiveReportSource::new(Arc::new(session), template)
        }
        Err(e) => {
            tracing::error!("Failed to obtain Experian access token: {}", e);
            std::process::exit(1);
        }
    }
}
