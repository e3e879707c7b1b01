//! Utility to fetch a raw Experian credit report and print it.
//!
//! Runs the token and credit-report calls directly, without the tool host.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use experian_mcp::config::ExperianConfig;
use experian_mcp::experian_client::ExperianClient;
use experian_mcp::reducer::reduce_report;
use experian_mcp::report_request::CreditReportRequest;

#[derive(Debug, Parser)]
#[command(name = "fetch-report", version, about)]
struct Args {
    /// Request body to send instead of the built-in sandbox applicant.
    #[arg(long)]
    request: Option<PathBuf>,

    /// Also print the reduced credit summary.
    #[arg(long)]
    reduce: bool,
}

/// Main entry point for the report fetcher.
///
/// Exits with status 1 when credentials are missing or the token request fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "experian_mcp=info,fetch_report=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = ExperianConfig::from_env()?;
    if let Some(path) = args.request {
        config.request_fixture = Some(path);
    }
    if let Err(e) = config.require_credentials() {
        tracing::error!("{}", e);
        std::process::exit(1);
    }

    tracing::info!(
        "Company ID: {}",
        config.company_id.as_deref().unwrap_or("(not set)")
    );
    tracing::info!(
        "Subscriber code: {}",
        config.subscriber_code.as_deref().unwrap_or("(not set)")
    );

    let request = CreditReportRequest::from_config(&config)?;
    let client = ExperianClient::new(&config)?;

    let token = match client.fetch_token().await {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Failed to obtain access token: {}", e);
            std::process::exit(1);
        }
    };

    let report = client.request_report(&token, &request).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if args.reduce {
        let requested = request.applicant_ssn().unwrap_or_default().to_string();
        let reduced = reduce_report(&report, &requested);
        println!("{}", serde_json::to_string_pretty(&reduced)?);
    }

    Ok(())
}
