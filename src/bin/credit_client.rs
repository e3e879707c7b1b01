//! Client shell: runs a loan risk assessment through the credit tool host.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use experian_mcp::assessment::{run_assessment, Assessment, AssessmentOutcome};
use experian_mcp::config::LlmConfig;
use experian_mcp::llm::ChatCompletionClient;
use experian_mcp::mcp_client::{HttpMcpClient, McpClient, StdioMcpClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ClientTransport {
    Stdio,
    Http,
}

/// Run a loan risk assessment against the Experian credit tool host.
#[derive(Debug, Parser)]
#[command(name = "credit-client", version, about)]
struct Args {
    #[arg(long, value_enum, default_value = "stdio")]
    transport: ClientTransport,

    /// Tool host endpoint for the http transport.
    #[arg(long, default_value = "http://localhost:8000/mcp")]
    url: String,

    /// Server program to spawn for the stdio transport
    /// (defaults to experian-mcp-server next to this binary).
    #[arg(long)]
    server_command: Option<PathBuf>,

    /// Extra argument for the spawned server; repeat for more.
    #[arg(long = "server-arg", allow_hyphen_values = true)]
    server_args: Vec<String>,

    /// Applicant SSN to look up.
    #[arg(long, default_value = "123-45-6789")]
    ssn: String,

    /// Skip the chat-completion step even if GITHUB_TOKEN is set.
    #[arg(long)]
    no_llm: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "experian_mcp=info,credit_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let llm = if args.no_llm {
        None
    } else {
        let config = LlmConfig::from_env()?;
        if config.is_enabled() {
            Some(ChatCompletionClient::new(&config)?)
        } else {
            tracing::warn!("GITHUB_TOKEN not set; skipping the LLM step");
            None
        }
    };

    let outcome = match args.transport {
        ClientTransport::Http => {
            tracing::info!("Connecting to {}", args.url);
            let client = HttpMcpClient::new(args.url.clone())?;
            run_assessment(&client, llm.as_ref(), &args.ssn).await?
        }
        ClientTransport::Stdio => {
            let program = match args.server_command {
                Some(program) => program,
                None => default_server_command()?,
            };
            let client = StdioMcpClient::spawn(&program, &args.server_args).await?;
            let outcome = run_assessment(&client as &dyn McpClient, llm.as_ref(), &args.ssn).await;
            if let Err(e) = client.shutdown().await {
                tracing::warn!("Server shutdown: {}", e);
            }
            outcome?
        }
    };

    print_outcome(&outcome)?;
    Ok(())
}

/// `experian-mcp-server` in the same directory as this executable.
fn default_server_command() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    Ok(exe.with_file_name(format!(
        "experian-mcp-server{}",
        std::env::consts::EXE_SUFFIX
    )))
}

fn print_outcome(outcome: &AssessmentOutcome) -> anyhow::Result<()> {
    let ruler = "=".repeat(60);

    match &outcome.assessment {
        Some(Assessment::AfterToolCalls { content, .. }) => {
            println!("\n{}", ruler);
            println!("FINAL RISK ASSESSMENT FROM LLM:");
            println!("{}", ruler);
            println!("{}", content.as_deref().unwrap_or(""));
            println!("{}", ruler);
        }
        Some(Assessment::Direct(content)) => {
            println!("No tool calls found in LLM response");
            if let Some(content) = content {
                println!("LLM response: {}", content);
            }
        }
        None => {
            println!("Credit result:");
            println!("{}", serde_json::to_string_pretty(&outcome.credit_result)?);
            println!("\nPrompt:");
            println!("{}", outcome.prompt);
        }
    }

    Ok(())
}
