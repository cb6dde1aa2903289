//! Shopkeep CLI entry point

use std::future::Future;
use std::io::IsTerminal;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use shopkeep::adapters::cli::{open_tool_session, SETUP_ERROR_PREFIX};
use shopkeep::adapters::{ask, run_chat, AskOutcome, ChatOutcome, ToolServer};
use shopkeep::agent::{AgentRunner, OpenAiClient, TurnExecutor};
use shopkeep::config::Config;
use shopkeep::mcp::ToolHost;
use shopkeep::prompts::{BASE_INSTRUCTIONS, SESSION_NAME};
use shopkeep::{ui, SetupError};

#[derive(Parser)]
#[command(name = "shopkeep")]
#[command(about = "🛒 Shopkeep - shopping assistant for your MCP-enabled store")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Store base address (overrides STORE_NAME)
    #[arg(long, global = true)]
    store_url: Option<String>,

    /// Model to use (overrides SHOPKEEP_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Verbose logging (ignored when RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive shopping session (default)
    Chat,

    /// List the tools the store exposes
    Tools,

    /// Ask a single question and exit
    Ask {
        /// Question to send to the assistant
        #[arg(short, long)]
        message: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            ui::print_error(&format!("Failed to start runtime: {e}"));
            return ExitCode::FAILURE;
        }
    };

    let code = match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(e) => {
            ui::print_error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    };

    // A pending stdin read cannot be cancelled; don't wait for it.
    runtime.shutdown_background();
    code
}

fn init_logging(verbose: bool) {
    let default = if verbose { "shopkeep=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let interrupt = install_interrupt_handler();

    let mut config = shopkeep::config::load()?;
    if let Some(url) = cli.store_url {
        config.store_url = url;
    }
    if let Some(model) = cli.model {
        config.model = model;
    }
    config.validate()?;

    let server = ToolServer {
        name: SESSION_NAME.to_string(),
        endpoint: config.mcp_endpoint()?,
        timeout: config.request_timeout(),
    };
    let mut stdout = std::io::stdout();

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Tools => run_tools(&server, interrupted(interrupt)).await,
        Commands::Ask { message } => {
            let outcome = ask(
                &server,
                build_executor(&config)?,
                BASE_INSTRUCTIONS,
                &config.model,
                &message,
                &mut stdout,
                interrupted(interrupt),
            )
            .await?;
            Ok(match outcome {
                AskOutcome::Answered | AskOutcome::Interrupted => ExitCode::SUCCESS,
                AskOutcome::SetupFailed | AskOutcome::Failed => ExitCode::FAILURE,
            })
        }
        Commands::Chat => {
            let executor = build_executor(&config)?;
            ui::print_header(&config.store_url, &config.model);

            let show_progress = stdout.is_terminal();
            let input = tokio::io::BufReader::new(tokio::io::stdin());
            let outcome = run_chat(
                &server,
                executor,
                BASE_INSTRUCTIONS,
                &config.model,
                show_progress,
                input,
                &mut stdout,
                interrupted(interrupt),
            )
            .await?;
            tracing::debug!("Chat finished: {:?}", outcome);
            Ok(match outcome {
                ChatOutcome::SetupFailed => ExitCode::FAILURE,
                ChatOutcome::Finished(_) => ExitCode::SUCCESS,
            })
        }
    }
}

fn build_executor(config: &Config) -> Result<TurnExecutor<OpenAiClient>> {
    let client = OpenAiClient::new(
        &config.api_key,
        &config.api_base_url,
        &config.model,
        config.request_timeout(),
    )?;
    Ok(TurnExecutor::new(AgentRunner::new(client, config.max_iterations)))
}

async fn run_tools(server: &ToolServer, shutdown: impl Future<Output = ()>) -> Result<ExitCode> {
    let opened = open_tool_session(&server.name, server.endpoint.clone(), server.timeout, shutdown).await;
    let mut session = match opened {
        Ok(session) => session,
        Err(SetupError::Interrupted) => return Ok(ExitCode::SUCCESS),
        Err(e) => {
            ui::print_error(&format!("{SETUP_ERROR_PREFIX} {e}"));
            return Ok(ExitCode::FAILURE);
        }
    };

    let written = ui::write_tools(&mut std::io::stdout(), session.tools());
    session.close().await;
    written?;
    Ok(ExitCode::SUCCESS)
}

/// Install the Ctrl+C handler. The flag flips to `true` on the first hit.
fn install_interrupt_handler() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);

    if let Err(e) = ctrlc::set_handler(move || {
        let _ = tx.send(true);
    }) {
        tracing::warn!("Could not install Ctrl+C handler: {}", e);
    }
    rx
}

/// Resolves once Ctrl+C has been pressed.
async fn interrupted(mut rx: watch::Receiver<bool>) {
    // Sender gone means no handler: never fire.
    if rx.wait_for(|hit| *hit).await.is_err() {
        std::future::pending::<()>().await;
    }
}
