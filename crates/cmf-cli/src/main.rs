//! # cmf-cli
//!
//! Command-line entry point for the CMF MCP server.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use cmf_core::TransportKind;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

/// CMF MCP server - query Common Metadata Framework servers over MCP
#[derive(Parser)]
#[command(name = "cmf-mcp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file layered over the user and project files
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP (default)
    Serve(ServeArgs),
    /// Check configuration and reachability of every CMF server
    Doctor,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show version information
    Version,
}

#[derive(Args, Default)]
pub(crate) struct ServeArgs {
    /// Transport to serve on (stdio, http)
    #[arg(short, long)]
    transport: Option<TransportKind>,

    /// Bind host for the HTTP transport
    #[arg(long)]
    host: Option<String>,

    /// Bind port for the HTTP transport
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Show the effective configuration
    Show,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout carries the stdio protocol
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!(error = %e, "Failed to load .env file");
        }
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run(cli));
    exit_runtime(runtime);
    result
}

/// Tear the runtime down without joining blocking threads.
///
/// A pending stdin read sits on a blocking thread until the client writes or
/// closes the pipe, so joining it would keep the process alive after a
/// shutdown signal.
fn exit_runtime(runtime: tokio::runtime::Runtime) {
    runtime.shutdown_background();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Some(Commands::Version) => {
            println!("cmf-mcp {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Config { action }) => {
            commands::config::handle(action, config_path)?;
        }
        Some(Commands::Doctor) => {
            commands::doctor::run(config_path).await?;
        }
        Some(Commands::Serve(args)) => {
            commands::serve::run(config_path, args).await?;
        }
        None => {
            commands::serve::run(config_path, ServeArgs::default()).await?;
        }
    }

    Ok(())
}
