//! Errand — terminal AI assistant with a dynamically loaded tool registry.
//!
//! Usage:
//!   errand chat           Start an interactive session
//!   errand ask -m MSG     Send a single message and exit
//!   errand tools          List the loaded tool specifications
//!   errand init           Write a default config file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::info;

use errand::agent::{Session, TurnOutcome};
use errand::backend::OpenAiBackend;
use errand::config::{self, ErrandConfig};
use errand::tools::{load_toolkits, ToolRegistry};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "errand")]
#[command(version = "0.1.0")]
#[command(about = "Terminal AI assistant with a dynamically loaded tool registry")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the config file (default: ~/.errand/errand.toml).
    #[arg(long)]
    config: Option<String>,

    /// Log level (debug, info, warn, error).
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start an interactive session.
    Chat,

    /// Send a single message and exit.
    Ask {
        /// The message to send.
        #[arg(short, long)]
        message: String,
    },

    /// List the loaded tool specifications.
    Tools,

    /// Write a default config file.
    Init,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let config_path = cli
        .config
        .map(|p| PathBuf::from(shellexpand::tilde(&p).into_owned()))
        .unwrap_or_else(config::default_config_path);

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => cmd_chat(&config_path).await,
        Commands::Ask { message } => cmd_ask(&config_path, &message).await,
        Commands::Tools => cmd_tools(&config_path),
        Commands::Init => cmd_init(&config_path),
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

async fn cmd_chat(config_path: &std::path::Path) -> Result<()> {
    let (config, session) = bootstrap(config_path)?;
    let mut session = session;

    println!(
        "{} Hi! I can look things up on Wikipedia and run shell commands \
         (with your confirmation).",
        "Assistant:".green().bold()
    );
    println!("(Type '{}' to exit)", errand::agent::EXIT_COMMAND);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n{} ", "You:".cyan().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if input != errand::agent::EXIT_COMMAND {
            print!("\n{} ", "Assistant:".green().bold());
            std::io::stdout().flush()?;
        }

        match run_turn(&mut session, input).await? {
            Some(TurnOutcome::Closed) => break,
            Some(TurnOutcome::Reply(text)) => {
                if text.is_empty() {
                    print!("(no reply)");
                }
                println!();
            }
            Some(TurnOutcome::Cancelled) => {
                println!("\n{}", "(turn cancelled)".yellow());
            }
            // Backend error already reported; the session stays open.
            None => {}
        }
    }

    info!("Session closed for '{}'", config.name);
    Ok(())
}

async fn cmd_ask(config_path: &std::path::Path, message: &str) -> Result<()> {
    let (_, mut session) = bootstrap(config_path)?;

    let cancel = CancellationToken::new();
    let mut sink = |chunk: &str| {
        print!("{chunk}");
        std::io::stdout().flush().ok();
    };
    match session.submit(message, &cancel, &mut sink).await {
        Ok(_) => {
            println!();
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(e)).context("Backend request failed"),
    }
}

fn cmd_tools(config_path: &std::path::Path) -> Result<()> {
    let config = config::load_config(config_path)?;
    let registry = build_registry(&config)?;

    println!("{} tools loaded:", registry.len());
    for spec in registry.specs() {
        println!("\n  {}", spec.name.bold());
        if !spec.description.is_empty() {
            println!("    {}", spec.description);
        }
        for p in &spec.parameters {
            let flag = if p.required { "required" } else { "optional" };
            println!("    - {} ({}, {}): {}", p.name, p.kind, flag, p.description);
        }
    }
    Ok(())
}

fn cmd_init(config_path: &std::path::Path) -> Result<()> {
    if config_path.exists() {
        eprintln!(
            "{} Config already exists at {}",
            "Error:".red().bold(),
            config_path.display()
        );
        std::process::exit(1);
    }
    config::save_config(&ErrandConfig::default(), config_path)?;
    println!("Wrote default config to {}", config_path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load config, build the registry (fail fast on any load error), and
/// open a session against the configured backend.
fn bootstrap(config_path: &std::path::Path) -> Result<(ErrandConfig, Session)> {
    let config = config::load_config(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let registry = build_registry(&config)?;
    let backend = Arc::new(OpenAiBackend::new(&config));
    let session = Session::new(&config, backend, registry);

    Ok((config, session))
}

fn build_registry(config: &ErrandConfig) -> Result<Arc<ToolRegistry>> {
    let handles = load_toolkits(&config.toolkits).context("Tool loading failed")?;
    Ok(Arc::new(ToolRegistry::new(handles)))
}

/// Run one turn, streaming the reply to stdout. Ctrl+C cancels the turn
/// without closing the session; backend errors are reported and yield
/// `None` so the caller keeps the session open.
async fn run_turn(session: &mut Session, input: &str) -> Result<Option<TurnOutcome>> {
    let cancel = CancellationToken::new();
    let mut sink = |chunk: &str| {
        print!("{chunk}");
        std::io::stdout().flush().ok();
    };

    let turn = session.submit(input, &cancel, &mut sink);
    tokio::pin!(turn);

    let outcome = tokio::select! {
        out = &mut turn => out,
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            turn.await
        }
    };

    match outcome {
        Ok(outcome) => Ok(Some(outcome)),
        Err(e) => {
            println!(
                "\n{} {}\nCheck that the backend server is running and the model is loaded.",
                "Backend error:".red().bold(),
                e
            );
            Ok(None)
        }
    }
}
