mod config;
mod conversation;
mod error;
mod llm;
mod params;
mod prompts;
mod session;
mod streaming;
mod ui;

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{ApiToken, Config, TOKEN_ENV_VAR};
use crate::prompts::GREETING;
use crate::session::ChatSession;

#[derive(Parser)]
#[command(name = "arctic-chat")]
#[command(version = "0.1.0")]
#[command(about = "Chat with Snowflake Arctic on Replicate from your terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Replicate API token (overrides REPLICATE_API_TOKEN and the config file)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Sampling temperature (0.01 - 5.0)
    #[arg(long, global = true)]
    temperature: Option<f32>,

    /// Nucleus sampling cutoff (0.01 - 1.0)
    #[arg(long = "top-p", global = true)]
    top_p: Option<f32>,

    /// Replicate model as owner/name
    #[arg(long, global = true)]
    model: Option<String>,

    /// Path to a config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and stream the answer to stdout
    Ask {
        #[arg(required = true, trailing_var_arg = true)]
        question: Vec<String>,
    },
    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init { force }) => init_config(cli.config, force),
        Some(Commands::Ask { ref question }) => {
            init_logging(None)?;
            let question = question.join(" ");
            let config = load_config(&cli)?;
            ask(&cli, &config, &question).await
        }
        None => {
            init_logging(Some(Config::home_dir()?.join("arctic-chat.log")))?;
            let config = load_config(&cli)?;
            chat(&cli, &config).await
        }
    }
}

/// Logs go to a file while the TUI owns the terminal, to stderr otherwise
fn init_logging(log_file: Option<PathBuf>) -> Result<()> {
    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).context("Failed to create log directory")?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter("arctic_chat=info"))
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter("arctic_chat=warn"))
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    if let Some(temperature) = cli.temperature {
        config.generation.set_temperature(temperature)?;
    }
    if let Some(top_p) = cli.top_p {
        config.generation.set_top_p(top_p)?;
    }
    config.model_parts()?;

    Ok(config)
}

/// Resolve the token: flag, then environment, then config file
fn resolve_token(cli: &Cli, config: &Config) -> Option<String> {
    cli.token
        .clone()
        .filter(|token| !token.trim().is_empty())
        .or_else(|| config.token_candidate())
}

async fn chat(cli: &Cli, config: &Config) -> Result<()> {
    let credential = match resolve_token(cli, config).map(|raw| ApiToken::parse(&raw)) {
        Some(Ok(token)) => Some(token),
        Some(Err(e)) => {
            warn!("ignoring configured API token: {}", e);
            None
        }
        None => None,
    };

    let session = ChatSession::new(config, credential)?;
    let app = ui::App::new(session, config);
    ui::run(app).await
}

async fn ask(cli: &Cli, config: &Config, question: &str) -> Result<()> {
    let Some(raw) = resolve_token(cli, config) else {
        bail!(
            "no Replicate API token: pass --token, set {} or run `arctic-chat init` and edit the config",
            TOKEN_ENV_VAR
        );
    };
    let token = ApiToken::parse(&raw)?;

    let mut session = ChatSession::new(config, Some(token))?;
    info!(session = %session.id(), "one-shot question");

    let mut stdout = std::io::stdout();
    let outcome = session
        .run_turn(question, |fragment| {
            print!("{}", fragment);
            let _ = stdout.flush();
        })
        .await;
    println!();

    outcome.map(|_| ()).map_err(|e| {
        error!(error = %e, "question failed");
        e.into()
    })
}

fn init_config(path: Option<PathBuf>, force: bool) -> Result<()> {
    let target = match &path {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };

    if target.exists() && !force {
        println!("⚙️  Config already exists at {} (use --force to overwrite)", target.display());
        return Ok(());
    }

    let config = Config::default();
    let written = match path {
        Some(path) => {
            config.save_to(&path)?;
            path
        }
        None => config.save()?,
    };
    println!("✅ Wrote default config to {}", written.display());
    println!("   Add your Replicate API token (r8_...) or set {}.", TOKEN_ENV_VAR);
    println!();
    println!("{}", GREETING);
    Ok(())
}
