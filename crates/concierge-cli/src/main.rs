use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use concierge_campus::{ProfileStore, default_registry};
use concierge_core::{Orchestrator, classify, extract};
use config::ConciergeConfig;

#[derive(Parser)]
#[command(name = "concierge")]
#[command(version)]
#[command(about = "Campus concierge: routes student questions to the right assistant")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single question
    Ask {
        /// The question to answer
        query: String,
    },

    /// Show how a question would be classified, as JSON
    Classify {
        query: String,
    },

    /// Show the entities found in a question, as JSON
    Extract {
        query: String,
    },

    /// Answer questions from stdin until EOF or `exit`
    Chat,

    /// Initialize config directory and default config
    Init,

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output stays clean
    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(&cli.config).await,
        Commands::Ask { query } => cmd_ask(&cli.config, &query).await,
        Commands::Classify { query } => cmd_classify(&query),
        Commands::Extract { query } => cmd_extract(&query),
        Commands::Chat => cmd_chat(&cli.config).await,
    }
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
    } else {
        let default_config = include_str!("../../../config/default.toml");
        tokio::fs::write(&config_path, default_config)
            .await
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        info!("Created default config at {}", config_path.display());
    }

    println!("Concierge initialized at {}", config_dir.display());
    println!("Edit {} to choose the active student and dispatch mode.", config_path.display());
    Ok(())
}

async fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = ConciergeConfig::load(config_path)?;
    println!("{}", toml::to_string_pretty(&cfg)?);
    Ok(())
}

/// Wire the campus handlers into an orchestrator
fn build_orchestrator(cfg: &ConciergeConfig) -> (Orchestrator, Arc<ProfileStore>) {
    let profiles = Arc::new(ProfileStore::with_sample_students());
    let registry = default_registry(profiles.clone(), &cfg.campus_options());
    let orchestrator = Orchestrator::new(Arc::new(registry), cfg.orchestrator_config());
    (orchestrator, profiles)
}

async fn cmd_ask(config_path: &Option<PathBuf>, query: &str) -> Result<()> {
    let cfg = ConciergeConfig::load(config_path)?;
    let (orchestrator, _) = build_orchestrator(&cfg);
    let response = orchestrator.process(query).await?;
    println!("{}", response);
    Ok(())
}

fn cmd_classify(query: &str) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&classify(query))?);
    Ok(())
}

fn cmd_extract(query: &str) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&extract(query))?);
    Ok(())
}

async fn cmd_chat(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = ConciergeConfig::load(config_path)?;
    let (orchestrator, profiles) = build_orchestrator(&cfg);
    let student_id = cfg.student.id.as_str();

    match profiles.get(student_id).await {
        Some(profile) => println!("Hi {}! Ask me anything, or type `exit` to leave.", profile.name),
        None => println!("Ask me anything, or type `exit` to leave."),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut logged = 0usize;

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = signal::ctrl_c() => {
                println!();
                None
            }
        };
        let Some(line) = line else { break };

        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query, "exit" | "quit") {
            break;
        }

        match orchestrator.handle(query).await {
            Ok(turn) => {
                println!("{}\n", turn.response);
                let intent = turn.classification.intent.to_string();
                if profiles
                    .log_interaction(student_id, query, &turn.response, &intent)
                    .await
                    .is_some()
                {
                    logged += 1;
                }
            }
            Err(e) => {
                error!("Query failed: {:#}", e);
                println!("Sorry, something went wrong answering that. Please try again.\n");
            }
        }
    }

    info!("Chat ended, {} exchange(s) saved to {}'s history", logged, student_id);
    Ok(())
}
