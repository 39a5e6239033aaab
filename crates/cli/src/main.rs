//! `hookchain` CLI entry-point.
//!
//! Available sub-commands:
//! - `validate`: parse a chain definition and print its execution plan.
//! - `run`: execute a chain definition and print the yield as JSON.

mod definition;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use definition::ChainDefinition;

#[derive(Parser)]
#[command(
    name = "hookchain",
    about = "Staged hook pipelines with self-handling errors",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a chain definition JSON file and print its execution plan.
    Validate {
        /// Path to the chain definition file.
        path: PathBuf,
    },
    /// Execute a chain definition with simulated hook bodies.
    Run {
        /// Path to the chain definition file.
        path: PathBuf,
        /// Print the yield as indented JSON.
        #[arg(long)]
        pretty: bool,
    },
}

fn load(path: &Path) -> anyhow::Result<ChainDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read file {}", path.display()))?;
    ChainDefinition::from_json(&content).with_context(|| format!("invalid chain definition {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Validate { path } => {
            let chain = load(&path)?.build()?;
            println!("Chain '{}' is valid. Execution order:", chain.kind());
            for (position, hook) in chain.plan().iter().enumerate() {
                println!("  {:>2}. {:<10} {}", position + 1, hook.phase, hook.label);
            }
        }
        Command::Run { path, pretty } => {
            let mut chain = load(&path)?.build()?;
            info!("Running chain '{}' from {}", chain.kind(), path.display());

            let yielded = chain.exec().await;
            let rendered = if pretty {
                serde_json::to_string_pretty(&yielded)?
            } else {
                serde_json::to_string(&yielded)?
            };
            println!("{rendered}");
            info!("duration: {:?}", chain.duration().unwrap_or_default());

            if !yielded.success {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
