//! Propel - deployment promotion for GitOps configuration repositories
//!
//! Usage:
//!   propel propagate ...  # publish an artifact into its environment record
//!   propel check          # validate configuration and mapping coverage

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use propel_core::artifact::ArtifactDescriptor;
use propel_core::config::parse_propel_toml;
use propel_core::environment::{EnvironmentResolver, Trigger};
use propel_core::propagate::{PropagationCoordinator, PublishOutcome};

#[derive(Parser)]
#[command(name = "propel")]
#[command(about = "Deployment promotion for GitOps configuration repositories", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Propagate a built artifact into its environment's configuration record
    Propagate {
        /// Path to propel.toml
        #[arg(short, long, default_value = "propel.toml")]
        config: PathBuf,

        /// Source ref the build came from (e.g. "main")
        #[arg(long)]
        source_ref: String,

        /// Registry path of the built image (e.g. "ghcr.io/org/svc")
        #[arg(long)]
        repository: String,

        /// Immutable image tag (the triggering commit's hash)
        #[arg(long)]
        tag: String,

        /// Explicit target environment, bypassing the branch mapping
        #[arg(long)]
        env: Option<String>,

        /// Directory for transient working copies (defaults to the system
        /// temp directory)
        #[arg(long)]
        state_dir: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Validate configuration and mapping coverage without touching the network
    Check {
        /// Path to propel.toml
        #[arg(short, long, default_value = "propel.toml")]
        config: PathBuf,

        /// Refs that must resolve (defaults to every mapped ref)
        #[arg(long = "ref")]
        refs: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable line
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Propagate {
            config,
            source_ref,
            repository,
            tag,
            env,
            state_dir,
            format,
        } => {
            let config = parse_propel_toml(&config)?;
            let trigger = Trigger {
                source_ref,
                env_override: env,
            };
            let artifact = ArtifactDescriptor::new(repository, tag);
            let state_dir = state_dir.unwrap_or_else(std::env::temp_dir);

            let coordinator = PropagationCoordinator::new(config.propagation(), state_dir);
            let outcome = coordinator.propagate(&trigger, &artifact)?;

            match format {
                OutputFormat::Table => match &outcome {
                    PublishOutcome::NoOpNotNeeded => println!(
                        "no-op: record already carries {}:{}",
                        artifact.repository, artifact.tag
                    ),
                    PublishOutcome::Committed {
                        commit_id,
                        conflict_retries,
                    } => println!("committed {commit_id} ({conflict_retries} conflict retries)"),
                },
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
            }
            Ok(())
        }

        Commands::Check { config, refs } => {
            let config = parse_propel_toml(&config)?;
            let resolver = EnvironmentResolver::new(config.mapping.clone());
            let refs: Vec<String> = if refs.is_empty() {
                config.mapping.keys().cloned().collect()
            } else {
                refs
            };

            for source_ref in &refs {
                let environment = resolver
                    .resolve(&Trigger::new(source_ref.clone()))
                    .with_context(|| format!("ref '{source_ref}' does not resolve"))?;
                println!("{source_ref} -> {environment}");
            }
            println!("configuration OK ({} refs checked)", refs.len());
            Ok(())
        }
    }
}
