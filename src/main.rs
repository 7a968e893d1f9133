//! Strata CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Import dependency graph for Python and JavaScript/TypeScript projects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project root path (defaults to current directory)
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    /// Override where the graph cache is kept
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build or refresh the graph and print a summary
    Index {
        /// Ignore the cache and rebuild everything
        #[arg(short, long)]
        force: bool,

        /// Build without reading or writing the cache
        #[arg(long, conflicts_with = "force")]
        full: bool,
    },
    /// List the files a file imports
    Deps {
        file: PathBuf,
    },
    /// List the files that import a file
    Dependents {
        file: PathBuf,
    },
    /// Clear the cache
    Clear,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("strata={}", log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Strata v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Project root: {}", cli.root.display());

    let builder = commands::builder(&cli.root, cli.cache_dir)?;
    match cli.command {
        Commands::Index { force, full } => commands::index(&builder, force, full),
        Commands::Deps { file } => commands::deps(&builder, &file),
        Commands::Dependents { file } => commands::dependents(&builder, &file),
        Commands::Clear => commands::clear(&builder),
    }
}
