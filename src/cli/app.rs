//! Main CLI application structure

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::recipe_cmd;
use crate::storage::Config;

#[derive(Parser)]
#[command(name = "tcrecipe")]
#[command(author, version, about = "Resolve anchored toolchain build recipes")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the configured format)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project configuration file (skips searching for tcrecipe.toml)
    #[arg(long, global = true, env = "TCRECIPE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a recipe and print the normalized document
    Resolve {
        /// Recipe file
        file: PathBuf,
    },

    /// Print a recipe's dependencies in order
    Deps {
        /// Recipe file
        file: PathBuf,

        /// Show build dependencies instead of runtime dependencies
        #[arg(long)]
        build: bool,
    },

    /// Print the resolved anchor table of a recipe
    Anchors {
        /// Recipe file
        file: PathBuf,
    },

    /// Check that recipes resolve
    Check {
        /// Recipe files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show the effective configuration
    Config,
}

/// Main entry point for the CLI
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::with_project_file(path)?,
        None => Config::load()?,
    };

    let format = cli
        .format
        .unwrap_or_else(|| config.global.default_format.into());
    let output = Output::new(format, cli.verbose);

    output.verbose("tcrecipe starting");
    if let Some(path) = &config.project_file {
        output.verbose_ctx("config", &format!("Using project config: {}", path.display()));
    }

    let options = config.resolve().normalize_options();

    let code = match cli.command {
        Commands::Resolve { file } => {
            output.verbose_ctx("resolve", &format!("Resolving: {}", file.display()));
            recipe_cmd::resolve(&output, &options, &file)?;
            ExitCode::SUCCESS
        }

        Commands::Deps { file, build } => {
            output.verbose_ctx("deps", &format!("Listing dependencies: {}, build={}", file.display(), build));
            recipe_cmd::deps(&output, &options, &file, build)?;
            ExitCode::SUCCESS
        }

        Commands::Anchors { file } => {
            output.verbose_ctx("anchors", &format!("Resolving anchors: {}", file.display()));
            recipe_cmd::anchors(&output, &file)?;
            ExitCode::SUCCESS
        }

        Commands::Check { files } => {
            output.verbose_ctx("check", &format!("Checking {} recipe(s)", files.len()));
            if recipe_cmd::check(&output, &options, &files)? {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }

        Commands::Config => {
            recipe_cmd::show_config(&output, &config)?;
            ExitCode::SUCCESS
        }
    };

    output.verbose("Command completed");
    Ok(code)
}

/// Sends library `tracing` events to stderr
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}
