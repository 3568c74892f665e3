//! runlens CLI: inspect ML experiment outputs and their SHAP explanations from a terminal.

mod commands;
mod render;

use clap::Parser;
use runlens_ml::OutputFormat;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// runlens: explore the artifacts of a training run
#[derive(Parser, Debug)]
#[command(name = "runlens", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (searched for .runlens/config.toml)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format: text or json (overrides the configured format)
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Summarize the artifacts found in a run directory
    Inspect {
        /// Run directory
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
    /// Rank features by mean absolute SHAP value across samples
    Global {
        /// Run directory
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Show only the N most important features
        #[arg(short, long)]
        top: Option<usize>,
    },
    /// Break down the SHAP contributions for one sample
    Local {
        /// Run directory
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Zero-based sample index
        #[arg(short, long, default_value = "0")]
        sample: usize,
    },
    /// Show accuracy per federated training round
    Curve {
        /// Run directory
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create a default configuration file in the workspace
    Init,
    /// Show the effective configuration
    Show,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "runlens", "runlens")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "runlens.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let mut config = runlens_ml::load_config(Some(&workspace), cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    if let Some(format) = cli.format {
        config.output.format = format;
    }

    commands::handle_command(cli.command, &workspace, &config)
}
