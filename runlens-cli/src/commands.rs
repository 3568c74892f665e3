//! Subcommand handlers for the runlens CLI.

use crate::Commands;
use crate::ConfigAction;
use crate::render;
use runlens_ml::explain::{SampleContext, reduce_local_with};
use runlens_ml::training::load_training_curve_from;
use runlens_ml::{
    AssetBundle, AssetResolver, AttributionArray, Diagnostic, GlobalImportanceTable, LensConfig,
    OutputFormat, Reduced, reduce_global,
};
use serde::Serialize;
use std::path::Path;

/// Handle a CLI subcommand.
pub fn handle_command(
    command: Commands,
    workspace: &Path,
    config: &LensConfig,
) -> anyhow::Result<()> {
    tracing::debug!(?command, format = %config.output.format, "Running command");
    match command {
        Commands::Inspect { dir } => handle_inspect(&dir, config),
        Commands::Global { dir, top } => handle_global(&dir, top.or(config.explain.top_k), config),
        Commands::Local { dir, sample } => handle_local(&dir, sample, config),
        Commands::Curve { dir } => handle_curve(&dir, config),
        Commands::Config { action } => handle_config(action, workspace, config),
    }
}

fn resolve(dir: &Path, config: &LensConfig) -> anyhow::Result<AssetBundle> {
    if !dir.is_dir() {
        anyhow::bail!("{} is not a directory", dir.display());
    }
    Ok(AssetResolver::new(config.assets.clone()).resolve(dir))
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn warn(diagnostics: &[Diagnostic]) {
    if !diagnostics.is_empty() {
        eprint!("{}", render::diagnostics(diagnostics));
    }
}

/// The run's attribution values. Resolution diagnostics are printed when they are missing.
fn attributions_of(bundle: &AssetBundle, dir: &Path) -> anyhow::Result<AttributionArray> {
    match bundle.attributions() {
        Some(result) => result.map_err(|e| anyhow::anyhow!("Unusable attribution values: {e}")),
        None => {
            warn(&bundle.diagnostics);
            anyhow::bail!("No attribution values found in {}", dir.display())
        }
    }
}

fn handle_inspect(dir: &Path, config: &LensConfig) -> anyhow::Result<()> {
    let summary = resolve(dir, config)?.summary();
    match config.output.format {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Text => {
            print!("{}", render::summary(&summary));
            Ok(())
        }
    }
}

fn handle_global(dir: &Path, top: Option<usize>, config: &LensConfig) -> anyhow::Result<()> {
    let bundle = resolve(dir, config)?;
    let attributions = attributions_of(&bundle, dir)?;

    let reduced = reduce_global(&attributions, bundle.feature_names())
        .map_err(|e| anyhow::anyhow!("Cannot compute global importance: {}", e))?;

    match config.output.format {
        OutputFormat::Json => print_json(&keep_top(reduced, top)),
        OutputFormat::Text => {
            warn(&reduced.diagnostics);
            print!("{}", render::global(&reduced.table, top, config.output.bar_width));
            Ok(())
        }
    }
}

/// Drop all but the `top` most important rows.
fn keep_top(
    mut reduced: Reduced<GlobalImportanceTable>,
    top: Option<usize>,
) -> Reduced<GlobalImportanceTable> {
    if let Some(k) = top {
        reduced.table.rows.truncate(k);
    }
    reduced
}

/// JSON shape of `runlens local`.
#[derive(Serialize)]
struct LocalReport<'a> {
    context: &'a SampleContext,
    table: &'a runlens_ml::LocalContributionTable,
    diagnostics: &'a [Diagnostic],
}

fn handle_local(dir: &Path, sample: usize, config: &LensConfig) -> anyhow::Result<()> {
    let bundle = resolve(dir, config)?;
    let attributions = attributions_of(&bundle, dir)?;
    let Some(samples) = bundle.samples.as_ref() else {
        warn(&bundle.diagnostics);
        anyhow::bail!("No sample matrix found in {}", dir.display());
    };

    let reduced = reduce_local_with(
        &attributions,
        samples,
        bundle.feature_names(),
        sample,
        config.explain.local_class_reduction,
    )
    .map_err(|e| anyhow::anyhow!("Cannot explain sample {}: {}", sample, e))?;
    let context = SampleContext::from_bundle(&bundle, sample);

    match config.output.format {
        OutputFormat::Json => print_json(&LocalReport {
            context: &context,
            table: &reduced.table,
            diagnostics: &reduced.diagnostics,
        }),
        OutputFormat::Text => {
            warn(&reduced.diagnostics);
            print!(
                "{}",
                render::local(&reduced.table, &context, config.output.bar_width)
            );
            Ok(())
        }
    }
}

fn handle_curve(dir: &Path, config: &LensConfig) -> anyhow::Result<()> {
    let result = load_training_curve_from(&dir.join(&config.assets.training_curve));
    match config.output.format {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Text => {
            print!("{}", render::curve(&result));
            Ok(())
        }
    }
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config: &LensConfig,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = runlens_ml::config::workspace_config_path(workspace);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let toml_str = toml::to_string_pretty(&LensConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            if !runlens_ml::config::config_exists(Some(workspace)) {
                println!("# No configuration file found; built-in defaults and environment apply.");
            }
            let toml_str = toml::to_string_pretty(config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}
