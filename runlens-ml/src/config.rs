//! Configuration for runlens.
//!
//! Uses `figment` for layered configuration: defaults -> user config -> workspace config ->
//! explicit file -> environment. Configuration is loaded from
//! `~/.config/runlens/config.toml` and/or `.runlens/config.toml` in the workspace directory.

use crate::explain::ClassReduction;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level runlens configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LensConfig {
    /// File naming conventions of a run directory.
    #[serde(default)]
    pub assets: AssetConventions,
    /// Reduction options.
    #[serde(default)]
    pub explain: ExplainConfig,
    /// Presentation options for the CLI.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Ordered candidate file names per artifact category. The first existing file wins,
/// except for metadata where every existing file is merged in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetConventions {
    #[serde(default = "default_model_suffixes")]
    pub model_suffixes: Vec<String>,
    #[serde(default = "default_attributions")]
    pub attributions: Vec<String>,
    #[serde(default = "default_base_values")]
    pub base_values: Vec<String>,
    #[serde(default = "default_feature_list")]
    pub feature_list: String,
    /// Number of `feature_N` placeholders synthesized when the feature list file is absent.
    #[serde(default = "default_placeholder_features")]
    pub placeholder_feature_count: usize,
    #[serde(default = "default_samples")]
    pub samples: Vec<String>,
    #[serde(default = "default_targets")]
    pub targets: Vec<String>,
    #[serde(default = "default_predictions")]
    pub predictions: Vec<String>,
    #[serde(default = "default_metadata")]
    pub metadata: Vec<String>,
    #[serde(default = "default_training_curve")]
    pub training_curve: String,
}

impl Default for AssetConventions {
    fn default() -> Self {
        Self {
            model_suffixes: default_model_suffixes(),
            attributions: default_attributions(),
            base_values: default_base_values(),
            feature_list: default_feature_list(),
            placeholder_feature_count: default_placeholder_features(),
            samples: default_samples(),
            targets: default_targets(),
            predictions: default_predictions(),
            metadata: default_metadata(),
            training_curve: default_training_curve(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_model_suffixes() -> Vec<String> {
    strings(&[".h5", ".pkl"])
}

fn default_attributions() -> Vec<String> {
    strings(&["shap_values.npy", "shap_values_global.npy"])
}

fn default_base_values() -> Vec<String> {
    strings(&["base_values.npy", "expected_value.npy"])
}

fn default_feature_list() -> String {
    "features.json".to_string()
}

fn default_placeholder_features() -> usize {
    16
}

fn default_samples() -> Vec<String> {
    strings(&["X_sample.csv", "X_sample.npy"])
}

fn default_targets() -> Vec<String> {
    strings(&["y_sample.csv", "y_sample.npy"])
}

fn default_predictions() -> Vec<String> {
    strings(&["predictions.csv", "predictions.npy"])
}

fn default_metadata() -> Vec<String> {
    strings(&["results.json", "privacy.json", "federated_accuracy.json"])
}

fn default_training_curve() -> String {
    "federated_training_results.csv".to_string()
}

/// Reduction options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplainConfig {
    /// Class-axis reduction for local explanations of rank-3 arrays.
    #[serde(default)]
    pub local_class_reduction: ClassReduction,
    /// Show only this many features in the global table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
}

/// Output format of CLI reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format '{other}' (expected text or json)")),
        }
    }
}

/// Presentation options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// Width in characters of the longest bar in text tables.
    #[serde(default = "default_bar_width")]
    pub bar_width: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            bar_width: default_bar_width(),
        }
    }
}

fn default_bar_width() -> usize {
    40
}

/// Path of the workspace-level config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".runlens").join("config.toml")
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "runlens", "runlens")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `RUNLENS_`, `__` between sections)
/// 2. An explicit config file (`--config`)
/// 3. Workspace-local config (`.runlens/config.toml`)
/// 4. User config (`~/.config/runlens/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    explicit: Option<&Path>,
) -> Result<LensConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(LensConfig::default()));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = explicit {
        figment = figment.merge(Toml::file(path));
    }

    // RUNLENS_OUTPUT__FORMAT, RUNLENS_EXPLAIN__TOP_K, ...
    figment = figment.merge(Env::prefixed("RUNLENS_").split("__"));

    figment.extract().map_err(Box::new)
}

/// Whether a user-level or workspace-level config file exists.
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if user_config_path().is_some_and(|p| p.exists()) {
        return true;
    }
    workspace.is_some_and(|ws| workspace_config_path(ws).exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_conventions() {
        let conventions = AssetConventions::default();
        assert_eq!(
            conventions.attributions,
            vec!["shap_values.npy", "shap_values_global.npy"]
        );
        assert_eq!(conventions.feature_list, "features.json");
        assert_eq!(conventions.placeholder_feature_count, 16);
        assert_eq!(
            conventions.metadata,
            vec!["results.json", "privacy.json", "federated_accuracy.json"]
        );
        assert_eq!(conventions.model_suffixes, vec![".h5", ".pkl"]);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = LensConfig::default();
        config.explain.top_k = Some(10);
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: LensConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: LensConfig = toml::from_str(
            r#"
[assets]
attributions = ["explanations.npy"]

[explain]
local_class_reduction = "signed_mean"
"#,
        )
        .unwrap();
        assert_eq!(config.assets.attributions, vec!["explanations.npy"]);
        assert_eq!(config.assets.samples, vec!["X_sample.csv", "X_sample.npy"]);
        assert_eq!(
            config.explain.local_class_reduction,
            ClassReduction::SignedMean
        );
        assert_eq!(config.output.bar_width, 40);
    }

    #[test]
    fn test_load_config_from_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(".runlens");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("config.toml"),
            r#"
[output]
format = "json"
bar_width = 20

[explain]
top_k = 5
"#,
        )
        .unwrap();

        let config = load_config(Some(dir.path()), None).unwrap();
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.output.bar_width, 20);
        assert_eq!(config.explain.top_k, Some(5));
        assert!(config_exists(Some(dir.path())));
    }

    #[test]
    fn test_explicit_file_overrides_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("custom.toml");
        std::fs::write(&explicit, "[assets]\nplaceholder_feature_count = 8\n").unwrap();

        let config = load_config(Some(dir.path()), Some(&explicit)).unwrap();
        assert_eq!(config.assets.placeholder_feature_count, 8);
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("text".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
