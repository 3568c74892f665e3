//! Asset resolver: maps a run directory to an [`AssetBundle`].
//!
//! Every category has an ordered candidate list (see [`AssetConventions`]). The first existing
//! file wins, except for metadata where all existing files are merged in order. Resolution
//! never fails: missing files leave the field empty, malformed files leave it empty and add a
//! diagnostic.

pub mod candidates;
pub mod model;

pub use candidates::{Candidate, CandidateTable, Decoded, Decoder};
pub use model::{ModelArtifact, ModelFormat};

use crate::config::AssetConventions;
use crate::data::{SampleMatrix, SeriesSummary, TargetValues};
use crate::diagnostics::{Diagnostic, DiagnosticLog};
use crate::error::ExplainError;
use crate::explain::AttributionArray;
use chrono::{DateTime, Utc};
use ndarray::ArrayD;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Artifacts found in one run directory. Absence (`None`) is distinct from empty.
#[derive(Debug, Clone)]
pub struct AssetBundle {
    pub directory: PathBuf,
    pub inspected_at: DateTime<Utc>,
    pub model: Option<ModelArtifact>,
    /// Raw attribution values, rank not yet checked.
    pub attributions: Option<ArrayD<f64>>,
    pub base_values: Option<ArrayD<f64>>,
    pub features: Option<Vec<String>>,
    pub samples: Option<SampleMatrix>,
    pub targets: Option<TargetValues>,
    pub predictions: Option<TargetValues>,
    pub metadata: Map<String, Value>,
    pub diagnostics: Vec<Diagnostic>,
}

impl AssetBundle {
    /// The attribution values as a rank-checked array, if present.
    pub fn attributions(&self) -> Option<Result<AttributionArray, ExplainError>> {
        self.attributions
            .clone()
            .map(AttributionArray::try_from)
    }

    /// Feature names, or an empty list when the feature file was malformed.
    pub fn feature_names(&self) -> &[String] {
        self.features.as_deref().unwrap_or_default()
    }

    pub fn summary(&self) -> BundleSummary {
        BundleSummary {
            directory: self.directory.clone(),
            inspected_at: self.inspected_at,
            model: self.model.clone(),
            attributions: self.attributions.as_ref().map(|a| a.shape().to_vec()),
            base_values: self.base_values.as_ref().map(|a| a.shape().to_vec()),
            feature_count: self.features.as_ref().map(Vec::len),
            samples: self
                .samples
                .as_ref()
                .map(|s| vec![s.row_count(), s.column_count()]),
            targets: self.targets.as_ref().map(TargetValues::summary),
            predictions: self.predictions.as_ref().map(TargetValues::summary),
            metadata_keys: self.metadata.keys().cloned().collect(),
            diagnostics: self.diagnostics.clone(),
        }
    }
}

/// Serializable overview of a bundle: shapes instead of values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleSummary {
    pub directory: PathBuf,
    pub inspected_at: DateTime<Utc>,
    pub model: Option<ModelArtifact>,
    pub attributions: Option<Vec<usize>>,
    pub base_values: Option<Vec<usize>>,
    pub feature_count: Option<usize>,
    pub samples: Option<Vec<usize>>,
    pub targets: Option<SeriesSummary>,
    pub predictions: Option<SeriesSummary>,
    pub metadata_keys: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Resolves run directories with a fixed set of naming conventions.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    conventions: AssetConventions,
    attributions: CandidateTable,
    base_values: CandidateTable,
    samples: CandidateTable,
    targets: CandidateTable,
    predictions: CandidateTable,
    metadata: CandidateTable,
}

impl Default for AssetResolver {
    fn default() -> Self {
        Self::new(AssetConventions::default())
    }
}

impl AssetResolver {
    pub fn new(conventions: AssetConventions) -> Self {
        Self {
            attributions: CandidateTable::from_names(&conventions.attributions),
            base_values: CandidateTable::from_names(&conventions.base_values),
            samples: CandidateTable::from_names(&conventions.samples),
            targets: CandidateTable::from_names(&conventions.targets),
            predictions: CandidateTable::from_names(&conventions.predictions),
            metadata: CandidateTable::from_names(&conventions.metadata),
            conventions,
        }
    }

    /// Load everything present in `dir`.
    pub fn resolve(&self, dir: &Path) -> AssetBundle {
        tracing::info!(path = %dir.display(), "Resolving run assets");
        let mut log = DiagnosticLog::default();

        let model = self.resolve_model(dir, &mut log);
        let attributions =
            first_match(dir, "attribution values", &self.attributions, &mut log, into_array);
        let base_values = first_match(dir, "base values", &self.base_values, &mut log, into_array);
        let features = self.resolve_features(dir, &mut log);
        let samples = first_match(dir, "sample matrix", &self.samples, &mut log, |decoded| {
            match decoded {
                Decoded::Table(table) => Ok(SampleMatrix::Tabular(table)),
                Decoded::Array(array) => {
                    SampleMatrix::from_array(array).map_err(|e| e.to_string())
                }
                other => Err(unexpected(&other)),
            }
        });
        let targets = first_match(dir, "targets", &self.targets, &mut log, into_series);
        let predictions = first_match(dir, "predictions", &self.predictions, &mut log, into_series);
        let metadata = self.resolve_metadata(dir, &mut log);

        let bundle = AssetBundle {
            directory: dir.to_path_buf(),
            inspected_at: Utc::now(),
            model,
            attributions,
            base_values,
            features,
            samples,
            targets,
            predictions,
            metadata,
            diagnostics: log.into_vec(),
        };
        tracing::debug!(
            model = bundle.model.is_some(),
            attributions = bundle.attributions.is_some(),
            samples = bundle.samples.is_some(),
            metadata_keys = bundle.metadata.len(),
            diagnostics = bundle.diagnostics.len(),
            "Assets resolved"
        );
        bundle
    }

    fn resolve_model(&self, dir: &Path, log: &mut DiagnosticLog) -> Option<ModelArtifact> {
        let found = match model::find_model_file(dir, &self.conventions.model_suffixes) {
            Ok(found) => found,
            Err(e) => {
                log.decode_failure(format!("cannot list {}: {e}", dir.display()));
                return None;
            }
        };
        let Some((path, suffix)) = found else {
            log.missing_asset(format!(
                "no model file ending in {}",
                self.conventions.model_suffixes.join(" or ")
            ));
            return None;
        };

        let Some(format) = ModelFormat::from_suffix(&suffix) else {
            log.decode_failure(format!(
                "{}: no model decoder for suffix '{suffix}'",
                display_name(&path)
            ));
            return None;
        };
        match ModelArtifact::open(&path, format) {
            Ok(artifact) => {
                tracing::debug!(
                    file = %artifact.file_name,
                    sha256 = %artifact.sha256,
                    "Model verified"
                );
                Some(artifact)
            }
            Err(e) => {
                log.decode_failure(format!("{}: {e}", display_name(&path)));
                None
            }
        }
    }

    fn resolve_features(&self, dir: &Path, log: &mut DiagnosticLog) -> Option<Vec<String>> {
        let path = dir.join(&self.conventions.feature_list);
        if !path.is_file() {
            let count = self.conventions.placeholder_feature_count;
            log.missing_asset(format!(
                "{} not found; using {count} placeholder names",
                self.conventions.feature_list
            ));
            return Some((0..count).map(|i| format!("feature_{i}")).collect());
        }

        let parsed = Decoder::Json
            .decode(&path)
            .map_err(|e| e.to_string())
            .and_then(|decoded| match decoded {
                Decoded::Json(Value::Array(items)) => Ok(items.iter().map(feature_name).collect()),
                Decoded::Json(other) => Err(format!(
                    "expected a JSON array, found {}",
                    json_kind(&other)
                )),
                other => Err(unexpected(&other)),
            });
        match parsed {
            Ok(features) => Some(features),
            Err(e) => {
                log.decode_failure(format!("{}: {e}", self.conventions.feature_list));
                None
            }
        }
    }

    fn resolve_metadata(&self, dir: &Path, log: &mut DiagnosticLog) -> Map<String, Value> {
        let mut merged = Map::new();
        for (candidate, path) in self.metadata.all_existing(dir) {
            match candidate.decoder.decode(&path) {
                Ok(Decoded::Json(Value::Object(fields))) => {
                    tracing::debug!(
                        file = %candidate.file_name,
                        keys = fields.len(),
                        "Merging metadata"
                    );
                    merged.extend(fields);
                }
                Ok(Decoded::Json(other)) => log.decode_failure(format!(
                    "{}: expected a JSON object, found {}",
                    candidate.file_name,
                    json_kind(&other)
                )),
                Ok(other) => log.decode_failure(format!(
                    "{}: {}",
                    candidate.file_name,
                    unexpected(&other)
                )),
                Err(e) => log.decode_failure(format!("{}: {e}", candidate.file_name)),
            }
        }
        merged
    }
}

/// Resolve `dir` with the default naming conventions.
pub fn resolve_assets(dir: &Path) -> AssetBundle {
    AssetResolver::default().resolve(dir)
}

/// Decode the first existing candidate and shape it with `convert`.
fn first_match<T>(
    dir: &Path,
    category: &str,
    table: &CandidateTable,
    log: &mut DiagnosticLog,
    convert: impl FnOnce(Decoded) -> Result<T, String>,
) -> Option<T> {
    let Some((candidate, path)) = table.first_existing(dir) else {
        log.missing_asset(format!("no {category} file ({})", table.describe()));
        return None;
    };

    let shaped = candidate
        .decoder
        .decode(&path)
        .map_err(|e| e.to_string())
        .and_then(convert);
    match shaped {
        Ok(value) => {
            tracing::debug!(file = %candidate.file_name, category, "Loaded asset");
            Some(value)
        }
        Err(e) => {
            log.decode_failure(format!("{}: {e}", candidate.file_name));
            None
        }
    }
}

fn into_array(decoded: Decoded) -> Result<ArrayD<f64>, String> {
    match decoded {
        Decoded::Array(array) => Ok(array),
        other => Err(unexpected(&other)),
    }
}

fn into_series(decoded: Decoded) -> Result<TargetValues, String> {
    match decoded {
        Decoded::Table(table) => Ok(TargetValues::from_table(table)),
        Decoded::Array(array) => Ok(TargetValues::from_array(array)),
        other => Err(unexpected(&other)),
    }
}

fn unexpected(decoded: &Decoded) -> String {
    format!("unexpected {}", decoded.kind())
}

fn feature_name(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
