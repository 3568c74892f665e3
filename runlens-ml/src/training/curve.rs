//! Accuracy-per-round curve read from the federated training log.

use crate::config::AssetConventions;
use crate::data::Table;
use crate::diagnostics::{Diagnostic, DiagnosticLog};
use serde::Serialize;
use std::path::Path;

/// Accuracy values paired with their round (or epoch) numbers, in file order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingCurve {
    pub round_column: String,
    pub accuracy_column: String,
    pub rounds: Vec<f64>,
    pub accuracy: Vec<f64>,
    pub diagnostics: Vec<Diagnostic>,
}

impl TrainingCurve {
    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    /// Round and value of the highest accuracy. Earliest round wins ties.
    pub fn best(&self) -> Option<(f64, f64)> {
        self.rounds
            .iter()
            .copied()
            .zip(self.accuracy.iter().copied())
            .fold(None, |best, (round, acc)| match best {
                Some((_, best_acc)) if best_acc >= acc => best,
                _ => Some((round, acc)),
            })
    }

    pub fn last(&self) -> Option<(f64, f64)> {
        Some((*self.rounds.last()?, *self.accuracy.last()?))
    }
}

/// Outcome of loading a training curve. Unavailability is a displayable state, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrainingCurveResult {
    Available(TrainingCurve),
    Unavailable { reason: String },
}

impl TrainingCurveResult {
    fn unavailable(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::info!(%reason, "Training curve unavailable");
        Self::Unavailable { reason }
    }

    pub fn curve(&self) -> Option<&TrainingCurve> {
        match self {
            Self::Available(curve) => Some(curve),
            Self::Unavailable { .. } => None,
        }
    }
}

/// Load the training curve from `dir` using the default log file name.
pub fn load_training_curve(dir: &Path) -> TrainingCurveResult {
    load_training_curve_from(&dir.join(AssetConventions::default().training_curve))
}

/// Load a training curve from an explicit CSV path.
pub fn load_training_curve_from(path: &Path) -> TrainingCurveResult {
    if !path.is_file() {
        return TrainingCurveResult::unavailable(format!("{} not found", path.display()));
    }

    let table = match Table::read_csv(path) {
        Ok(table) => table,
        Err(e) => {
            return TrainingCurveResult::unavailable(format!(
                "cannot read {}: {e}",
                path.display()
            ));
        }
    };

    let headers: Vec<String> = table
        .columns
        .iter()
        .map(|c| c.trim().to_lowercase())
        .collect();
    let (Some(round_idx), Some(acc_idx)) = (
        find_column(&headers, &["round", "epoch"]),
        find_column(&headers, &["accuracy", "acc"]),
    ) else {
        return TrainingCurveResult::unavailable(format!(
            "{} needs a round/epoch column and an accuracy column (found: {})",
            path.display(),
            headers.join(", ")
        ));
    };

    let mut log = DiagnosticLog::default();
    let mut rounds = Vec::with_capacity(table.row_count());
    let mut accuracy = Vec::with_capacity(table.row_count());
    for (i, row) in table.rows.iter().enumerate() {
        let round = row.get(round_idx).and_then(|c| c.as_f64());
        let acc = row.get(acc_idx).and_then(|c| c.as_f64());
        match (round, acc) {
            (Some(round), Some(acc)) => {
                rounds.push(round);
                accuracy.push(acc);
            }
            _ => log.decode_failure(format!("row {}: non-numeric round or accuracy", i + 1)),
        }
    }

    tracing::debug!(path = %path.display(), points = rounds.len(), "Training curve loaded");
    TrainingCurveResult::Available(TrainingCurve {
        round_column: headers[round_idx].clone(),
        accuracy_column: headers[acc_idx].clone(),
        rounds,
        accuracy,
        diagnostics: log.into_vec(),
    })
}

/// First header containing any of `needles`.
fn find_column(headers: &[String], needles: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| needles.iter().any(|n| h.contains(n)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write_log(content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("federated_training_results.csv"), content).unwrap();
        dir
    }

    #[test]
    fn test_mixed_case_headers() {
        let dir = write_log(" Round , Acc \n1,0.5\n2,0.75\n3,0.875\n");
        let result = load_training_curve(dir.path());
        let curve = result.curve().unwrap();
        assert_eq!(curve.round_column, "round");
        assert_eq!(curve.accuracy_column, "acc");
        assert_eq!(curve.rounds, vec![1.0, 2.0, 3.0]);
        assert_eq!(curve.accuracy, vec![0.5, 0.75, 0.875]);
        assert!(curve.diagnostics.is_empty());
    }

    #[test]
    fn test_first_matching_column_wins() {
        let dir = write_log("epoch,train_accuracy,val_accuracy\n1,0.5,0.25\n");
        let result = load_training_curve(dir.path());
        let curve = result.curve().unwrap();
        assert_eq!(curve.accuracy_column, "train_accuracy");
        assert_eq!(curve.accuracy, vec![0.5]);
    }

    #[test]
    fn test_missing_columns_unavailable() {
        let dir = write_log("step,loss\n1,0.9\n");
        match load_training_curve(dir.path()) {
            TrainingCurveResult::Unavailable { reason } => assert!(reason.contains("step, loss")),
            other => panic!("expected unavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_training_curve(dir.path()).curve().is_none());
    }

    #[test]
    fn test_non_numeric_rows_skipped() {
        let dir = write_log("round,accuracy\n1,0.5\n2,n/a\n3,0.75\n");
        let result = load_training_curve(dir.path());
        let curve = result.curve().unwrap();
        assert_eq!(curve.rounds, vec![1.0, 3.0]);
        assert_eq!(curve.diagnostics.len(), 1);
        assert_eq!(curve.best(), Some((3.0, 0.75)));
        assert_eq!(curve.last(), Some((3.0, 0.75)));
    }

    #[test]
    fn test_serializes_with_status_tag() {
        let result = TrainingCurveResult::Unavailable {
            reason: "missing".to_string(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["reason"], "missing");
    }
}
