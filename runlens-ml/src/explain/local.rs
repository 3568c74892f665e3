//! Local explanations: per-feature contributions for one selected sample.

use crate::data::{Cell, SampleMatrix};
use crate::diagnostics::DiagnosticLog;
use crate::error::ExplainError;
use crate::explain::Reduced;
use crate::explain::attribution::{AttributionArray, ClassReduction};
use serde::{Deserialize, Serialize};

/// One feature's contribution to a single prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionRow {
    pub feature: String,
    pub feature_value: Cell,
    pub attribution: f64,
}

/// Contributions for one sample, smallest |attribution| first so the strongest
/// contributors land last in a horizontal bar layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalContributionTable {
    pub sample_index: usize,
    pub rows: Vec<ContributionRow>,
}

impl LocalContributionTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sum of the attributions; with the base value this reconstructs the model output.
    pub fn total_attribution(&self) -> f64 {
        self.rows.iter().map(|r| r.attribution).sum()
    }

    pub fn max_magnitude(&self) -> f64 {
        self.rows
            .iter()
            .map(|r| r.attribution.abs())
            .fold(0.0, f64::max)
    }
}

/// Explain one sample using the default class reduction (mean |x| across classes).
pub fn reduce_local(
    attributions: &AttributionArray,
    samples: &SampleMatrix,
    features: &[String],
    sample_index: usize,
) -> Result<Reduced<LocalContributionTable>, ExplainError> {
    reduce_local_with(
        attributions,
        samples,
        features,
        sample_index,
        ClassReduction::default(),
    )
}

/// Explain one sample.
///
/// The sample matrix is authoritative for feature names here: when `features` disagrees
/// with its column count, its own labels are used. Rank-1 attributions are the selected
/// row already. Names, values and attributions are trimmed to their shared length before
/// the rows are sorted ascending by |attribution|.
///
/// An index past the last attribution row or the last sample row is rejected.
pub fn reduce_local_with(
    attributions: &AttributionArray,
    samples: &SampleMatrix,
    features: &[String],
    sample_index: usize,
    class_reduction: ClassReduction,
) -> Result<Reduced<LocalContributionTable>, ExplainError> {
    let mut log = DiagnosticLog::default();

    let labels = samples.column_labels(features);
    let names = if features.len() == labels.len() {
        features.to_vec()
    } else {
        log.shape_mismatch(format!(
            "feature list has {} names but the sample matrix has {} columns; using its column labels",
            features.len(),
            labels.len()
        ));
        labels
    };

    let matrix = attributions.sample_rows(class_reduction)?;
    let attribution_row = match attributions {
        AttributionArray::Rank1(_) => matrix.row(0),
        _ if sample_index < matrix.nrows() => matrix.row(sample_index),
        _ => {
            return Err(ExplainError::SampleIndexOutOfRange {
                index: sample_index,
                len: matrix.nrows(),
            });
        }
    };

    let values = samples
        .row(sample_index)
        .ok_or(ExplainError::SampleIndexOutOfRange {
            index: sample_index,
            len: samples.row_count(),
        })?;

    let shared = names.len().min(values.len()).min(attribution_row.len());
    if shared != names.len() || shared != values.len() || shared != attribution_row.len() {
        log.shape_mismatch(format!(
            "trimmed to {shared} features (names: {}, values: {}, attributions: {})",
            names.len(),
            values.len(),
            attribution_row.len()
        ));
    }

    let mut rows: Vec<ContributionRow> = names
        .into_iter()
        .zip(values)
        .zip(attribution_row.iter().copied())
        .map(|((feature, feature_value), attribution)| ContributionRow {
            feature,
            feature_value,
            attribution,
        })
        .collect();
    rows.sort_by(|a, b| a.attribution.abs().total_cmp(&b.attribution.abs()));

    tracing::debug!(
        rank = attributions.rank(),
        sample_index,
        features = rows.len(),
        %class_reduction,
        "reduced local contributions"
    );
    Ok(Reduced::new(
        LocalContributionTable { sample_index, rows },
        log,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Table;
    use crate::diagnostics::DiagnosticKind;
    use ndarray::{Array3, array};
    use pretty_assertions::assert_eq;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn row(feature: &str, value: f64, attribution: f64) -> ContributionRow {
        ContributionRow {
            feature: feature.to_string(),
            feature_value: Cell::Number(value),
            attribution,
        }
    }

    #[test]
    fn test_two_feature_example() {
        let attributions = AttributionArray::Rank2(array![[0.1, -0.4], [0.3, 0.2]]);
        let samples = SampleMatrix::Numeric(array![[1.0, 2.0], [5.0, 7.0]]);
        let reduced = reduce_local(&attributions, &samples, &names(&["a", "b"]), 1).unwrap();

        assert!(reduced.diagnostics.is_empty());
        assert_eq!(reduced.table.sample_index, 1);
        assert_eq!(
            reduced.table.rows,
            vec![row("b", 7.0, 0.2), row("a", 5.0, 0.3)]
        );
    }

    #[test]
    fn test_selects_row_without_averaging() {
        let attributions = AttributionArray::Rank2(array![
            [0.5, -0.1, 0.0],
            [-0.9, 0.4, 0.05],
            [0.2, 0.2, 0.2]
        ]);
        let samples = SampleMatrix::Numeric(array![
            [0.0, 0.0, 0.0],
            [1.0, 2.0, 3.0],
            [0.0, 0.0, 0.0]
        ]);
        let reduced = reduce_local(&attributions, &samples, &names(&["x", "y", "z"]), 1).unwrap();

        let mut attributions: Vec<f64> = reduced.table.rows.iter().map(|r| r.attribution).collect();
        attributions.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(attributions, vec![-0.9, 0.05, 0.4]);

        let order: Vec<&str> = reduced.table.rows.iter().map(|r| r.feature.as_str()).collect();
        assert_eq!(order, vec!["z", "y", "x"]);
    }

    #[test]
    fn test_rank3_uses_mean_abs_by_default() {
        let attributions = AttributionArray::Rank3(
            Array3::from_shape_vec((1, 2, 2), vec![0.25, -0.75, -1.0, 0.0]).unwrap(),
        );
        let samples = SampleMatrix::Numeric(array![[3.0, 4.0]]);
        let features = names(&["p", "q"]);

        let default = reduce_local(&attributions, &samples, &features, 0).unwrap();
        assert_eq!(
            default.table.rows,
            vec![row("p", 3.0, 0.5), row("q", 4.0, 0.5)]
        );

        let signed = reduce_local_with(
            &attributions,
            &samples,
            &features,
            0,
            ClassReduction::SignedMean,
        )
        .unwrap();
        assert_eq!(
            signed.table.rows,
            vec![row("p", 3.0, -0.25), row("q", 4.0, -0.5)]
        );
    }

    #[test]
    fn test_rank1_is_the_selected_row() {
        let attributions = AttributionArray::Rank1(array![0.3, -0.1]);
        let samples = SampleMatrix::Numeric(array![[9.0, 8.0], [1.0, 2.0]]);
        let reduced = reduce_local(&attributions, &samples, &names(&["a", "b"]), 1).unwrap();
        assert_eq!(
            reduced.table.rows,
            vec![row("b", 2.0, -0.1), row("a", 1.0, 0.3)]
        );
    }

    #[test]
    fn test_table_labels_win_on_mismatch() {
        let attributions = AttributionArray::Rank2(array![[0.4, -0.2, 0.1]]);
        let samples = SampleMatrix::Tabular(Table {
            columns: names(&["age", "protocol", "bytes"]),
            rows: vec![vec![
                Cell::Number(31.0),
                Cell::Text("tcp".to_string()),
                Cell::Number(1200.0),
            ]],
        });
        let reduced =
            reduce_local(&attributions, &samples, &names(&["feature_0", "feature_1"]), 0).unwrap();

        let order: Vec<&str> = reduced.table.rows.iter().map(|r| r.feature.as_str()).collect();
        assert_eq!(order, vec!["bytes", "protocol", "age"]);
        assert_eq!(reduced.table.rows[1].feature_value, Cell::Text("tcp".into()));
        assert_eq!(reduced.diagnostics[0].kind, DiagnosticKind::ShapeMismatch);
    }

    #[test]
    fn test_trims_to_shared_length() {
        let attributions = AttributionArray::Rank2(array![[0.4, -0.2]]);
        let samples = SampleMatrix::Numeric(array![[1.0, 2.0, 3.0]]);
        let reduced = reduce_local(&attributions, &samples, &names(&["a", "b", "c"]), 0).unwrap();

        assert_eq!(reduced.table.len(), 2);
        assert_eq!(
            reduced.table.rows,
            vec![row("b", 2.0, -0.2), row("a", 1.0, 0.4)]
        );
        assert_eq!(reduced.diagnostics.len(), 1);
    }

    #[test]
    fn test_nan_attributions_sort_last() {
        let attributions = AttributionArray::Rank2(array![[0.4, f64::NAN, -0.1, 0.2, f64::NAN]]);
        let samples = SampleMatrix::Numeric(array![[1.0, 2.0, 3.0, 4.0, 5.0]]);
        let reduced =
            reduce_local(&attributions, &samples, &names(&["a", "b", "c", "d", "e"]), 0).unwrap();

        let order: Vec<&str> = reduced.table.rows.iter().map(|r| r.feature.as_str()).collect();
        assert_eq!(order, vec!["c", "d", "a", "b", "e"]);
        assert!(reduced.table.rows[3].attribution.is_nan());
    }

    #[test]
    fn test_rejects_out_of_range_index() {
        let attributions = AttributionArray::Rank2(array![[0.1, 0.2]]);
        let samples = SampleMatrix::Numeric(array![[1.0, 2.0], [3.0, 4.0]]);
        assert_eq!(
            reduce_local(&attributions, &samples, &names(&["a", "b"]), 1).unwrap_err(),
            ExplainError::SampleIndexOutOfRange { index: 1, len: 1 }
        );

        let attributions = AttributionArray::Rank2(array![[0.1, 0.2], [0.3, 0.4]]);
        let samples = SampleMatrix::Numeric(array![[1.0, 2.0]]);
        assert_eq!(
            reduce_local(&attributions, &samples, &names(&["a", "b"]), 1).unwrap_err(),
            ExplainError::SampleIndexOutOfRange { index: 1, len: 1 }
        );
    }

    #[test]
    fn test_total_attribution() {
        let attributions = AttributionArray::Rank2(array![[0.25, -0.5, 1.0]]);
        let samples = SampleMatrix::Numeric(array![[0.0, 0.0, 0.0]]);
        let reduced = reduce_local(&attributions, &samples, &names(&["a", "b", "c"]), 0).unwrap();
        assert_eq!(reduced.table.total_attribution(), 0.75);
        assert_eq!(reduced.table.max_magnitude(), 1.0);
    }
}
