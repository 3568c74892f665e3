//! Global feature importance: mean absolute attribution per feature across all samples.

use crate::diagnostics::DiagnosticLog;
use crate::error::ExplainError;
use crate::explain::attribution::{AttributionArray, ClassReduction};
use crate::explain::{Reduced, positional_names};
use ndarray::Axis;
use serde::{Deserialize, Serialize};

/// One feature's global importance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceRow {
    pub feature: String,
    pub mean_abs_attribution: f64,
}

/// Features ranked by mean |attribution|, largest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalImportanceTable {
    pub rows: Vec<ImportanceRow>,
}

impl GlobalImportanceTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The `k` most important features.
    pub fn top(&self, k: usize) -> &[ImportanceRow] {
        &self.rows[..k.min(self.rows.len())]
    }

    pub fn max_value(&self) -> f64 {
        self.rows
            .iter()
            .map(|r| r.mean_abs_attribution)
            .fold(0.0, f64::max)
    }
}

/// Rank features by mean absolute attribution.
///
/// Rank-3 input is first reduced to samples × features by averaging |x| over classes.
/// Rank-1 input has no sample axis and is rejected. When `features` does not match the
/// number of attribution columns, positional names `"0".."F-1"` are used instead and a
/// shape-mismatch diagnostic is attached.
pub fn reduce_global(
    attributions: &AttributionArray,
    features: &[String],
) -> Result<Reduced<GlobalImportanceTable>, ExplainError> {
    if let AttributionArray::Rank1(_) = attributions {
        return Err(ExplainError::UnsupportedRank {
            rank: 1,
            expected: "2 or 3",
        });
    }

    let matrix = attributions.sample_rows(ClassReduction::MeanAbs)?;
    let mean_abs = matrix
        .mapv(f64::abs)
        .mean_axis(Axis(0))
        .ok_or(ExplainError::EmptyAxis { axis: "sample" })?;

    let mut log = DiagnosticLog::default();
    let names = if mean_abs.len() == features.len() {
        features.to_vec()
    } else {
        log.shape_mismatch(format!(
            "feature list has {} names but attributions cover {} features; using feature indices",
            features.len(),
            mean_abs.len()
        ));
        positional_names(mean_abs.len())
    };

    let mut rows: Vec<ImportanceRow> = names
        .into_iter()
        .zip(mean_abs.iter().copied())
        .map(|(feature, mean_abs_attribution)| ImportanceRow {
            feature,
            mean_abs_attribution,
        })
        .collect();
    // total_cmp gives NaN means a fixed place in the order
    rows.sort_by(|a, b| b.mean_abs_attribution.total_cmp(&a.mean_abs_attribution));

    tracing::debug!(
        rank = attributions.rank(),
        features = rows.len(),
        "reduced global importance"
    );
    Ok(Reduced::new(GlobalImportanceTable { rows }, log))
}
