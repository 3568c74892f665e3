//! Plain-text rendering of bundles, tables and curves.
//!
//! Every function returns a `String` so the command layer decides where it goes.

use runlens_ml::explain::{GlobalImportanceTable, LocalContributionTable, SampleContext};
use runlens_ml::training::TrainingCurveResult;
use runlens_ml::{BundleSummary, Diagnostic};
use std::fmt::Write;

const POSITIVE: char = '█';
const NEGATIVE: char = '▒';

/// A bar of `width * value / max` cells, at least one cell for any non-zero value.
pub fn bar(value: f64, max: f64, width: usize, fill: char) -> String {
    if max <= 0.0 || value == 0.0 || !value.is_finite() {
        return String::new();
    }
    let cells = ((value.abs() / max) * width as f64).round() as usize;
    fill.to_string().repeat(cells.clamp(1, width.max(1)))
}

pub fn summary(summary: &BundleSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Run directory: {}", summary.directory.display());
    let _ = writeln!(
        out,
        "Inspected at:  {}",
        summary.inspected_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out);

    let model = summary.model.as_ref().map(|m| {
        format!(
            "{} ({}, {} bytes, sha256 {})",
            m.file_name,
            m.format,
            m.size_bytes,
            &m.sha256[..12.min(m.sha256.len())]
        )
    });
    let shape = |s: &Option<Vec<usize>>| s.as_ref().map(|dims| format!("{dims:?}"));
    let series = |s: &Option<runlens_ml::data::SeriesSummary>| {
        s.as_ref().map(|s| format!("{} {:?}", s.kind, s.shape))
    };
    let metadata = (!summary.metadata_keys.is_empty()).then(|| summary.metadata_keys.join(", "));

    let fields = [
        ("model", model),
        ("attributions", shape(&summary.attributions)),
        ("base values", shape(&summary.base_values)),
        ("features", summary.feature_count.map(|n| n.to_string())),
        ("samples", shape(&summary.samples)),
        ("targets", series(&summary.targets)),
        ("predictions", series(&summary.predictions)),
        ("metadata", metadata),
    ];
    for (label, value) in fields {
        let _ = writeln!(
            out,
            "  {label:<14} {}",
            value.unwrap_or_else(|| "absent".to_string())
        );
    }

    if !summary.diagnostics.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Diagnostics:");
        out.push_str(&diagnostics(&summary.diagnostics));
    }
    out
}

pub fn global(table: &GlobalImportanceTable, top: Option<usize>, bar_width: usize) -> String {
    let rows = top.map_or(&table.rows[..], |k| table.top(k));
    let max = table.max_value();
    let name_width = rows.iter().map(|r| r.feature.len()).max().unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Global feature importance (mean |SHAP|, {} of {} features)",
        rows.len(),
        table.len()
    );
    for row in rows {
        let _ = writeln!(
            out,
            "  {:<name_width$}  {:>9.4}  {}",
            row.feature,
            row.mean_abs_attribution,
            bar(row.mean_abs_attribution, max, bar_width, POSITIVE)
        );
    }
    out
}

pub fn local(table: &LocalContributionTable, context: &SampleContext, bar_width: usize) -> String {
    let max = table.max_magnitude();
    let name_width = table.rows.iter().map(|r| r.feature.len()).max().unwrap_or(0);
    let value_width = table
        .rows
        .iter()
        .map(|r| r.feature_value.to_string().len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(out, "Sample {}", table.sample_index);
    if let Some(base) = context.base_value {
        let _ = writeln!(out, "  base value   {base:.4}");
        let _ = writeln!(
            out,
            "  base + sum   {:.4}",
            base + table.total_attribution()
        );
    }
    if let Some(prediction) = &context.prediction {
        let _ = writeln!(out, "  prediction   {prediction}");
    }
    if let Some(target) = &context.target {
        let _ = writeln!(out, "  target       {target}");
    }
    let _ = writeln!(out);

    for row in &table.rows {
        let fill = if row.attribution < 0.0 { NEGATIVE } else { POSITIVE };
        let _ = writeln!(
            out,
            "  {:<name_width$} = {:<value_width$}  {:>+9.4}  {}",
            row.feature,
            row.feature_value.to_string(),
            row.attribution,
            bar(row.attribution, max, bar_width, fill)
        );
    }
    out
}

pub fn curve(result: &TrainingCurveResult) -> String {
    let curve = match result {
        TrainingCurveResult::Available(curve) => curve,
        TrainingCurveResult::Unavailable { reason } => {
            return format!("Training curve unavailable: {reason}\n");
        }
    };

    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:>8}  {:>10}",
        curve.round_column, curve.accuracy_column
    );
    for (round, accuracy) in curve.rounds.iter().zip(&curve.accuracy) {
        let _ = writeln!(out, "  {round:>8}  {accuracy:>10.4}");
    }
    if let Some((round, accuracy)) = curve.best() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Best: {accuracy:.4} at {} {round}", curve.round_column);
    }
    if !curve.diagnostics.is_empty() {
        out.push_str(&diagnostics(&curve.diagnostics));
    }
    out
}

pub fn diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| format!("  warning: {d}\n"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use runlens_ml::explain::{ImportanceRow, reduce_local};
    use runlens_ml::{AttributionArray, SampleMatrix};

    fn importance(rows: &[(&str, f64)]) -> GlobalImportanceTable {
        GlobalImportanceTable {
            rows: rows
                .iter()
                .map(|(feature, value)| ImportanceRow {
                    feature: feature.to_string(),
                    mean_abs_attribution: *value,
                })
                .collect(),
        }
    }

    #[test]
    fn test_bar_scales_to_width() {
        assert_eq!(bar(1.0, 1.0, 10, '#'), "##########");
        assert_eq!(bar(0.5, 1.0, 10, '#'), "#####");
        assert_eq!(bar(0.001, 1.0, 10, '#'), "#");
        assert_eq!(bar(0.0, 1.0, 10, '#'), "");
        assert_eq!(bar(1.0, 0.0, 10, '#'), "");
    }

    #[test]
    fn test_global_respects_top() {
        let table = importance(&[("income", 0.5), ("age", 0.25), ("zip", 0.125)]);
        let text = global(&table, Some(2), 4);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("2 of 3 features"));
        assert!(lines[1].trim_start().starts_with("income"));
        assert!(lines[1].ends_with("████"));
        assert!(lines[2].ends_with("██"));
    }

    #[test]
    fn test_local_shows_context_and_signs() {
        let attributions = AttributionArray::Rank2(ndarray::array![[0.25, -0.5]]);
        let samples = SampleMatrix::Numeric(ndarray::array![[1.0, 2.0]]);
        let features = vec!["a".to_string(), "b".to_string()];
        let reduced = reduce_local(&attributions, &samples, &features, 0).unwrap();
        let context = SampleContext {
            sample_index: 0,
            base_value: Some(0.5),
            prediction: Some("1".to_string()),
            target: None,
        };

        let text = local(&reduced.table, &context, 4);
        assert!(text.starts_with("Sample 0\n"));
        assert!(text.contains("base + sum   0.2500"));
        assert!(text.contains("prediction   1"));
        assert!(!text.contains("target"));
        assert!(text.contains("-0.5000  ▒▒▒▒"));
        assert!(text.contains("+0.2500  ██"));
    }

    #[test]
    fn test_unavailable_curve() {
        let result = TrainingCurveResult::Unavailable {
            reason: "no log".to_string(),
        };
        assert_eq!(curve(&result), "Training curve unavailable: no log\n");
    }
}
