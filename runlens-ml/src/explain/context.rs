//! Per-sample context shown next to a local explanation.

use crate::assets::AssetBundle;
use ndarray::{ArrayD, Axis};
use serde::Serialize;

/// Expected value, model output and label for one sample, where the run recorded them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SampleContext {
    pub sample_index: usize,
    pub base_value: Option<f64>,
    pub prediction: Option<String>,
    pub target: Option<String>,
}

impl SampleContext {
    pub fn from_bundle(bundle: &AssetBundle, sample_index: usize) -> Self {
        Self {
            sample_index,
            base_value: bundle
                .base_values
                .as_ref()
                .and_then(|b| base_value_at(b, sample_index)),
            prediction: bundle
                .predictions
                .as_ref()
                .and_then(|p| p.describe(sample_index)),
            target: bundle
                .targets
                .as_ref()
                .and_then(|t| t.describe(sample_index)),
        }
    }
}

/// Base value for one sample.
///
/// A scalar is used as is. A vector holds one expected value per class (or per sample) and
/// is averaged. A matrix is samples × classes and the selected row is averaged.
pub fn base_value_at(base: &ArrayD<f64>, sample_index: usize) -> Option<f64> {
    match base.ndim() {
        0 => base.iter().next().copied(),
        1 => base.mean(),
        2 => {
            if sample_index >= base.shape()[0] {
                return None;
            }
            base.index_axis(Axis(0), sample_index).mean()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    fn dyn_array(shape: &[usize], values: Vec<f64>) -> ArrayD<f64> {
        ArrayD::from_shape_vec(IxDyn(shape), values).unwrap()
    }

    #[test]
    fn test_scalar_base_value() {
        assert_eq!(base_value_at(&dyn_array(&[], vec![0.42]), 3), Some(0.42));
    }

    #[test]
    fn test_per_class_base_values_are_averaged() {
        assert_eq!(base_value_at(&dyn_array(&[2], vec![0.25, 0.75]), 0), Some(0.5));
    }

    #[test]
    fn test_per_sample_rows() {
        let base = dyn_array(&[2, 2], vec![0.1, 0.3, 0.5, 1.5]);
        assert_eq!(base_value_at(&base, 1), Some(1.0));
        assert_eq!(base_value_at(&base, 2), None);
    }

    #[test]
    fn test_empty_vector_has_no_base_value() {
        assert_eq!(base_value_at(&dyn_array(&[0], vec![]), 0), None);
    }
}
