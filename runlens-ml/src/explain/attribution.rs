//! Rank-tagged attribution arrays and class-axis normalization.

use crate::error::ExplainError;
use ndarray::{Array1, Array2, Array3, ArrayD, Axis, CowArray, Ix1, Ix2, Ix3};
use serde::{Deserialize, Serialize};

/// SHAP values in one of the three layouts explainers produce.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributionArray {
    /// One sample: (features,).
    Rank1(Array1<f64>),
    /// Samples × features.
    Rank2(Array2<f64>),
    /// Samples × features × classes.
    Rank3(Array3<f64>),
}

impl TryFrom<ArrayD<f64>> for AttributionArray {
    type Error = ExplainError;

    fn try_from(array: ArrayD<f64>) -> Result<Self, Self::Error> {
        let rank = array.ndim();
        let unsupported = |_| ExplainError::UnsupportedRank {
            rank,
            expected: "1, 2 or 3",
        };
        match rank {
            1 => array.into_dimensionality::<Ix1>().map(Self::Rank1).map_err(unsupported),
            2 => array.into_dimensionality::<Ix2>().map(Self::Rank2).map_err(unsupported),
            3 => array.into_dimensionality::<Ix3>().map(Self::Rank3).map_err(unsupported),
            _ => Err(ExplainError::UnsupportedRank {
                rank,
                expected: "1, 2 or 3",
            }),
        }
    }
}

impl AttributionArray {
    pub fn rank(&self) -> usize {
        match self {
            Self::Rank1(_) => 1,
            Self::Rank2(_) => 2,
            Self::Rank3(_) => 3,
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Rank1(a) => a.shape(),
            Self::Rank2(a) => a.shape(),
            Self::Rank3(a) => a.shape(),
        }
    }

    /// Canonical samples × features view.
    ///
    /// Rank 3 collapses its class axis with `reduction`; rank 1 becomes a 1 × F view.
    pub fn sample_rows(
        &self,
        reduction: ClassReduction,
    ) -> Result<CowArray<'_, f64, Ix2>, ExplainError> {
        match self {
            Self::Rank1(a) => Ok(CowArray::from(a.view().insert_axis(Axis(0)))),
            Self::Rank2(a) => Ok(CowArray::from(a.view())),
            Self::Rank3(a) => reduction.collapse(a).map(CowArray::from),
        }
    }
}

/// How the class axis of a rank-3 array is folded away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassReduction {
    /// Mean of absolute values across classes.
    #[default]
    MeanAbs,
    /// Plain mean across classes; keeps the sign of the contribution.
    SignedMean,
}

impl ClassReduction {
    pub fn collapse(self, array: &Array3<f64>) -> Result<Array2<f64>, ExplainError> {
        let collapsed = match self {
            Self::MeanAbs => array.mapv(f64::abs).mean_axis(Axis(2)),
            Self::SignedMean => array.mean_axis(Axis(2)),
        };
        collapsed.ok_or(ExplainError::EmptyAxis { axis: "class" })
    }
}

impl std::fmt::Display for ClassReduction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MeanAbs => write!(f, "mean_abs"),
            Self::SignedMean => write!(f, "signed_mean"),
        }
    }
}
