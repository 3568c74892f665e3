//! Sample matrices and target/prediction series as they arrive from disk.

use crate::data::table::{Cell, Table};
use crate::error::LensError;
use ndarray::{Array2, ArrayD, Axis, Ix1, Ix2};
use serde::Serialize;

/// Feature values for the explained samples (`X`).
#[derive(Debug, Clone, PartialEq)]
pub enum SampleMatrix {
    /// Unlabelled numeric matrix, N rows × width columns.
    Numeric(Array2<f64>),
    /// Labelled table; its column labels are authoritative.
    Tabular(Table),
}

impl SampleMatrix {
    /// Build from a decoded array: rank 1 is a single sample, rank 2 is used as is.
    pub fn from_array(array: ArrayD<f64>) -> Result<Self, LensError> {
        match array.ndim() {
            1 => {
                let row = array
                    .into_dimensionality::<Ix1>()
                    .map_err(|e| LensError::invalid_input(e.to_string()))?;
                Ok(Self::Numeric(row.insert_axis(Axis(0))))
            }
            2 => array
                .into_dimensionality::<Ix2>()
                .map(Self::Numeric)
                .map_err(|e| LensError::invalid_input(e.to_string())),
            rank => Err(LensError::invalid_input(format!(
                "sample matrix must have rank 1 or 2, found rank {rank}"
            ))),
        }
    }

    pub fn row_count(&self) -> usize {
        match self {
            Self::Numeric(m) => m.nrows(),
            Self::Tabular(t) => t.row_count(),
        }
    }

    pub fn column_count(&self) -> usize {
        match self {
            Self::Numeric(m) => m.ncols(),
            Self::Tabular(t) => t.column_count(),
        }
    }

    /// Column labels of the row-addressable form.
    ///
    /// A numeric matrix borrows the first `min(F, width)` feature names; any further columns
    /// are labelled by position.
    pub fn column_labels(&self, features: &[String]) -> Vec<String> {
        match self {
            Self::Tabular(t) => t.columns.clone(),
            Self::Numeric(m) => (0..m.ncols())
                .map(|i| features.get(i).cloned().unwrap_or_else(|| i.to_string()))
                .collect(),
        }
    }

    /// Values of one sample, or `None` past the last row.
    pub fn row(&self, index: usize) -> Option<Vec<Cell>> {
        match self {
            Self::Numeric(m) => (index < m.nrows())
                .then(|| m.row(index).iter().copied().map(Cell::Number).collect()),
            Self::Tabular(t) => t.row(index).map(<[Cell]>::to_vec),
        }
    }
}

/// Targets (`y`) or predictions loaded from a run directory.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetValues {
    /// A single column or a one-dimensional array.
    Flat(Vec<Cell>),
    /// A table with more than one column.
    Table(Table),
    /// A numeric array of rank 2 or more, e.g. per-class probabilities.
    Array(ArrayD<f64>),
}

impl TargetValues {
    /// Squeeze single-column tables to a flat sequence.
    pub fn from_table(table: Table) -> Self {
        if table.column_count() == 1 {
            Self::Flat(table.column(0))
        } else {
            Self::Table(table)
        }
    }

    pub fn from_array(array: ArrayD<f64>) -> Self {
        if array.ndim() <= 1 {
            Self::Flat(array.iter().copied().map(Cell::Number).collect())
        } else {
            Self::Array(array)
        }
    }

    /// Number of entries along the sample axis.
    pub fn len(&self) -> usize {
        match self {
            Self::Flat(values) => values.len(),
            Self::Table(t) => t.row_count(),
            Self::Array(a) => a.shape().first().copied().unwrap_or(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Human-readable value for one sample, if present.
    pub fn describe(&self, index: usize) -> Option<String> {
        match self {
            Self::Flat(values) => values.get(index).map(Cell::to_string),
            Self::Table(t) => t.row(index).map(join_cells),
            Self::Array(a) => (index < self.len()).then(|| {
                let row: Vec<Cell> = a
                    .index_axis(Axis(0), index)
                    .iter()
                    .copied()
                    .map(Cell::Number)
                    .collect();
                join_cells(&row)
            }),
        }
    }

    pub fn summary(&self) -> SeriesSummary {
        match self {
            Self::Flat(values) => SeriesSummary {
                kind: "flat",
                shape: vec![values.len()],
            },
            Self::Table(t) => SeriesSummary {
                kind: "table",
                shape: vec![t.row_count(), t.column_count()],
            },
            Self::Array(a) => SeriesSummary {
                kind: "array",
                shape: a.shape().to_vec(),
            },
        }
    }
}

/// Shape description used in bundle summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesSummary {
    pub kind: &'static str,
    pub shape: Vec<usize>,
}

fn join_cells(cells: &[Cell]) -> String {
    cells
        .iter()
        .map(Cell::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
