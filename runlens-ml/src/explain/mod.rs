//! Explanation reducer: SHAP arrays of any supported rank into ranked tables.
//!
//! Raw attribution arrays are converted once into an [`AttributionArray`]; the global and
//! local reductions only ever see a canonical samples × features view of it.

pub mod attribution;
pub mod context;
pub mod global;
pub mod local;

pub use attribution::{AttributionArray, ClassReduction};
pub use context::SampleContext;
pub use global::{GlobalImportanceTable, ImportanceRow, reduce_global};
pub use local::{ContributionRow, LocalContributionTable, reduce_local, reduce_local_with};

use crate::diagnostics::{Diagnostic, DiagnosticLog};
use serde::Serialize;

/// A reduced table plus the warnings raised while producing it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reduced<T> {
    pub table: T,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Reduced<T> {
    pub(crate) fn new(table: T, log: DiagnosticLog) -> Self {
        Self {
            table,
            diagnostics: log.into_vec(),
        }
    }
}

/// `"0".."count-1"`, used when feature names cannot be trusted.
pub(crate) fn positional_names(count: usize) -> Vec<String> {
    (0..count).map(|i| i.to_string()).collect()
}
