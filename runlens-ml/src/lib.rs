//! # runlens-ml: Asset resolution and SHAP explanation reduction
//!
//! This crate loads the artifacts an ML experiment leaves in its output directory and turns
//! SHAP attribution arrays into ranked, comparable tables.
//!
//! ## Pipeline
//!
//! 1. **Assets**: discover files by naming convention and decode them into an [`AssetBundle`]
//!    (never fails; problems become [`Diagnostic`]s)
//! 2. **Explain**: reduce attribution arrays of rank 1, 2 or 3 into a global importance
//!    table or a single-sample contribution table
//! 3. **Training**: read the accuracy-per-round log, if the run kept one

// Foundation
pub mod config;
pub mod diagnostics;
pub mod error;

// Decoders
pub mod data;

// Resolution and reduction
pub mod assets;
pub mod explain;
pub mod training;

// Re-exports
pub use assets::{AssetBundle, AssetResolver, BundleSummary, ModelArtifact, resolve_assets};
pub use config::{LensConfig, OutputFormat, load_config};
pub use data::{Cell, SampleMatrix, Table, TargetValues};
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use error::{ExplainError, LensError, NpyError};
pub use explain::{
    AttributionArray, ClassReduction, GlobalImportanceTable, LocalContributionTable, Reduced,
    SampleContext, reduce_global, reduce_local, reduce_local_with,
};
pub use training::{TrainingCurve, TrainingCurveResult, load_training_curve};
