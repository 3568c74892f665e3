//! Federated training history of a run.

pub mod curve;

pub use curve::{TrainingCurve, TrainingCurveResult, load_training_curve, load_training_curve_from};
