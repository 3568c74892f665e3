//! Format decoders and in-memory forms of run artifacts.

pub mod npy;
pub mod samples;
pub mod table;

pub use samples::{SampleMatrix, SeriesSummary, TargetValues};
pub use table::{Cell, Table};
