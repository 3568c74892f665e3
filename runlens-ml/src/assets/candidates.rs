//! Ordered (file name, decoder) tables driving asset resolution.

use crate::data::Table;
use crate::data::npy::read_npy;
use crate::error::LensError;
use ndarray::ArrayD;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// File format decoder, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    Npy,
    Csv,
    Json,
}

impl Decoder {
    pub fn for_file(name: &str) -> Option<Self> {
        let extension = Path::new(name).extension()?.to_str()?.to_lowercase();
        match extension.as_str() {
            "npy" => Some(Self::Npy),
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn decode(self, path: &Path) -> Result<Decoded, LensError> {
        match self {
            Self::Npy => read_npy(path).map(Decoded::Array),
            Self::Csv => Table::read_csv(path).map(Decoded::Table),
            Self::Json => {
                let content = std::fs::read_to_string(path)?;
                Ok(Decoded::Json(serde_json::from_str(&content)?))
            }
        }
    }
}

/// Output of a decoder before it is shaped into a bundle field.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Array(ArrayD<f64>),
    Table(Table),
    Json(Value),
}

impl Decoded {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Array(_) => "numeric array",
            Self::Table(_) => "table",
            Self::Json(_) => "JSON document",
        }
    }
}

/// One candidate file for a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub file_name: String,
    pub decoder: Decoder,
}

/// Candidates for one category in priority order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateTable {
    entries: Vec<Candidate>,
}

impl CandidateTable {
    /// Build from file names. Names without a known extension are dropped with a warning.
    pub fn from_names(names: &[String]) -> Self {
        let entries = names
            .iter()
            .filter_map(|name| match Decoder::for_file(name) {
                Some(decoder) => Some(Candidate {
                    file_name: name.clone(),
                    decoder,
                }),
                None => {
                    tracing::warn!(file = %name, "no decoder for candidate file; ignoring");
                    None
                }
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[Candidate] {
        &self.entries
    }

    /// The highest-priority candidate present in `dir`.
    pub fn first_existing(&self, dir: &Path) -> Option<(&Candidate, PathBuf)> {
        self.entries.iter().find_map(|candidate| {
            let path = dir.join(&candidate.file_name);
            path.is_file().then_some((candidate, path))
        })
    }

    /// Every candidate present in `dir`, in priority order.
    pub fn all_existing(&self, dir: &Path) -> Vec<(&Candidate, PathBuf)> {
        self.entries
            .iter()
            .map(|candidate| (candidate, dir.join(&candidate.file_name)))
            .filter(|(_, path)| path.is_file())
            .collect()
    }

    pub fn describe(&self) -> String {
        self.entries
            .iter()
            .map(|c| c.file_name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
