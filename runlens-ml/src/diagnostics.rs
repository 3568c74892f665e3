//! Structured warnings returned alongside resolved assets and reduced tables.

use serde::{Deserialize, Serialize};

/// Category of a non-fatal condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// An expected file is absent; the field stays empty.
    MissingAsset,
    /// A file exists but could not be decoded; the field stays empty.
    DecodeFailure,
    /// Feature counts or dimensions disagree and were reconciled.
    ShapeMismatch,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingAsset => write!(f, "missing asset"),
            Self::DecodeFailure => write!(f, "decode failure"),
            Self::ShapeMismatch => write!(f, "shape mismatch"),
        }
    }
}

/// A single warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Collects diagnostics and mirrors each one to `tracing`.
#[derive(Debug, Default)]
pub(crate) struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub fn missing_asset(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(%message, "asset missing");
        self.push(DiagnosticKind::MissingAsset, message);
    }

    pub fn decode_failure(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(%message, "asset could not be decoded");
        self.push(DiagnosticKind::DecodeFailure, message);
    }

    pub fn shape_mismatch(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(%message, "shape mismatch reconciled");
        self.push(DiagnosticKind::ShapeMismatch, message);
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }

    fn push(&mut self, kind: DiagnosticKind, message: String) {
        self.entries.push(Diagnostic { kind, message });
    }
}
