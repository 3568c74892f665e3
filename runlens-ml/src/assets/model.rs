//! Trained model artifacts: format detection, signature checks and content hashing.
//!
//! Models are not executed here. A model file is "decoded" by confirming its container
//! signature matches the format its suffix claims and recording a SHA-256 digest.

use crate::error::LensError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

const HDF5_SIGNATURE: &[u8] = b"\x89HDF\r\n\x1a\n";
/// HDF5 superblocks may start at 0 or any power of two from 512.
const HDF5_OFFSETS: &[usize] = &[0, 512, 1024, 2048];
const PICKLE_PROTO: u8 = 0x80;
const PREFIX_LEN: u64 = 4096;

/// Supported model container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFormat {
    /// Keras HDF5 (`.h5`).
    KerasH5,
    /// Pickle or joblib dump (`.pkl`).
    Pickle,
}

impl ModelFormat {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix.to_lowercase().as_str() {
            ".h5" | ".hdf5" => Some(Self::KerasH5),
            ".pkl" | ".pickle" | ".joblib" => Some(Self::Pickle),
            _ => None,
        }
    }

    /// Check the file header against this format's signature.
    pub fn verify(self, prefix: &[u8]) -> Result<(), LensError> {
        let ok = match self {
            Self::KerasH5 => HDF5_OFFSETS.iter().any(|&offset| {
                prefix
                    .get(offset..offset + HDF5_SIGNATURE.len())
                    .is_some_and(|window| window == HDF5_SIGNATURE)
            }),
            Self::Pickle => match prefix {
                [PICKLE_PROTO, protocol, ..] => (2..=5).contains(protocol),
                // joblib compressed dumps: zlib or gzip streams
                [0x78, 0x01 | 0x5e | 0x9c | 0xda, ..] | [0x1f, 0x8b, ..] => true,
                _ => false,
            },
        };
        if ok {
            Ok(())
        } else {
            Err(LensError::model(format!("file is not a valid {self} container")))
        }
    }
}

impl std::fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KerasH5 => write!(f, "Keras HDF5"),
            Self::Pickle => write!(f, "pickle"),
        }
    }
}

/// A verified model file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub path: PathBuf,
    pub file_name: String,
    pub format: ModelFormat,
    pub size_bytes: u64,
    pub sha256: String,
}

impl ModelArtifact {
    /// Verify and hash a model file of the given format.
    pub fn open(path: &Path, format: ModelFormat) -> Result<Self, LensError> {
        let mut file = File::open(path)?;

        let mut prefix = Vec::new();
        (&mut file).take(PREFIX_LEN).read_to_end(&mut prefix)?;
        format.verify(&prefix)?;

        file.rewind()?;
        let mut hasher = Sha256::new();
        let size_bytes = std::io::copy(&mut file, &mut hasher)?;

        Ok(Self {
            path: path.to_path_buf(),
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            format,
            size_bytes,
            sha256: format!("{:x}", hasher.finalize()),
        })
    }
}

/// The first directory entry (by file name) ending in one of `suffixes`.
pub fn find_model_file(
    dir: &Path,
    suffixes: &[String],
) -> Result<Option<(PathBuf, String)>, LensError> {
    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    Ok(names.into_iter().find_map(|name| {
        let lower = name.to_lowercase();
        suffixes
            .iter()
            .find(|suffix| lower.ends_with(&suffix.to_lowercase()))
            .map(|suffix| (dir.join(&name), suffix.clone()))
    }))
}
