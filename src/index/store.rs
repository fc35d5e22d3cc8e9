use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::IndexError;
use crate::embedding::EmbedderIdentity;

pub const FORMAT_VERSION: u32 = 1;
pub const INDEX_FILE: &str = "index.json";

/// On-disk form of the index.
#[derive(Serialize, Deserialize, Debug)]
pub struct PersistedIndex {
    pub version: u32,
    pub embedder: EmbedderIdentity,
    pub faq_digest: String,
    pub entries: Vec<IndexedEntry>,
}

/// A FAQ entry with the vector of its question. The answer is payload only.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct IndexedEntry {
    pub question: String,
    pub answer: String,
    pub vector: Vec<f32>,
}

pub fn read(path: &Path) -> Result<PersistedIndex, IndexError> {
    let raw = fs::read_to_string(path).map_err(|source| IndexError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| IndexError::Format {
        path: path.display().to_string(),
        source,
    })
}

/// Writes through a sibling temp file and renames, so a crashed build never
/// leaves a truncated index behind.
pub fn write(path: &Path, index: &PersistedIndex) -> Result<(), IndexError> {
    let io_err = |source| IndexError::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string(index).map_err(|source| IndexError::Format {
        path: path.display().to_string(),
        source,
    })?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}
