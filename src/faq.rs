use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

/// A single question/answer pair from the FAQ source file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FaqError {
    #[error("failed to read FAQ file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid FAQ file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Reads the FAQ file: a JSON array of `{"question", "answer"}` records.
pub fn load_faqs(path: &Path) -> Result<Vec<FaqEntry>, FaqError> {
    let raw = fs::read_to_string(path).map_err(|source| FaqError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let entries: Vec<FaqEntry> = serde_json::from_str(&raw).map_err(|source| FaqError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    debug!(path = %path.display(), count = entries.len(), "FAQ file loaded");
    Ok(entries)
}

/// SHA-256 over the serialized entries. Stored next to the index so a changed
/// FAQ source triggers a full rebuild.
pub fn digest(entries: &[FaqEntry]) -> String {
    let mut hasher = Sha256::new();
    for entry in entries {
        hasher.update(entry.question.as_bytes());
        hasher.update([0u8]);
        hasher.update(entry.answer.as_bytes());
        hasher.update([0xffu8]);
    }
    format!("{:x}", hasher.finalize())
}
