//! Compiled contract artifacts.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::gateway::CodeId;

/// Bytecode read from disk, ready to upload.
#[derive(Debug, Clone)]
pub struct Bytecode {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl Bytecode {
    /// Read a `.wasm` file.
    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "Read contract bytecode");
        Ok(Self {
            path: path.to_path_buf(),
            bytes,
        })
    }

    /// Hex-encoded SHA-256 of the bytecode, as printed by `sha256sum`.
    pub fn checksum(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }
}

/// Code stored on chain by an upload step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeArtifact {
    pub code_id: CodeId,
    pub source_path: PathBuf,
    /// SHA-256 of the uploaded bytecode.
    pub checksum: String,
}

impl CodeArtifact {
    pub fn new(code_id: CodeId, bytecode: &Bytecode) -> Self {
        Self {
            code_id,
            source_path: bytecode.path.clone(),
            checksum: bytecode.checksum(),
        }
    }
}
