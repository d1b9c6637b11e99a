use std::path::Path;

use crate::error::{AnalyzerError, Result};

pub const DOCX_EXTENSION: &str = ".docx";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Client-side gate on the file name. Case-sensitive; the server has the
/// final say.
pub fn is_docx(name: &str) -> bool {
    name.ends_with(DOCX_EXTENSION)
}

/// A protocol document held in memory, ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolFile {
    name: String,
    bytes: Vec<u8>,
}

impl ProtocolFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads a file from disk, keeping only its file name.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| AnalyzerError::InvalidFile(format!("{} has no file name", path.display())))?;
        let bytes = tokio::fs::read(path).await?;
        Ok(Self { name, bytes })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_docx(&self) -> bool {
        is_docx(&self.name)
    }
}
