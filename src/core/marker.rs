use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;

/// Length of a full hexadecimal revision id.
pub const REVISION_ID_LEN: usize = 40;

/// The file recording the last revision successfully checked out.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitMarker {
    path: PathBuf,
}

impl CommitMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored id, or `None` when the file is missing, unreadable
    /// or does not hold exactly [`REVISION_ID_LEN`] characters.
    pub async fn load(&self) -> Option<String> {
        let content = fs::read_to_string(&self.path).await.ok()?;
        is_valid_length(&content).then_some(content)
    }

    /// Overwrite the marker with `id`, written as-is without a newline.
    pub async fn save(&self, id: &str) -> Result<()> {
        fs::write(&self.path, id)
            .await
            .with_context(|| format!("Failed to write commit marker {:?}", self.path))
    }
}

pub fn is_valid_length(id: &str) -> bool {
    id.len() == REVISION_ID_LEN
}
