use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use catalog::{StoreDocument, StoreError, Upsert};
use chrono::{DateTime, Utc};

/// Empty-store document served when the file does not exist yet.
pub const EMPTY_STORE: &str = "[]";

/// The region store: one JSON array in one file.
///
/// Every write reads the whole file, modifies it and writes it back. There
/// is no locking; concurrent writers race and the last one wins.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File contents as stored, or `[]` when the file is missing.
    pub async fn raw(&self) -> Result<String, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(text),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(EMPTY_STORE.to_string()),
            Err(err) => Err(StoreError::Io(format!("{}: {err}", self.path.display()))),
        }
    }

    pub async fn load(&self) -> Result<StoreDocument, StoreError> {
        StoreDocument::parse(&self.raw().await?)
    }

    pub async fn save(&self, doc: &StoreDocument) -> Result<(), StoreError> {
        let json = doc.to_json()?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| StoreError::Io(format!("{}: {e}", dir.display())))?;
        }
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| StoreError::Io(format!("{}: {e}", self.path.display())))
    }

    pub async fn upsert(
        &self,
        name: &str,
        summary: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Upsert, StoreError> {
        let mut doc = self.load().await?;
        let outcome = doc.upsert(name, summary, now)?;
        self.save(&doc).await?;
        Ok(outcome)
    }
}
