use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use super::error::FetchError;
use super::fetch::EntryFetcher;
use super::types::RawRecord;

/// Reads the bank from a local JSON array of `{id?, question, answer}` objects.
///
/// Rows without an id get a positional one (`row-1`, `row-2`, ...).
#[derive(Debug, Clone)]
pub struct FileFetcher {
    path: PathBuf,
}

impl FileFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EntryFetcher for FileFetcher {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn fetch_entries(&self) -> Result<Vec<RawRecord>, FetchError> {
        let bytes = tokio::fs::read(&self.path).await?;
        let mut records: Vec<RawRecord> = serde_json::from_slice(&bytes)?;

        for (index, record) in records.iter_mut().enumerate() {
            if record.id.trim().is_empty() {
                record.id = format!("row-{}", index + 1);
            }
        }

        debug!(rows = records.len(), "Read bank file");
        Ok(records)
    }
}
