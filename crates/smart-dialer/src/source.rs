//! Contact sources - where the directory gets its people from

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::contact::ContactRecord;
use crate::error::{DialerError, DialerResult};

#[async_trait]
pub trait ContactSource: Send + Sync {
    /// Read every contact from the address book.
    async fn fetch_contacts(&self) -> DialerResult<Vec<ContactRecord>>;
}

/// Contact set pushed in by the embedder, replaceable between refreshes.
pub struct StaticContactSource {
    records: ArcSwap<Vec<ContactRecord>>,
}

impl StaticContactSource {
    pub fn new(records: Vec<ContactRecord>) -> Self {
        Self {
            records: ArcSwap::new(Arc::new(records)),
        }
    }

    pub fn replace(&self, records: Vec<ContactRecord>) {
        info!("Replacing static contact source with {} records", records.len());
        self.records.store(Arc::new(records));
    }

    pub fn len(&self) -> usize {
        self.records.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContactSource for StaticContactSource {
    async fn fetch_contacts(&self) -> DialerResult<Vec<ContactRecord>> {
        Ok((**self.records.load()).clone())
    }
}

/// JSON array of contact records exported from the address book.
pub struct JsonFileContactSource {
    path: PathBuf,
}

impl JsonFileContactSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ContactSource for JsonFileContactSource {
    async fn fetch_contacts(&self) -> DialerResult<Vec<ContactRecord>> {
        debug!("Reading contacts from {}", self.path.display());

        let raw = tokio::fs::read(&self.path).await.map_err(|e| {
            DialerError::source_unavailable(format!("{}: {}", self.path.display(), e))
        })?;

        serde_json::from_slice(&raw).map_err(|e| {
            DialerError::source_unavailable(format!(
                "{}: invalid contact export: {}",
                self.path.display(),
                e
            ))
        })
    }
}
