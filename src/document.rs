//! Persisted documents and their JSON file I/O.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use tracing::debug;

use crate::error::{Error, Result};
use crate::event::RecordPayload;

/// A post accepted into the sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
    pub uri: String,
    #[serde(rename = "did")]
    pub originator_id: String,
    #[serde(rename = "rkey")]
    pub record_key: String,
    pub record: RecordPayload,
}

/// Output of the sampler. `total` is the requested capacity, which may exceed
/// `data.len()` when the window was quiet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleDocument {
    pub total: usize,
    pub data: Vec<CandidateItem>,
}

/// A post as returned by the lookup API, trimmed to what the dataset keeps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedItem {
    pub uri: String,
    pub author: Value,
    pub record: Value,
    pub like_count: Option<u64>,
    pub reply_count: Option<u64>,
    pub repost_count: Option<u64>,
    pub bookmark_count: Option<u64>,
    pub quote_count: Option<u64>,
}

/// Output of the enricher. `total` counts what actually resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydratedDocument {
    pub total: usize,
    pub data: Vec<EnrichedItem>,
}

impl SampleDocument {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        read_json(path.as_ref()).await
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        write_json(path.as_ref(), self).await
    }

    pub fn uris(&self) -> Vec<String> {
        self.data.iter().map(|item| item.uri.clone()).collect()
    }
}

impl HydratedDocument {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        read_json(path.as_ref()).await
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        write_json(path.as_ref(), self).await
    }
}

/// Render with four-space indentation, matching the files already on disk
/// from earlier collection runs.
pub fn to_pretty_json<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let fmt = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, fmt);
    value.serialize(&mut ser)?;
    Ok(buf)
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Error::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|source| Error::Document {
        path: path.to_path_buf(),
        source,
    })
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = to_pretty_json(value).map_err(|source| Error::Document {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| Error::io(dir, e))?;
    }
    tokio::fs::write(path, &bytes)
        .await
        .map_err(|e| Error::io(path, e))?;
    debug!(path = %path.display(), bytes = bytes.len(), "document written");
    Ok(())
}
