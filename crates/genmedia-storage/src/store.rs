//! Filesystem-backed artifact store.
//!
//! Each artifact is a binary file `{dir}/{id}{ext}` plus a metadata sidecar
//! `{dir}/{id}.json`. The pair is not written atomically: a crash between
//! the two writes can leave one without the other, and readers must
//! tolerate a sidecar whose binary is missing.
//!
//! No locking. Concurrent saves are safe because each id writes disjoint
//! files; a `list` racing a `save` on the same id may observe the sidecar
//! before the binary exists.

use std::path::PathBuf;
use std::time::Instant;

use genmedia_core::models::{ArtifactMetadata, GenerationSettings};
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Failed to create storage directory {dir}: {source}")]
    CreateDir {
        dir: String,
        source: std::io::Error,
    },

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Metadata serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One flat directory of binaries and sidecars. The server holds two
/// instances: the storage root for videos and its `images/` subdirectory.
#[derive(Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Create the store, creating `dir` recursively if absent. Failure here
    /// is a startup invariant violation and should abort the process.
    pub async fn new(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(|e| StoreError::CreateDir {
            dir: dir.display().to_string(),
            source: e,
        })?;
        Ok(Self { dir })
    }

    /// Fresh artifact identifier.
    pub fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    fn binary_path(&self, id: &str, mime_type: &str) -> PathBuf {
        self.dir.join(format!("{}{}", id, extension_for(mime_type)))
    }

    fn metadata_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Write the binary and its sidecar, returning the stored metadata.
    pub async fn save(
        &self,
        id: &str,
        bytes: &[u8],
        mime_type: &str,
        prompt: Option<&str>,
        settings: &GenerationSettings,
    ) -> StoreResult<ArtifactMetadata> {
        let start = Instant::now();
        let path = self.binary_path(id, mime_type);

        fs::write(&path, bytes).await.map_err(|e| {
            StoreError::WriteFailed(format!("{}: {}", path.display(), e))
        })?;

        let abs_path = fs::canonicalize(&path).await.unwrap_or_else(|_| path.clone());

        let metadata = ArtifactMetadata {
            id: id.to_string(),
            created_at: chrono::Utc::now(),
            prompt: prompt.map(str::to_string),
            config: settings.clone(),
            mime_type: mime_type.to_string(),
            size: bytes.len() as u64,
            filepath: abs_path.display().to_string(),
            video_url: None,
        };
        self.write_sidecar(&metadata).await?;

        tracing::info!(
            id = %id,
            path = %abs_path.display(),
            size_bytes = bytes.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Stored artifact"
        );

        Ok(metadata)
    }

    /// Persist metadata only, retaining the remote reference. No binary
    /// file is created: `filepath` stays empty and `size` stays zero.
    pub async fn save_deferred(
        &self,
        id: &str,
        remote_url: &str,
        mime_type: &str,
        prompt: Option<&str>,
        settings: &GenerationSettings,
    ) -> StoreResult<ArtifactMetadata> {
        let metadata = ArtifactMetadata {
            id: id.to_string(),
            created_at: chrono::Utc::now(),
            prompt: prompt.map(str::to_string),
            config: settings.clone(),
            mime_type: mime_type.to_string(),
            size: 0,
            filepath: String::new(),
            video_url: Some(remote_url.to_string()),
        };
        self.write_sidecar(&metadata).await?;

        tracing::info!(id = %id, url = %remote_url, "Stored deferred artifact");

        Ok(metadata)
    }

    async fn write_sidecar(&self, metadata: &ArtifactMetadata) -> StoreResult<()> {
        let path = self.metadata_path(&metadata.id);
        let json = serde_json::to_vec_pretty(metadata)?;
        fs::write(&path, json).await.map_err(|e| {
            StoreError::WriteFailed(format!("{}: {}", path.display(), e))
        })?;
        Ok(())
    }

    /// Look up an artifact by id. With `include_full_data` the binary is
    /// read and returned alongside the metadata; without it no binary I/O
    /// happens, which keeps metadata-only listings cheap.
    pub async fn get(
        &self,
        id: &str,
        include_full_data: bool,
    ) -> StoreResult<(ArtifactMetadata, Option<Vec<u8>>)> {
        let path = self.metadata_path(id);
        let raw = fs::read(&path)
            .await
            .map_err(|_| StoreError::NotFound(id.to_string()))?;
        let metadata: ArtifactMetadata =
            serde_json::from_slice(&raw).map_err(|_| StoreError::NotFound(id.to_string()))?;

        if !include_full_data {
            return Ok((metadata, None));
        }

        if metadata.filepath.is_empty() {
            return Err(StoreError::NotFound(format!("{} has no local copy", id)));
        }
        let bytes = fs::read(&metadata.filepath)
            .await
            .map_err(|_| StoreError::NotFound(format!("{} binary missing", id)))?;
        Ok((metadata, Some(bytes)))
    }

    /// Enumerate all sidecars in the store directory (non-recursive).
    /// Unparsable sidecars are skipped with a warning rather than failing
    /// the whole listing. Order follows filesystem enumeration and is not
    /// guaranteed stable or chronological.
    pub async fn list(&self) -> StoreResult<Vec<ArtifactMetadata>> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut artifacts = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if !entry.file_type().await?.is_file() {
                continue;
            }
            match fs::read(&path).await {
                Ok(raw) => match serde_json::from_slice::<ArtifactMetadata>(&raw) {
                    Ok(metadata) => artifacts.push(metadata),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Skipping unparsable metadata sidecar");
                    }
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable metadata sidecar");
                }
            }
        }

        Ok(artifacts)
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "video/mp4" => ".mp4",
        "image/png" => ".png",
        "image/jpeg" => ".jpg",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        _ => ".bin",
    }
}
