//! Save targets: where a triggered download ends up.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::error::ArtifactError;
use super::filename::resolve_unique_path;

/// What a save target receives for one download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavePayload {
    /// Locator to fetch; may be relative to the generation endpoint.
    Remote(String),
    /// Bytes held in memory.
    Local(Arc<[u8]>),
}

/// A saved artifact on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifact {
    /// Where the file was written.
    pub path: PathBuf,
    /// Bytes written.
    pub bytes: u64,
}

/// Destination for a triggered download.
#[async_trait]
pub trait SaveTarget: Send + Sync {
    /// Saves `payload` under a name derived from `filename`.
    ///
    /// # Errors
    ///
    /// Returns an [`ArtifactError`] when the payload cannot be fetched or
    /// written.
    async fn save(&self, payload: SavePayload, filename: &str)
    -> Result<SavedArtifact, ArtifactError>;
}

/// Saves artifacts into a directory, never overwriting existing files.
///
/// Remote locators are resolved against `base` (the generation endpoint) and
/// streamed to disk. A partially written file is removed on failure.
#[derive(Debug, Clone)]
pub struct DirectorySaveTarget {
    client: Client,
    base: Url,
    output_dir: PathBuf,
}

impl DirectorySaveTarget {
    /// Creates a save target writing into `output_dir`.
    pub fn new(client: Client, base: Url, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            base,
            output_dir: output_dir.into(),
        }
    }

    /// The directory files are written into.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Resolves a locator against the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::InvalidLocator`] for empty or unjoinable
    /// locators.
    pub fn resolve_locator(&self, locator: &str) -> Result<Url, ArtifactError> {
        let trimmed = locator.trim();
        if trimmed.is_empty() {
            return Err(ArtifactError::invalid_locator(locator));
        }
        self.base
            .join(trimmed)
            .map_err(|_| ArtifactError::invalid_locator(locator))
    }

    async fn ensure_output_dir(&self) -> Result<(), ArtifactError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| ArtifactError::io(&self.output_dir, e))
    }

    async fn write_local(&self, bytes: &[u8], path: &Path) -> Result<u64, ArtifactError> {
        let mut file = File::create(path)
            .await
            .map_err(|e| ArtifactError::io(path, e))?;
        let result = async {
            file.write_all(bytes).await?;
            file.flush().await
        }
        .await;
        if let Err(e) = result {
            drop(file);
            remove_partial(path).await;
            return Err(ArtifactError::io(path, e));
        }
        Ok(bytes.len() as u64)
    }

    async fn fetch_remote(&self, locator: &str, path: &Path) -> Result<u64, ArtifactError> {
        let url = self.resolve_locator(locator)?;
        let url_str = url.to_string();
        debug!(url = %url_str, "fetching remote artifact");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ArtifactError::network(&url_str, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArtifactError::http_status(&url_str, status.as_u16()));
        }

        let mut file = File::create(path)
            .await
            .map_err(|e| ArtifactError::io(path, e))?;
        match stream_to_file(&mut file, response, &url_str, path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                drop(file);
                remove_partial(path).await;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl SaveTarget for DirectorySaveTarget {
    #[instrument(skip(self, payload), fields(dir = %self.output_dir.display()))]
    async fn save(
        &self,
        payload: SavePayload,
        filename: &str,
    ) -> Result<SavedArtifact, ArtifactError> {
        self.ensure_output_dir().await?;
        let path = resolve_unique_path(&self.output_dir, filename);

        let bytes = match &payload {
            SavePayload::Local(bytes) => self.write_local(bytes, &path).await?,
            SavePayload::Remote(locator) => self.fetch_remote(locator, &path).await?,
        };

        info!(path = %path.display(), bytes, "artifact saved");
        Ok(SavedArtifact { path, bytes })
    }
}

async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, ArtifactError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| ArtifactError::network(url, e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| ArtifactError::io(file_path, e))?;
        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| ArtifactError::io(file_path, e))?;

    Ok(bytes_written)
}

async fn remove_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove partial file");
        }
    }
}
