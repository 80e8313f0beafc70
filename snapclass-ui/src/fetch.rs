//! Remote model artifact fetch
//!
//! Download-if-absent: an existing local file is used as-is and no network
//! request is made. Downloads land in `<path>.part` and are renamed into place
//! once complete, so an interrupted download never looks like a model.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("model file {0} is missing and no download source is configured")]
    NoSource(PathBuf),

    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("download from {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("download from {0} returned an HTML page instead of a model file")]
    UnexpectedHtml(String),

    #[error("download from {0} was empty")]
    Empty(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ModelFetcher {
    client: reqwest::Client,
}

impl ModelFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("snapclass-ui/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Make sure `path` exists locally, downloading it from `source` if needed
    pub async fn ensure_local(
        &self,
        source: Option<&str>,
        path: &Path,
    ) -> Result<PathBuf, FetchError> {
        if tokio::fs::try_exists(path).await? {
            debug!("Model cache hit: {}", path.display());
            return Ok(path.to_path_buf());
        }

        let url = source.ok_or_else(|| FetchError::NoSource(path.to_path_buf()))?;
        info!("Downloading model from {} to {}", url, path.display());

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let part_path = part_path(path);
        match self.download(url, &part_path).await {
            Ok(bytes) => {
                tokio::fs::rename(&part_path, path).await?;
                info!("Model downloaded ({} bytes)", bytes);
                Ok(path.to_path_buf())
            }
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&part_path).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        warn!("Failed to remove {}: {}", part_path.display(), cleanup);
                    }
                }
                Err(e)
            }
        }
    }

    async fn download(&self, url: &str, target: &Path) -> Result<u64, FetchError> {
        let mut response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/html"));
        if is_html {
            return Err(FetchError::UnexpectedHtml(url.to_string()));
        }

        let mut file = tokio::fs::File::create(target).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        if written == 0 {
            return Err(FetchError::Empty(url.to_string()));
        }
        Ok(written)
    }
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}
