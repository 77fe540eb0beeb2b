//! Artifacts downloaded as a gzipped tarball.

use std::{path::Path, time::Duration};

use anyhow::Context;
use flate2::read::GzDecoder;
use tempdir::TempDir;
use url::Url;

use super::{AcquiredArtifacts, ArtifactProvider, ArtifactsFs, Progress, ReleaseHandle};
use crate::ArtifactsLocator;

/// Default base URL tag locators are resolved against.
pub const DEFAULT_ARTIFACTS_BASE_URL: &str =
    "https://storage.googleapis.com/oplabs-contract-artifacts/";

/// Largest archive accepted from a remote server, in bytes.
const MAX_ARTIFACTS_SIZE: u64 = 1 << 30;

/// Timeout for establishing the download connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Provider for `tag://` and `http(s)://` locators.
///
/// The archive is streamed into memory up to `MAX_ARTIFACTS_SIZE` bytes, unpacked
/// into a temporary directory and the directory is removed on release. A
/// failed acquisition removes the partially unpacked directory before
/// returning.
#[derive(Debug, Clone)]
pub struct RemoteArtifacts {
    client: reqwest::Client,
    base_url: Url,
    max_size: u64,
}

impl RemoteArtifacts {
    pub fn new(base_url: Url) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url,
            max_size: MAX_ARTIFACTS_SIZE,
        })
    }

    /// The archive URL for `locator`.
    ///
    /// `tag://op-contracts/v1.6.0` maps to `<base>/artifacts-op-contracts-v1.6.0.tar.gz`.
    pub fn archive_url(&self, locator: &ArtifactsLocator) -> anyhow::Result<Url> {
        match locator {
            ArtifactsLocator::Tag(tag) => {
                let file = format!("artifacts-{}.tar.gz", tag.replace('/', "-"));
                self.base_url
                    .join(&file)
                    .with_context(|| format!("Failed to build artifacts URL for tag {tag}"))
            }
            ArtifactsLocator::Url(url) if matches!(url.scheme(), "http" | "https") => {
                Ok(url.clone())
            }
            ArtifactsLocator::Url(url) => {
                anyhow::bail!("Remote artifacts cannot be fetched from {url}")
            }
        }
    }

    async fn download(&self, url: &Url, progress: Progress<'_>) -> anyhow::Result<Vec<u8>> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to request artifacts from {url}"))?
            .error_for_status()
            .with_context(|| format!("Artifacts request to {url} failed"))?;

        let total = response.content_length();
        if let Some(total) = total.filter(|total| *total > self.max_size) {
            anyhow::bail!(
                "Artifacts archive at {url} is {total} bytes, over the {} byte limit",
                self.max_size
            );
        }

        let mut archive = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .context("Failed to read artifacts response body")?
        {
            if (archive.len() + chunk.len()) as u64 > self.max_size {
                anyhow::bail!(
                    "Artifacts archive at {url} is over the {} byte limit",
                    self.max_size
                );
            }
            archive.extend_from_slice(&chunk);
            progress(archive.len() as u64, total.unwrap_or(0));
        }

        Ok(archive)
    }
}

impl ArtifactProvider for RemoteArtifacts {
    async fn acquire(
        &self,
        locator: &ArtifactsLocator,
        progress: Progress<'_>,
    ) -> anyhow::Result<AcquiredArtifacts> {
        let url = self.archive_url(locator)?;
        tracing::debug!(%url, "Downloading artifacts");

        let archive = self.download(&url, progress).await?;

        let dir = TempDir::new("opcm-artifacts").context("Failed to create artifacts directory")?;
        let dir = extract(archive, dir).await?;

        let fs = ArtifactsFs::open(dir.path())?;
        Ok(AcquiredArtifacts {
            fs,
            release: ReleaseHandle::new(move || {
                dir.close().context("Failed to remove artifacts directory")
            }),
        })
    }
}

/// Unpack `archive` into `dir` on the blocking pool.
///
/// The extraction task owns `dir`, so it is removed only once the task is done
/// writing to it, even if this future is dropped first.
async fn extract(archive: Vec<u8>, dir: TempDir) -> anyhow::Result<TempDir> {
    tokio::task::spawn_blocking(move || {
        unpack_archive(&archive, dir.path())?;
        Ok::<_, anyhow::Error>(dir)
    })
    .await
    .context("Artifacts extraction task failed")?
}

/// Unpack a gzipped tarball into `dest`.
fn unpack_archive(archive: &[u8], dest: &Path) -> anyhow::Result<()> {
    tar::Archive::new(GzDecoder::new(archive))
        .unpack(dest)
        .with_context(|| format!("Failed to unpack artifacts into {}", dest.display()))
}
