//! Artifacts read in place from a local directory.

use anyhow::Context;

use super::{AcquiredArtifacts, ArtifactProvider, ArtifactsFs, Progress, ReleaseHandle};
use crate::ArtifactsLocator;

/// Provider for `file://` locators. Nothing is copied, so release is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalArtifacts;

impl ArtifactProvider for LocalArtifacts {
    async fn acquire(
        &self,
        locator: &ArtifactsLocator,
        progress: Progress<'_>,
    ) -> anyhow::Result<AcquiredArtifacts> {
        let ArtifactsLocator::Url(url) = locator else {
            anyhow::bail!("Local artifacts require a file:// locator, got {locator}");
        };
        if url.scheme() != "file" {
            anyhow::bail!("Local artifacts require a file:// locator, got {locator}");
        }

        let path = url
            .to_file_path()
            .map_err(|()| anyhow::anyhow!("Invalid file path in locator {locator}"))?;
        let fs = ArtifactsFs::open(&path)
            .with_context(|| format!("Failed to open artifacts at {}", path.display()))?;

        progress(1, 1);

        Ok(AcquiredArtifacts {
            fs,
            release: ReleaseHandle::noop(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tempdir::TempDir;
    use url::Url;

    use super::*;

    #[tokio::test]
    async fn test_acquire_local_directory() {
        let dir = TempDir::new("opcm-local-artifacts").unwrap();
        let locator = ArtifactsLocator::Url(Url::from_directory_path(dir.path()).unwrap());
        let reports = Mutex::new(Vec::new());

        let acquired = LocalArtifacts
            .acquire(&locator, &|current, total| {
                reports.lock().unwrap().push((current, total))
            })
            .await
            .unwrap();

        assert_eq!(acquired.fs.root(), dir.path());
        assert_eq!(*reports.lock().unwrap(), vec![(1, 1)]);
        acquired.release.run().unwrap();
        assert!(dir.path().exists(), "local artifacts must never be deleted");
    }

    #[tokio::test]
    async fn test_rejects_non_file_locators() {
        let tag: ArtifactsLocator = "tag://op-contracts/v1.6.0".parse().unwrap();
        assert!(LocalArtifacts.acquire(&tag, &|_, _| {}).await.is_err());

        let missing: ArtifactsLocator = "file:///definitely/not/here".parse().unwrap();
        assert!(LocalArtifacts.acquire(&missing, &|_, _| {}).await.is_err());
    }
}
