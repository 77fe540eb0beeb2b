//! Contract artifacts acquisition.
//!
//! An [`ArtifactProvider`] turns an [`ArtifactsLocator`] into a readable
//! directory plus a [`ReleaseHandle`]. The [`ArtifactSession`] owns both for
//! the length of a run and releases the artifacts exactly once, whichever way
//! the run exits.

mod local;
mod remote;

use std::{
    fmt,
    future::Future,
    path::{Path, PathBuf},
};

use derive_more::Deref;
use tokio_util::sync::CancellationToken;

pub use local::LocalArtifacts;
pub use remote::{DEFAULT_ARTIFACTS_BASE_URL, RemoteArtifacts};

use crate::{ArtifactsLocator, BootstrapError, Stage, cancel::or_cancelled};

/// Progress sink, called with `(current, total)`. `total` is zero when unknown.
pub type Progress<'a> = &'a (dyn Fn(u64, u64) + Send + Sync);

/// A read-only view of a forge artifacts directory.
#[derive(Debug, Clone, PartialEq, Eq, Deref)]
pub struct ArtifactsFs(PathBuf);

impl ArtifactsFs {
    /// Open `root`, descending into a `forge-artifacts` subdirectory if present.
    pub fn open(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            anyhow::bail!("Artifacts directory does not exist: {}", root.display());
        }

        let nested = root.join("forge-artifacts");
        Ok(Self(if nested.is_dir() { nested } else { root }))
    }

    pub fn root(&self) -> &Path {
        &self.0
    }

    /// Path of the compiled artifact of `contract`, e.g. `OPContractsManager.sol/OPContractsManager.json`.
    pub fn artifact_path(&self, contract: &str) -> PathBuf {
        self.0
            .join(format!("{contract}.sol"))
            .join(format!("{contract}.json"))
    }

    pub fn has_artifact(&self, contract: &str) -> bool {
        self.artifact_path(contract).is_file()
    }
}

/// Cleanup callback for acquired artifacts.
pub struct ReleaseHandle(Box<dyn FnOnce() -> anyhow::Result<()> + Send>);

impl ReleaseHandle {
    pub fn new(release: impl FnOnce() -> anyhow::Result<()> + Send + 'static) -> Self {
        Self(Box::new(release))
    }

    /// A handle with nothing to clean up.
    pub fn noop() -> Self {
        Self::new(|| Ok(()))
    }

    fn run(self) -> anyhow::Result<()> {
        (self.0)()
    }
}

impl fmt::Debug for ReleaseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ReleaseHandle")
    }
}

/// Artifacts returned by a provider.
#[derive(Debug)]
pub struct AcquiredArtifacts {
    pub fs: ArtifactsFs,
    pub release: ReleaseHandle,
}

/// Resolves a locator into a readable artifacts directory.
///
/// Providers must clean up after themselves when acquisition fails part way;
/// the returned [`ReleaseHandle`] only covers a successful acquisition.
pub trait ArtifactProvider: Send + Sync {
    fn acquire(
        &self,
        locator: &ArtifactsLocator,
        progress: Progress<'_>,
    ) -> impl Future<Output = anyhow::Result<AcquiredArtifacts>> + Send;
}

/// Dispatches `file://` locators to [`LocalArtifacts`] and everything else to
/// [`RemoteArtifacts`].
#[derive(Debug, Clone)]
pub struct ArtifactFetcher {
    pub local: LocalArtifacts,
    pub remote: RemoteArtifacts,
}

impl ArtifactFetcher {
    pub fn new(remote: RemoteArtifacts) -> Self {
        Self {
            local: LocalArtifacts,
            remote,
        }
    }
}

impl ArtifactProvider for ArtifactFetcher {
    async fn acquire(
        &self,
        locator: &ArtifactsLocator,
        progress: Progress<'_>,
    ) -> anyhow::Result<AcquiredArtifacts> {
        if locator.is_local() {
            self.local.acquire(locator, progress).await
        } else {
            self.remote.acquire(locator, progress).await
        }
    }
}

/// Scoped ownership of acquired artifacts.
///
/// [`ArtifactSession::release`] runs the provider's cleanup. If the session is
/// dropped without being released (early return, panic) the cleanup runs from
/// `Drop` instead. Cleanup failures are logged, never propagated.
#[derive(Debug)]
pub struct ArtifactSession {
    fs: ArtifactsFs,
    release: Option<ReleaseHandle>,
}

impl ArtifactSession {
    pub async fn acquire<P: ArtifactProvider + ?Sized>(
        provider: &P,
        locator: &ArtifactsLocator,
        progress: Progress<'_>,
        cancel: &CancellationToken,
    ) -> Result<Self, BootstrapError> {
        tracing::info!(%locator, "Acquiring artifacts...");

        let acquired = or_cancelled(cancel, Stage::Artifacts, async {
            provider
                .acquire(locator, progress)
                .await
                .map_err(|source| BootstrapError::Artifacts {
                    locator: locator.to_string(),
                    source,
                })
        })
        .await?;

        tracing::debug!(root = %acquired.fs.root().display(), "Artifacts acquired");

        Ok(Self {
            fs: acquired.fs,
            release: Some(acquired.release),
        })
    }

    pub const fn fs(&self) -> &ArtifactsFs {
        &self.fs
    }

    /// Release the artifacts now.
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        let Some(handle) = self.release.take() else {
            return;
        };

        match handle.run() {
            Ok(()) => tracing::debug!(root = %self.fs.root().display(), "Artifacts released"),
            Err(err) => tracing::warn!(err = %format!("{err:#}"), "Failed to clean up artifacts"),
        }
    }
}

impl Drop for ArtifactSession {
    fn drop(&mut self) {
        self.release_once();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use tempdir::TempDir;

    use super::*;

    struct CountingProvider {
        root: PathBuf,
        releases: Arc<AtomicUsize>,
        fail_release: bool,
    }

    impl ArtifactProvider for CountingProvider {
        async fn acquire(
            &self,
            _locator: &ArtifactsLocator,
            progress: Progress<'_>,
        ) -> anyhow::Result<AcquiredArtifacts> {
            progress(1, 0);
            let releases = self.releases.clone();
            let fail = self.fail_release;
            Ok(AcquiredArtifacts {
                fs: ArtifactsFs::open(&self.root)?,
                release: ReleaseHandle::new(move || {
                    releases.fetch_add(1, Ordering::SeqCst);
                    if fail {
                        anyhow::bail!("disk on fire");
                    }
                    Ok(())
                }),
            })
        }
    }

    fn locator() -> ArtifactsLocator {
        "tag://op-contracts/v1.6.0".parse().unwrap()
    }

    #[test]
    fn test_artifacts_fs_descends_into_forge_artifacts() {
        let dir = TempDir::new("opcm-artifacts-test").unwrap();
        let nested = dir.path().join("forge-artifacts/OPContractsManager.sol");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("OPContractsManager.json"), "{}").unwrap();

        let fs = ArtifactsFs::open(dir.path()).unwrap();
        assert_eq!(fs.root(), dir.path().join("forge-artifacts"));
        assert!(fs.has_artifact("OPContractsManager"));
        assert!(!fs.has_artifact("MIPS"));
    }

    #[test]
    fn test_artifacts_fs_missing_root() {
        assert!(ArtifactsFs::open("/definitely/not/here").is_err());
    }

    #[tokio::test]
    async fn test_release_runs_once_when_explicit() {
        let dir = TempDir::new("opcm-artifacts-test").unwrap();
        let releases = Arc::new(AtomicUsize::new(0));
        let provider = CountingProvider {
            root: dir.path().to_path_buf(),
            releases: releases.clone(),
            fail_release: false,
        };

        let session =
            ArtifactSession::acquire(&provider, &locator(), &|_, _| {}, &CancellationToken::new())
                .await
                .unwrap();
        session.release();

        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_runs_once_on_drop() {
        let dir = TempDir::new("opcm-artifacts-test").unwrap();
        let releases = Arc::new(AtomicUsize::new(0));
        let provider = CountingProvider {
            root: dir.path().to_path_buf(),
            releases: releases.clone(),
            fail_release: true,
        };

        {
            let _session = ArtifactSession::acquire(
                &provider,
                &locator(),
                &|_, _| {},
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        }

        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_acquire_observes_cancellation() {
        let dir = TempDir::new("opcm-artifacts-test").unwrap();
        let releases = Arc::new(AtomicUsize::new(0));
        let provider = CountingProvider {
            root: dir.path().to_path_buf(),
            releases: releases.clone(),
            fail_release: false,
        };
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = ArtifactSession::acquire(&provider, &locator(), &|_, _| {}, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::Cancelled {
                stage: Stage::Artifacts
            }
        ));
        assert_eq!(releases.load(Ordering::SeqCst), 0);
    }
}
