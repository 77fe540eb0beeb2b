//! Cancellation at blocking boundaries.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::{BootstrapError, Stage};

/// Run `fut` unless `cancel` fires first, in which case `fut` is dropped and
/// a [`BootstrapError::Cancelled`] for `stage` is returned.
pub(crate) async fn or_cancelled<T, F>(
    cancel: &CancellationToken,
    stage: Stage,
    fut: F,
) -> Result<T, BootstrapError>
where
    F: Future<Output = Result<T, BootstrapError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::warn!(%stage, "Cancellation requested");
            Err(BootstrapError::Cancelled { stage })
        }
        res = fut => res,
    }
}
