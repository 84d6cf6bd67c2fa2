//! Per-video advisory lease.
//!
//! One orchestrator run holds the lease for a video id from start to
//! completion or failure. A lease older than the stale timeout is treated
//! as abandoned and may be taken over.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

#[derive(Debug, Serialize, Deserialize)]
struct LeaseDocument {
    video_id: String,
    /// Identifies the holding run in logs and stale-takeover warnings.
    owner: Uuid,
    acquired_at: DateTime<Utc>,
    pid: u32,
}

/// Held advisory lease for one video id.
///
/// Released explicitly via [`LeaseGuard::release`]; dropping the guard
/// removes the lease file best-effort as a fallback.
#[derive(Debug)]
pub struct LeaseGuard {
    path: PathBuf,
    released: bool,
}

impl LeaseGuard {
    fn lease_path(root: &Path, video_id: &str) -> PathBuf {
        root.join("leases").join(format!("{video_id}.lock"))
    }

    /// Acquire the lease for a video id.
    ///
    /// Fails with [`StoreError::LeaseHeld`] when another run holds a lease
    /// younger than `stale_after`.
    pub async fn acquire(
        root: impl AsRef<Path>,
        video_id: &str,
        stale_after: Duration,
    ) -> StoreResult<Self> {
        let path = Self::lease_path(root.as_ref(), video_id);

        if let Some(existing) = crate::artifact::read_optional::<LeaseDocument>(&path).await? {
            let age = Utc::now().signed_duration_since(existing.acquired_at);
            if age.to_std().unwrap_or(Duration::ZERO) < stale_after {
                return Err(StoreError::lease_held(video_id));
            }
            warn!(
                video_id = %video_id,
                owner = %existing.owner,
                acquired_at = %existing.acquired_at,
                "Taking over stale lease"
            );
        }

        let doc = LeaseDocument {
            video_id: video_id.to_string(),
            owner: Uuid::new_v4(),
            acquired_at: Utc::now(),
            pid: std::process::id(),
        };
        crate::artifact::write_atomic(&path, &doc).await?;
        debug!(video_id = %video_id, owner = %doc.owner, "Acquired run lease");

        Ok(Self {
            path,
            released: false,
        })
    }

    /// Release the lease.
    pub async fn release(mut self) -> StoreResult<()> {
        self.released = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STALE: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_acquire_and_release() {
        let dir = tempfile::tempdir().unwrap();

        let lease = LeaseGuard::acquire(dir.path(), "vid1", STALE).await.unwrap();
        lease.release().await.unwrap();

        // Releasable again after release.
        let lease = LeaseGuard::acquire(dir.path(), "vid1", STALE).await.unwrap();
        lease.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_second_acquire_fails_while_held() {
        let dir = tempfile::tempdir().unwrap();

        let _lease = LeaseGuard::acquire(dir.path(), "vid1", STALE).await.unwrap();

        assert!(matches!(
            LeaseGuard::acquire(dir.path(), "vid1", STALE).await,
            Err(StoreError::LeaseHeld { .. })
        ));
    }

    #[tokio::test]
    async fn test_stale_lease_taken_over() {
        let dir = tempfile::tempdir().unwrap();

        let lease = LeaseGuard::acquire(dir.path(), "vid1", STALE).await.unwrap();
        // Forget instead of releasing: simulates a crashed run.
        std::mem::forget(lease);

        assert!(matches!(
            LeaseGuard::acquire(dir.path(), "vid1", STALE).await,
            Err(StoreError::LeaseHeld { .. })
        ));

        // With a zero stale timeout the abandoned lease is reclaimable.
        let lease = LeaseGuard::acquire(dir.path(), "vid1", Duration::ZERO)
            .await
            .unwrap();
        lease.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_leases_are_per_video() {
        let dir = tempfile::tempdir().unwrap();

        let a = LeaseGuard::acquire(dir.path(), "vid1", STALE).await.unwrap();
        let b = LeaseGuard::acquire(dir.path(), "vid2", STALE).await.unwrap();

        a.release().await.unwrap();
        b.release().await.unwrap();
    }
}
