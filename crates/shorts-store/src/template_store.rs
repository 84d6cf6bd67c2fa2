//! The shared template document.
//!
//! A single `templates.json` lives under the data root. Replacement is
//! whole-document with a temp-file rename, so scripting never reads a
//! half-written set even if the adaptation engine is writing concurrently.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::artifact::{read_optional, write_atomic};
use crate::error::{StoreError, StoreResult};
use shorts_models::TemplateSet;

/// Persistence for the process-wide template set.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    path: PathBuf,
}

impl TemplateStore {
    /// Template store rooted at the given data directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            path: root.as_ref().join("templates.json"),
        }
    }

    /// Load the active template set.
    ///
    /// When no document exists yet the default set is persisted and
    /// returned, matching first-run behavior. A document that fails
    /// structural validation is rejected rather than silently used.
    pub async fn load(&self) -> StoreResult<TemplateSet> {
        match read_optional::<TemplateSet>(&self.path).await? {
            Some(set) => {
                if let Err(e) = set.validate() {
                    return Err(StoreError::invalid_document(
                        self.path.display().to_string(),
                        e.to_string(),
                    ));
                }
                Ok(set)
            }
            None => {
                let set = TemplateSet::default();
                warn!("No template document found, seeding defaults");
                write_atomic(&self.path, &set).await?;
                Ok(set)
            }
        }
    }

    /// Replace the active template set with a new, already-validated one.
    pub async fn replace(&self, set: &TemplateSet) -> StoreResult<()> {
        write_atomic(&self.path, set).await?;
        info!("Replaced active template set");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_load_seeds_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::new(dir.path());

        let set = store.load().await.unwrap();
        assert_eq!(set, TemplateSet::default());
        assert!(dir.path().join("templates.json").exists());
    }

    #[tokio::test]
    async fn test_replace_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::new(dir.path());

        let mut set = store.load().await.unwrap();
        set.transition.push("새로운 전환 문구입니다.".to_string());
        store.replace(&set).await.unwrap();

        let reloaded = store.load().await.unwrap();
        assert_eq!(reloaded, set);
    }

    #[tokio::test]
    async fn test_invalid_document_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::new(dir.path());

        let mut set = TemplateSet::default();
        set.ending.clear();
        // Bypass replace() to simulate a corrupt document on disk.
        tokio::fs::write(
            dir.path().join("templates.json"),
            serde_json::to_vec(&set).unwrap(),
        )
        .await
        .unwrap();

        assert!(matches!(
            store.load().await,
            Err(StoreError::InvalidDocument { .. })
        ));
    }
}
