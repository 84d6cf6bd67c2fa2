//! Per-stage artifact documents.
//!
//! Layout under the data root:
//!
//! ```text
//! <root>/artifacts/<stage>/<video_id>.json
//! <root>/runs/<video_id>.json
//! ```
//!
//! Writes go through a temp file followed by a rename so a document is
//! either fully present or absent; a failed stage never leaves a partial
//! artifact behind.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::StoreResult;
use shorts_models::{RunState, Stage};

/// Content-addressed-by-id persistence of intermediate stage results.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open a store rooted at the given data directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Path of the artifact document for (video, stage).
    pub fn artifact_path(&self, video_id: &str, stage: Stage) -> PathBuf {
        self.root
            .join("artifacts")
            .join(stage.as_str())
            .join(format!("{video_id}.json"))
    }

    fn run_state_path(&self, video_id: &str) -> PathBuf {
        self.root.join("runs").join(format!("{video_id}.json"))
    }

    /// Check whether an artifact exists for (video, stage).
    pub fn exists(&self, video_id: &str, stage: Stage) -> bool {
        self.artifact_path(video_id, stage).exists()
    }

    /// Persist a stage artifact, replacing any previous document whole.
    pub async fn store<T: Serialize>(
        &self,
        video_id: &str,
        stage: Stage,
        artifact: &T,
    ) -> StoreResult<()> {
        let path = self.artifact_path(video_id, stage);
        write_atomic(&path, artifact).await?;
        debug!(video_id = %video_id, stage = %stage, "Stored artifact");
        Ok(())
    }

    /// Load a stage artifact if present.
    pub async fn load<T: DeserializeOwned>(
        &self,
        video_id: &str,
        stage: Stage,
    ) -> StoreResult<Option<T>> {
        read_optional(&self.artifact_path(video_id, stage)).await
    }

    /// Persist the run-state marker for a video.
    pub async fn store_run_state(&self, state: &RunState) -> StoreResult<()> {
        write_atomic(&self.run_state_path(&state.video_id), state).await
    }

    /// Load the run-state marker for a video, if any run has progressed.
    pub async fn load_run_state(&self, video_id: &str) -> StoreResult<Option<RunState>> {
        read_optional(&self.run_state_path(video_id)).await
    }
}

/// Write a JSON document atomically: temp file in the target directory,
/// then rename over the destination.
pub(crate) async fn write_atomic<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Read a JSON document, treating a missing file as `None`.
pub(crate) async fn read_optional<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shorts_models::{SourceVideo, Summary, TranscriptRecord};

    fn transcript(video_id: &str) -> TranscriptRecord {
        TranscriptRecord {
            video_id: video_id.to_string(),
            original_transcript: "original".to_string(),
            translated_text: "translated".to_string(),
            summary: Summary {
                hook: "hook".to_string(),
                summary: "summary".to_string(),
                background: "background".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_store_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        let record = transcript("vid1");
        store
            .store("vid1", Stage::Transcription, &record)
            .await
            .unwrap();

        assert!(store.exists("vid1", Stage::Transcription));

        let loaded: Option<TranscriptRecord> =
            store.load("vid1", Stage::Transcription).await.unwrap();
        assert_eq!(loaded, Some(record));
    }

    #[tokio::test]
    async fn test_missing_artifact_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        let loaded: Option<SourceVideo> = store.load("nope", Stage::Discovery).await.unwrap();
        assert!(loaded.is_none());
        assert!(!store.exists("nope", Stage::Discovery));
    }

    #[tokio::test]
    async fn test_stages_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        store
            .store("vid1", Stage::Transcription, &transcript("vid1"))
            .await
            .unwrap();

        assert!(!store.exists("vid1", Stage::Scripting));
        assert_ne!(
            store.artifact_path("vid1", Stage::Transcription),
            store.artifact_path("vid1", Stage::Scripting)
        );
    }

    #[tokio::test]
    async fn test_run_state_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        assert!(store.load_run_state("vid1").await.unwrap().is_none());

        let state = RunState::new("vid1").complete(Stage::Discovery);
        store.store_run_state(&state).await.unwrap();

        let loaded = store.load_run_state("vid1").await.unwrap().unwrap();
        assert_eq!(loaded.last_completed, Some(Stage::Discovery));
    }
}
