//! Pipeline stages and persisted run state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One pipeline transform.
///
/// A video id progresses monotonically through stage artifacts; no stage
/// overwrites another stage's artifact type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Discovery,
    Transcription,
    Scripting,
    Rendering,
    Publishing,
    Analytics,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Discovery => "discovery",
            Stage::Transcription => "transcription",
            Stage::Scripting => "scripting",
            Stage::Rendering => "rendering",
            Stage::Publishing => "publishing",
            Stage::Analytics => "analytics",
        }
    }

    /// Stages of the linear chain, in dependency order.
    ///
    /// Analytics is excluded: it runs out of band, well after publishing.
    pub fn chain() -> [Stage; 5] {
        [
            Stage::Discovery,
            Stage::Transcription,
            Stage::Scripting,
            Stage::Rendering,
            Stage::Publishing,
        ]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted progress marker for one pipeline run.
///
/// Progress is recorded explicitly rather than inferred from which
/// artifact files happen to exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    /// Source video id
    pub video_id: String,

    /// Last stage whose artifact was persisted
    pub last_completed: Option<Stage>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl RunState {
    /// Fresh run state with no completed stages.
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            last_completed: None,
            updated_at: Utc::now(),
        }
    }

    /// Record completion of a stage.
    pub fn complete(mut self, stage: Stage) -> Self {
        self.last_completed = Some(stage);
        self.updated_at = Utc::now();
        self
    }
}
