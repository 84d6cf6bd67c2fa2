//! Narration scripts assembled by the scripting stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A narration script for one short.
///
/// Successive optimization passes (duration optimization, title/tag
/// generation) overwrite whole fields; only one pipeline run owns a given
/// video id at a time so there is no partial-merge concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// Source video id
    pub video_id: String,

    /// Original video title
    pub title: String,

    /// Original channel name
    pub channel: String,

    /// Opening hook line
    pub hook: String,

    /// Transition phrase between hook and summary
    pub transition: String,

    /// Core summary
    pub summary: String,

    /// Background note
    pub background: String,

    /// Closing phrase
    pub ending: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Generated upload title, if title generation has run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_title: Option<String>,

    /// Generated upload tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub youtube_tags: Vec<String>,
}

impl Script {
    /// The five narration text fields in spoken order.
    pub fn narration_fields(&self) -> [&str; 5] {
        [
            &self.hook,
            &self.transition,
            &self.summary,
            &self.background,
            &self.ending,
        ]
    }

    /// Total character count across all narration fields.
    pub fn narration_chars(&self) -> usize {
        self.narration_fields()
            .iter()
            .map(|f| f.chars().count())
            .sum()
    }

    /// Estimated spoken duration in seconds at the given speaking rate.
    pub fn estimated_duration_secs(&self, chars_per_second: f64) -> f64 {
        self.narration_chars() as f64 / chars_per_second
    }

    /// Upload title: generated title when present, original title otherwise.
    pub fn upload_title(&self) -> &str {
        self.youtube_title.as_deref().unwrap_or(&self.title)
    }
}
