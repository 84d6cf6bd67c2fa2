//! Source video metadata and discovery scoring.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Weight applied to likes in the engagement score.
const LIKE_WEIGHT: u64 = 5;

/// Weight applied to comments in the engagement score.
const COMMENT_WEIGHT: u64 = 10;

/// A source video as fetched from the platform data API.
///
/// Immutable once fetched; identity is the platform video id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceVideo {
    /// Platform video id
    pub id: String,

    /// Video title
    pub title: String,

    /// Video description; may be empty
    #[serde(default)]
    pub description: String,

    /// Channel display name
    pub channel: String,

    /// Publish timestamp
    pub published_at: DateTime<Utc>,

    /// View count at fetch time
    pub view_count: u64,

    /// Like count at fetch time
    pub like_count: u64,

    /// Comment count at fetch time
    pub comment_count: u64,
}

impl SourceVideo {
    /// Weighted engagement score used to rank discovery candidates.
    ///
    /// `views + 5*likes + 10*comments`
    pub fn engagement_score(&self) -> u64 {
        self.view_count + LIKE_WEIGHT * self.like_count + COMMENT_WEIGHT * self.comment_count
    }
}

/// Rank candidates by engagement score descending, most recent first on ties.
pub fn rank_by_engagement(mut videos: Vec<SourceVideo>) -> Vec<SourceVideo> {
    videos.sort_by(|a, b| {
        b.engagement_score()
            .cmp(&a.engagement_score())
            .then_with(|| b.published_at.cmp(&a.published_at))
    });
    videos
}

/// Output of the rendering stage: one finished file per source video.
///
/// Publishing reads the file; afterwards it is disposable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedVideo {
    /// Source video id
    pub video_id: String,

    /// Path to the rendered vertical video
    pub file_path: PathBuf,
}
