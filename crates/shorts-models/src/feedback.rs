//! Published-video metadata, performance samples and feedback records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Generation parameters of one published short.
///
/// Created exactly once at publish time, keyed by the platform-assigned
/// video id (distinct from the source video id). Performance rows
/// reference it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadataRecord {
    /// Platform-assigned id of the published video
    pub video_id: String,

    /// Upload title
    pub title: String,

    /// Upload timestamp
    pub upload_time: DateTime<Utc>,

    /// Hook style used ("question", "warning", ..., or "normal")
    pub hook_style: String,

    /// Summary length in words
    pub summary_length: u32,

    /// Whether a background note was included
    pub background_included: bool,

    /// Subtitle size setting
    pub subtitle_size: String,

    /// Subtitle speed setting
    pub subtitle_speed: String,

    /// Target video length in seconds
    pub video_length: u32,
}

/// One performance measurement for a published video over one period.
///
/// Append-only: collecting the same (video, period) again produces an
/// additional row, not an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSample {
    /// Platform-assigned id of the published video
    pub video_id: String,

    /// Period label, e.g. "24h", "72h", "168h"
    pub period_label: String,

    pub views: u64,
    pub likes: u64,
    pub comments: u64,

    /// Mean view duration in seconds
    pub avg_view_duration: f64,

    /// Mean viewed percentage
    pub avg_view_percentage: f64,

    /// Collection timestamp
    pub collected_at: DateTime<Utc>,
}

/// A scored qualitative assessment of one published video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Platform-assigned id of the published video
    pub video_id: String,

    pub hook_feedback: String,
    pub summary_feedback: String,
    pub subtitle_feedback: String,
    pub length_feedback: String,

    /// Overall score, 1-10
    pub overall_score: u8,

    /// Generation timestamp
    pub generated_at: DateTime<Utc>,
}

/// Audit row for one template adaptation decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateChangeRecord {
    /// Which part of the set changed ("hook", "transition", "ending")
    pub change_type: String,

    /// Previous value, JSON-encoded
    pub old_value: String,

    /// New value, JSON-encoded
    pub new_value: String,

    /// Stated reason for the change
    pub reason: String,

    /// Change timestamp
    pub changed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_performance_sample_round_trip() {
        let sample = PerformanceSample {
            video_id: "up1".to_string(),
            period_label: "24h".to_string(),
            views: 1200,
            likes: 80,
            comments: 15,
            avg_view_duration: 21.4,
            avg_view_percentage: 71.2,
            collected_at: Utc::now(),
        };

        let json = serde_json::to_string(&sample).unwrap();
        let parsed: PerformanceSample = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample);
    }
}
