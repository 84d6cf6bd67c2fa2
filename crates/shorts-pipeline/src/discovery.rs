//! Discovery stage: scan source channels for trending candidates.

use chrono::Duration;
use tracing::{info, warn};

use shorts_models::{rank_by_engagement, SourceVideo, Stage};
use shorts_services::YoutubeDataClient;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};

pub struct DiscoveryStage {
    youtube: YoutubeDataClient,
    config: PipelineConfig,
}

impl DiscoveryStage {
    pub fn new(youtube: YoutubeDataClient, config: PipelineConfig) -> Self {
        Self { youtube, config }
    }

    /// Returns discovery candidates ranked by engagement score.
    ///
    /// A channel that cannot be resolved or listed is skipped with a
    /// warning; an empty final list fails the run.
    pub async fn run(&self) -> PipelineResult<Vec<SourceVideo>> {
        let mut candidates = Vec::new();

        for channel in &self.config.channels {
            match self.channel_candidates(channel).await {
                Ok(mut videos) => candidates.append(&mut videos),
                Err(e) => warn!(channel, error = %e, "skipping channel"),
            }
        }

        let filtered: Vec<SourceVideo> = candidates
            .into_iter()
            .filter(|v| self.passes_filters(v))
            .collect();

        if filtered.is_empty() {
            return Err(PipelineError::no_usable_data(
                Stage::Discovery,
                "no candidate met the view floor and keyword filter",
            ));
        }

        let ranked = rank_by_engagement(filtered);
        info!(
            count = ranked.len(),
            top = %ranked[0].id,
            top_score = ranked[0].engagement_score(),
            "discovery complete"
        );
        Ok(ranked)
    }

    async fn channel_candidates(&self, channel: &str) -> Result<Vec<SourceVideo>, shorts_services::ServiceError> {
        let Some(channel_id) = self.youtube.find_channel_id(channel).await? else {
            warn!(channel, "channel not found");
            return Ok(Vec::new());
        };

        let ids = self
            .youtube
            .recent_upload_ids(
                &channel_id,
                Duration::days(self.config.lookback_days),
                self.config.max_results,
            )
            .await?;
        self.youtube.video_details(&ids).await
    }

    fn passes_filters(&self, video: &SourceVideo) -> bool {
        video.view_count >= self.config.min_view_count
            && matches_keywords(video, &self.config.keywords)
    }
}

/// Case-insensitive keyword match against title or description.
pub fn matches_keywords(video: &SourceVideo, keywords: &[String]) -> bool {
    let title = video.title.to_lowercase();
    let description = video.description.to_lowercase();
    keywords.iter().any(|k| {
        let k = k.to_lowercase();
        title.contains(&k) || description.contains(&k)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn video(title: &str, description: &str) -> SourceVideo {
        SourceVideo {
            id: "vid1".to_string(),
            title: title.to_string(),
            description: description.to_string(),
            channel: "CNN".to_string(),
            published_at: Utc::now(),
            view_count: 10_000,
            like_count: 0,
            comment_count: 0,
        }
    }

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        let keywords = vec!["Breaking".to_string(), "economy".to_string()];
        assert!(matches_keywords(&video("BREAKING: markets tumble", ""), &keywords));
        assert!(matches_keywords(&video("The global Economy today", ""), &keywords));
        assert!(!matches_keywords(&video("Cooking with pasta", ""), &keywords));
    }

    #[test]
    fn test_keyword_in_description_alone_matches() {
        let keywords = vec!["election".to_string()];
        let candidate = video("Tonight's top stories", "Election results are in");
        assert!(matches_keywords(&candidate, &keywords));
    }

    #[test]
    fn test_empty_keywords_match_nothing() {
        assert!(!matches_keywords(&video("any title", "any description"), &[]));
    }
}
