//! Analytics stage: performance collection and feedback generation
//! for published shorts.

use chrono::{Duration, Utc};
use serde_json::json;
use tracing::{info, warn};

use shorts_metrics::{MetricsError, MetricsStore};
use shorts_models::{FeedbackRecord, PerformanceSample, Stage, VideoMetadataRecord};
use shorts_services::{summarize_report, TextGenerator, YoutubeAnalyticsClient};

use crate::error::{PipelineError, PipelineResult};

/// Collection windows in days since upload, labelled for storage.
const PERIODS: &[(&str, i64)] = &[("24h", 1), ("72h", 3), ("168h", 7)];

/// Comment texts included in the feedback prompt.
const MAX_PROMPT_COMMENTS: usize = 10;

const FEEDBACK_SYSTEM: &str = "You review the performance of published Korean news shorts. Given \
     generation parameters, performance metrics and viewer comments, return JSON with \
     \"hook_feedback\", \"summary_feedback\", \"subtitle_feedback\", \"length_feedback\" (each a \
     short assessment) and \"overall_score\" (integer 1-10). Return only JSON.";

pub struct AnalyticsStage<G> {
    analytics: YoutubeAnalyticsClient,
    metrics: MetricsStore,
    generator: G,
}

impl<G: TextGenerator> AnalyticsStage<G> {
    pub fn new(analytics: YoutubeAnalyticsClient, metrics: MetricsStore, generator: G) -> Self {
        Self {
            analytics,
            metrics,
            generator,
        }
    }

    /// Collects one performance sample per period and generates one
    /// feedback record. Repeating the invocation appends further rows
    /// rather than conflicting.
    pub async fn run(&self, published_id: &str) -> PipelineResult<FeedbackRecord> {
        let metadata = self
            .metrics
            .get_video_metadata(published_id)
            .await?
            .ok_or_else(|| MetricsError::UnknownVideo(published_id.to_string()))?;

        let comments = self.collect(published_id, &metadata).await?;
        self.generate_feedback(&metadata, &comments).await
    }

    /// Collects performance samples for every period that has fully
    /// elapsed. Comments are fetched once, on the first period only.
    pub async fn collect(
        &self,
        published_id: &str,
        metadata: &VideoMetadataRecord,
    ) -> PipelineResult<Vec<String>> {
        let upload_date = metadata.upload_time.date_naive();
        let now = Utc::now();
        let mut comments = Vec::new();

        for (i, (label, days)) in PERIODS.iter().enumerate() {
            if now < metadata.upload_time + Duration::days(*days) {
                info!(published_id, period = label, "period not yet elapsed, skipping");
                continue;
            }

            let end = upload_date + Duration::days(*days);
            let report = self
                .analytics
                .video_report(published_id, upload_date, end)
                .await
                .map_err(|e| PipelineError::from_service(Stage::Analytics, e))?;
            let summary = summarize_report(&report);

            let sample = PerformanceSample {
                video_id: published_id.to_string(),
                period_label: label.to_string(),
                views: summary.views,
                likes: summary.likes,
                comments: summary.comments,
                avg_view_duration: summary.avg_view_duration_secs,
                avg_view_percentage: summary.avg_view_percentage,
                collected_at: Utc::now(),
            };
            self.metrics.insert_performance_sample(&sample).await?;
            info!(published_id, period = label, views = summary.views, "performance sample stored");

            if i == 0 {
                match self.analytics.video_comments(published_id).await {
                    Ok(fetched) => comments = fetched,
                    Err(e) => warn!(published_id, error = %e, "comment fetch failed"),
                }
            }
        }

        Ok(comments)
    }

    /// Scores the video's generation choices against its measured
    /// performance and persists the structured result.
    pub async fn generate_feedback(
        &self,
        metadata: &VideoMetadataRecord,
        comments: &[String],
    ) -> PipelineResult<FeedbackRecord> {
        let samples = self.metrics.performance_for(&metadata.video_id).await?;

        let prompt = json!({
            "generation_parameters": {
                "title": metadata.title,
                "hook_style": metadata.hook_style,
                "summary_length": metadata.summary_length,
                "background_included": metadata.background_included,
                "video_length": metadata.video_length,
            },
            "performance": samples.iter().map(|s| json!({
                "period": s.period_label,
                "views": s.views,
                "likes": s.likes,
                "comments": s.comments,
                "avg_view_duration": s.avg_view_duration,
                "avg_view_percentage": s.avg_view_percentage,
            })).collect::<Vec<_>>(),
            "viewer_comments": &comments[..comments.len().min(MAX_PROMPT_COMMENTS)],
        })
        .to_string();

        let raw = self
            .generator
            .generate(FEEDBACK_SYSTEM, &prompt, 0.7)
            .await
            .map_err(|e| PipelineError::from_service(Stage::Analytics, e))?;
        let value = shorts_services::openai::extract_json(&raw)
            .map_err(|e| PipelineError::from_service(Stage::Analytics, e))?;

        let field = |name: &str| -> PipelineResult<String> {
            value
                .get(name)
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    PipelineError::malformed(
                        Stage::Analytics,
                        format!("feedback missing field '{name}'"),
                    )
                })
        };
        let score = value
            .get("overall_score")
            .and_then(|v| v.as_u64())
            .filter(|s| (1..=10).contains(s))
            .ok_or_else(|| {
                PipelineError::malformed(Stage::Analytics, "overall_score must be 1-10")
            })?;

        let record = FeedbackRecord {
            video_id: metadata.video_id.clone(),
            hook_feedback: field("hook_feedback")?,
            summary_feedback: field("summary_feedback")?,
            subtitle_feedback: field("subtitle_feedback")?,
            length_feedback: field("length_feedback")?,
            overall_score: score as u8,
            generated_at: Utc::now(),
        };
        self.metrics.insert_feedback(&record).await?;
        info!(published_id = %metadata.video_id, score, "feedback stored");
        Ok(record)
    }
}
