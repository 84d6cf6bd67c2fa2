//! Publishing stage: upload the rendered short and record its
//! generation parameters for later feedback correlation.

use chrono::Utc;
use tracing::{info, warn};

use shorts_metrics::MetricsStore;
use shorts_models::{RenderedVideo, Script, Stage, TemplateSet, VideoMetadataRecord};
use shorts_services::{UploadMetadata, YoutubeUploadClient};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};

pub struct PublishingStage {
    upload: YoutubeUploadClient,
    metrics: MetricsStore,
    config: PipelineConfig,
}

impl PublishingStage {
    pub fn new(upload: YoutubeUploadClient, metrics: MetricsStore, config: PipelineConfig) -> Self {
        Self {
            upload,
            metrics,
            config,
        }
    }

    /// Uploads the file and persists the metadata record keyed by the
    /// platform-assigned id. Returns that id.
    pub async fn run(
        &self,
        script: &Script,
        rendered: &RenderedVideo,
        templates: &TemplateSet,
    ) -> PipelineResult<String> {
        let metadata = UploadMetadata {
            title: script.upload_title().to_string(),
            description: build_description(script),
            tags: script.youtube_tags.clone(),
        };

        let published_id = self
            .upload
            .upload_video(&rendered.file_path, &metadata)
            .await
            .map_err(|e| PipelineError::from_service(Stage::Publishing, e))?;

        let thumbnail = rendered.file_path.with_extension("jpg");
        if thumbnail.exists() {
            if let Err(e) = self.upload.set_thumbnail(&published_id, &thumbnail).await {
                warn!(published_id, error = %e, "thumbnail upload failed");
            }
        }

        let record = VideoMetadataRecord {
            video_id: published_id.clone(),
            title: metadata.title.clone(),
            upload_time: Utc::now(),
            hook_style: templates
                .detect_style(&script.hook)
                .unwrap_or("normal")
                .to_string(),
            summary_length: script.summary.split_whitespace().count() as u32,
            background_included: !script.background.trim().is_empty(),
            subtitle_size: "medium".to_string(),
            subtitle_speed: "normal".to_string(),
            video_length: self.config.target_duration_secs as u32,
        };
        self.metrics.insert_video_metadata(&record).await?;

        info!(source_id = %script.video_id, published_id = %published_id, "published");
        Ok(published_id)
    }
}

/// Upload description: summary, background, then a source credit.
pub fn build_description(script: &Script) -> String {
    let mut parts = vec![script.summary.trim().to_string()];
    if !script.background.trim().is_empty() {
        parts.push(script.background.trim().to_string());
    }
    parts.push(format!("출처: {}", script.channel));
    parts.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_includes_credit() {
        let script = Script {
            video_id: "vid1".to_string(),
            title: "t".to_string(),
            channel: "Reuters".to_string(),
            hook: "h".to_string(),
            transition: "t".to_string(),
            summary: "요약입니다.".to_string(),
            background: "배경입니다.".to_string(),
            ending: "e".to_string(),
            created_at: Utc::now(),
            youtube_title: None,
            youtube_tags: Vec::new(),
        };

        let description = build_description(&script);
        assert!(description.starts_with("요약입니다."));
        assert!(description.contains("배경입니다."));
        assert!(description.ends_with("출처: Reuters"));
    }

    #[test]
    fn test_description_skips_empty_background() {
        let script = Script {
            video_id: "vid1".to_string(),
            title: "t".to_string(),
            channel: "BBC News".to_string(),
            hook: "h".to_string(),
            transition: "t".to_string(),
            summary: "요약.".to_string(),
            background: "  ".to_string(),
            ending: "e".to_string(),
            created_at: Utc::now(),
            youtube_title: None,
            youtube_tags: Vec::new(),
        };

        assert_eq!(build_description(&script), "요약.\n\n출처: BBC News");
    }
}
