//! Rendering stage: narration synthesis, source download and video
//! composition.

use tracing::info;

use shorts_media::{build_caption_cues, format_srt, RenderRequest, VideoDownloader, VideoRenderer};
use shorts_models::{RenderedVideo, Script};
use shorts_services::SpeechSynthesizer;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use shorts_models::Stage;

pub struct RenderingStage<S> {
    synthesizer: S,
    downloader: VideoDownloader,
    renderer: VideoRenderer,
    config: PipelineConfig,
}

impl<S: SpeechSynthesizer> RenderingStage<S> {
    pub fn new(synthesizer: S, config: PipelineConfig) -> Self {
        let renderer = VideoRenderer::new(&config.work_dir);
        Self {
            synthesizer,
            downloader: VideoDownloader::new(),
            renderer,
            config,
        }
    }

    /// Produces the finished vertical short for a script.
    pub async fn run(&self, script: &Script) -> PipelineResult<RenderedVideo> {
        let video_id = &script.video_id;
        tokio::fs::create_dir_all(&self.config.work_dir)
            .await
            .map_err(shorts_media::MediaError::from)?;

        let hook_audio = self.config.work_dir.join(format!("{video_id}_hook.mp3"));
        self.synthesizer
            .synthesize(&script.hook, &hook_audio)
            .await
            .map_err(|e| PipelineError::from_service(Stage::Rendering, e))?;

        let source = self
            .downloader
            .download_video(video_id, &self.config.work_dir)
            .await?;

        let cues = build_caption_cues(script, self.config.chars_per_second);
        let srt_path = self.config.work_dir.join(format!("{video_id}.srt"));
        tokio::fs::write(&srt_path, format_srt(&cues))
            .await
            .map_err(shorts_media::MediaError::from)?;

        let request = RenderRequest {
            video_id: video_id.clone(),
            source_path: source.clone(),
            hook_audio_path: Some(hook_audio.clone()),
            subtitle_path: srt_path.clone(),
            start_offset_secs: self.config.clip_offset_secs,
            max_duration_secs: self.config.max_clip_secs,
        };
        let output = self.renderer.render(&request).await?;

        // Inputs are only cleaned up after a successful composition.
        let _ = tokio::fs::remove_file(&source).await;
        let _ = tokio::fs::remove_file(&hook_audio).await;
        let _ = tokio::fs::remove_file(&srt_path).await;

        info!(video_id = %video_id, path = %output.display(), "rendering complete");
        Ok(RenderedVideo {
            video_id: video_id.clone(),
            file_path: output,
        })
    }

    /// Extracts a thumbnail for an already-rendered file.
    pub async fn thumbnail(&self, rendered: &RenderedVideo) -> PipelineResult<std::path::PathBuf> {
        Ok(self.renderer.extract_thumbnail(&rendered.file_path).await?)
    }
}
