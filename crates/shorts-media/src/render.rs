//! Vertical short composition.
//!
//! Rendering is a fixed ffmpeg chain: trim and reframe the source to
//! 1080x1920, burn the caption track in, then duck the source audio
//! under the narration hook. Intermediate files are kept when a step
//! fails so the failure can be inspected.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Vertical reframe: fit height, center-crop width.
const VERTICAL_FILTER: &str = "scale=-1:1920,crop=1080:1920";

/// Burned-in caption styling.
const SUBTITLE_STYLE: &str =
    "FontSize=14,PrimaryColour=&HFFFFFF,OutlineColour=&H000000,Outline=2,Alignment=2,MarginV=60";

/// Source audio level under the narration hook.
const BACKGROUND_VOLUME: f64 = 0.3;

#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub video_id: String,
    /// Downloaded source video
    pub source_path: PathBuf,
    /// Narration hook audio; skipped when synthesis was unavailable
    pub hook_audio_path: Option<PathBuf>,
    /// SRT caption file
    pub subtitle_path: PathBuf,
    /// Offset into the source where the clip starts
    pub start_offset_secs: f64,
    /// Hard cap on output duration in seconds
    pub max_duration_secs: f64,
}

pub struct VideoRenderer {
    runner: FfmpegRunner,
    work_dir: PathBuf,
}

impl VideoRenderer {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner: FfmpegRunner::new().with_timeout(600),
            work_dir: work_dir.into(),
        }
    }

    /// Runs the full composition chain and returns the finished file.
    pub async fn render(&self, request: &RenderRequest) -> MediaResult<PathBuf> {
        tokio::fs::create_dir_all(&self.work_dir).await?;

        let vertical = self.work_dir.join(format!("{}_vertical.mp4", request.video_id));
        let subtitled = self.work_dir.join(format!("{}_subtitled.mp4", request.video_id));
        let output = self.work_dir.join(format!("{}_short.mp4", request.video_id));

        self.trim_and_reframe(
            &request.source_path,
            &vertical,
            request.start_offset_secs,
            request.max_duration_secs,
        )
        .await?;
        self.burn_subtitles(&vertical, &request.subtitle_path, &subtitled)
            .await?;

        match &request.hook_audio_path {
            Some(hook) => self.mix_hook_audio(&subtitled, hook, &output).await?,
            None => {
                tokio::fs::rename(&subtitled, &output).await?;
            }
        }

        // Intermediates only go away once the chain has succeeded.
        let _ = tokio::fs::remove_file(&vertical).await;
        let _ = tokio::fs::remove_file(&subtitled).await;

        info!(video_id = %request.video_id, path = %output.display(), "short rendered");
        Ok(output)
    }

    async fn trim_and_reframe(
        &self,
        input: &Path,
        output: &Path,
        offset_secs: f64,
        max_secs: f64,
    ) -> MediaResult<()> {
        debug!(input = %input.display(), offset = offset_secs, "trim and reframe");
        let cmd = FfmpegCommand::new(input, output)
            .seek(offset_secs)
            .duration(max_secs)
            .video_filter(VERTICAL_FILTER)
            .video_codec("libx264")
            .preset("fast")
            .audio_codec("aac");
        self.runner.run(&cmd).await
    }

    async fn burn_subtitles(&self, input: &Path, subtitles: &Path, output: &Path) -> MediaResult<()> {
        debug!(subtitles = %subtitles.display(), "burning subtitles");
        let filter = format!(
            "subtitles={}:force_style='{}'",
            subtitles.to_string_lossy(),
            SUBTITLE_STYLE
        );
        let cmd = FfmpegCommand::new(input, output)
            .video_filter(filter)
            .video_codec("libx264")
            .preset("fast")
            .audio_codec("copy");
        self.runner.run(&cmd).await
    }

    async fn mix_hook_audio(&self, input: &Path, hook_audio: &Path, output: &Path) -> MediaResult<()> {
        debug!(hook = %hook_audio.display(), "mixing hook narration");
        let filter = format!(
            "[0:a]volume={BACKGROUND_VOLUME}[bg];[1:a]adelay=0|0[hook];[bg][hook]amix=inputs=2:duration=first[aout]"
        );
        let cmd = FfmpegCommand::new(input, output)
            .extra_input(hook_audio)
            .filter_complex(filter)
            .output_args(["-map", "0:v", "-map", "[aout]"])
            .video_codec("copy")
            .audio_codec("aac");
        self.runner.run(&cmd).await
    }

    /// Extracts a thumbnail frame one second in.
    pub async fn extract_thumbnail(&self, video: &Path) -> MediaResult<PathBuf> {
        let output = video.with_extension("jpg");
        let cmd = FfmpegCommand::new(video, &output)
            .seek(1.0)
            .single_frame()
            .output_args(["-q:v", "2"]);
        self.runner.run(&cmd).await?;
        Ok(output)
    }
}
