//! Source video and audio downloads via yt-dlp.
//!
//! Download failures are frequently caused by a stale yt-dlp build
//! falling behind platform changes. On the first failure the
//! downloader upgrades yt-dlp in place, once per process, and retries
//! the download a single time.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::command::check_ytdlp;
use crate::error::{MediaError, MediaResult};

pub struct VideoDownloader {
    /// Set once the in-place upgrade has been attempted.
    upgrade_attempted: AtomicBool,
}

impl VideoDownloader {
    pub fn new() -> Self {
        Self {
            upgrade_attempted: AtomicBool::new(false),
        }
    }

    /// Downloads an mp4 for a video into `output_dir`, capped at 720p.
    /// The output is reframed to 1080x1920 later, so higher source
    /// resolutions only cost bandwidth.
    pub async fn download_video(&self, video_id: &str, output_dir: &Path) -> MediaResult<PathBuf> {
        tokio::fs::create_dir_all(output_dir).await?;
        let output = output_dir.join(format!("{video_id}.mp4"));
        let args = vec![
            "-f".to_string(),
            "bestvideo[height<=720][ext=mp4]+bestaudio[ext=m4a]/best[height<=720][ext=mp4]/best"
                .to_string(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
            "-o".to_string(),
            output.to_string_lossy().into_owned(),
            watch_url(video_id),
        ];
        self.run_with_retry(video_id, &args).await?;
        Ok(output)
    }

    /// Downloads the audio track as mp3 into `output_dir`.
    pub async fn download_audio(&self, video_id: &str, output_dir: &Path) -> MediaResult<PathBuf> {
        tokio::fs::create_dir_all(output_dir).await?;
        let output = output_dir.join(format!("{video_id}.mp3"));
        let args = vec![
            "-x".to_string(),
            "--audio-format".to_string(),
            "mp3".to_string(),
            "-o".to_string(),
            output.to_string_lossy().into_owned(),
            watch_url(video_id),
        ];
        self.run_with_retry(video_id, &args).await?;
        Ok(output)
    }

    async fn run_with_retry(&self, video_id: &str, args: &[String]) -> MediaResult<()> {
        check_ytdlp()?;

        match self.run_once(video_id, args).await {
            Ok(()) => Ok(()),
            Err(first_err) => {
                if self.upgrade_attempted.swap(true, Ordering::SeqCst) {
                    return Err(first_err);
                }
                warn!(video_id, error = %first_err, "download failed, upgrading yt-dlp and retrying");
                self.upgrade_ytdlp().await;
                self.run_once(video_id, args).await
            }
        }
    }

    async fn run_once(&self, video_id: &str, args: &[String]) -> MediaResult<()> {
        debug!(video_id, "running yt-dlp {}", args.join(" "));
        let output = Command::new("yt-dlp")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(MediaError::download_failed(video_id, stderr))
        }
    }

    async fn upgrade_ytdlp(&self) {
        let result = Command::new("yt-dlp")
            .args(["-U"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        match result {
            Ok(status) if status.success() => info!("yt-dlp upgraded"),
            Ok(status) => warn!(?status, "yt-dlp upgrade did not succeed"),
            Err(e) => warn!(error = %e, "yt-dlp upgrade could not run"),
        }
    }
}

impl Default for VideoDownloader {
    fn default() -> Self {
        Self::new()
    }
}

fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_url() {
        assert_eq!(watch_url("abc123"), "https://www.youtube.com/watch?v=abc123");
    }

    #[test]
    fn test_upgrade_flag_is_one_shot() {
        let downloader = VideoDownloader::new();
        assert!(!downloader.upgrade_attempted.swap(true, Ordering::SeqCst));
        assert!(downloader.upgrade_attempted.swap(true, Ordering::SeqCst));
    }
}
