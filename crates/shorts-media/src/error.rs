//! Media toolchain error types.

use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("ffmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("yt-dlp not found in PATH")]
    YtDlpNotFound,

    #[error("FFmpeg failed: {message}{}", exit_code.map(|c| format!(" (exit code {c})")).unwrap_or_default())]
    FfmpegFailed {
        message: String,
        exit_code: Option<i32>,
    },

    #[error("yt-dlp failed for {video_id}: {stderr}")]
    DownloadFailed { video_id: String, stderr: String },

    #[error("FFmpeg timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    pub fn ffmpeg_failed(message: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            exit_code,
        }
    }

    pub fn download_failed(video_id: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::DownloadFailed {
            video_id: video_id.into(),
            stderr: stderr.into(),
        }
    }
}
