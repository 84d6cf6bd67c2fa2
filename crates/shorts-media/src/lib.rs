//! Media toolchain for the rendering stage.
//!
//! Wraps the external yt-dlp and ffmpeg binaries and derives caption
//! timing from narration scripts.

pub mod captions;
pub mod command;
pub mod download;
pub mod error;
pub mod render;

pub use captions::{build_caption_cues, format_srt};
pub use command::{check_ffmpeg, check_ytdlp, FfmpegCommand, FfmpegRunner};
pub use download::VideoDownloader;
pub use error::{MediaError, MediaResult};
pub use render::{RenderRequest, VideoRenderer};
