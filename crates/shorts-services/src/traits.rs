//! Trait seams between pipeline stages and their external collaborators.
//!
//! Stages are written against these traits so tests can substitute
//! in-memory fakes and assert which collaborators were actually called.

use std::path::Path;

use async_trait::async_trait;

use crate::captions::CaptionLine;
use crate::error::ServiceResult;

/// Caption track retrieval. Returns `None` when the platform has no
/// usable track for the video.
#[async_trait]
pub trait CaptionSource: Send + Sync {
    async fn fetch_captions(&self, video_id: &str) -> ServiceResult<Option<Vec<CaptionLine>>>;
}

/// Audio transcription fallback for videos without caption tracks.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> ServiceResult<String>;
}

/// LLM text generation. `generate` returns the raw assistant text;
/// callers that requested JSON parse it with [`crate::openai::extract_json`].
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
    ) -> ServiceResult<String>;
}

/// Narration synthesis. Writes the rendered audio to `output_path`.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, output_path: &Path) -> ServiceResult<()>;
}
