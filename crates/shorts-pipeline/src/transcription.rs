//! Transcription stage: captions or speech-to-text, then translation
//! and summarization.

use tracing::{debug, info, warn};

use shorts_media::VideoDownloader;
use shorts_models::{SourceVideo, Stage, Summary, TranscriptRecord};
use shorts_services::{CaptionSource, SpeechToText, TextGenerator};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};

const TRANSLATE_SYSTEM: &str =
    "You are a professional news translator. Translate the user's text into natural Korean. \
     Return only the translated text.";

const SUMMARIZE_SYSTEM: &str = "You are a news editor for short-form video. Given a Korean news \
     transcript, return JSON with exactly these fields: \"hook\" (one short emotionally engaging \
     line, speakable in under 3 seconds), \"summary\" (at most 3 sentences), \"background\" (one \
     sentence of context). Return only JSON.";

pub struct TranscriptionStage<C, S, G> {
    captions: C,
    speech_to_text: S,
    generator: G,
    downloader: VideoDownloader,
    config: PipelineConfig,
}

impl<C, S, G> TranscriptionStage<C, S, G>
where
    C: CaptionSource,
    S: SpeechToText,
    G: TextGenerator,
{
    pub fn new(captions: C, speech_to_text: S, generator: G, config: PipelineConfig) -> Self {
        Self {
            captions,
            speech_to_text,
            generator,
            downloader: VideoDownloader::new(),
            config,
        }
    }

    /// Produces the combined transcript record for a video.
    ///
    /// The record is only assembled once extraction, translation and
    /// summarization have all succeeded; a failure in any sub-step
    /// aborts the stage with nothing persisted.
    pub async fn run(&self, video: &SourceVideo) -> PipelineResult<TranscriptRecord> {
        let original = self.extract_transcript(&video.id).await?;
        if original.trim().is_empty() {
            return Err(PipelineError::no_usable_data(
                Stage::Transcription,
                format!("empty transcript for {}", video.id),
            ));
        }

        let translated = self.translate(&original).await?;
        let summary = self.summarize(&translated).await?;

        info!(video_id = %video.id, chars = translated.chars().count(), "transcription complete");
        Ok(TranscriptRecord {
            video_id: video.id.clone(),
            original_transcript: original,
            translated_text: translated,
            summary,
        })
    }

    async fn extract_transcript(&self, video_id: &str) -> PipelineResult<String> {
        match self.captions.fetch_captions(video_id).await {
            Ok(Some(lines)) => {
                debug!(video_id, lines = lines.len(), "using caption track");
                let joined = lines
                    .iter()
                    .map(|l| l.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                return Ok(joined);
            }
            Ok(None) => debug!(video_id, "no caption track, falling back to speech-to-text"),
            Err(e) => warn!(video_id, error = %e, "caption fetch failed, falling back to speech-to-text"),
        }

        let audio = self
            .downloader
            .download_audio(video_id, &self.config.work_dir)
            .await?;
        self.speech_to_text
            .transcribe(&audio)
            .await
            .map_err(|e| PipelineError::from_service(Stage::Transcription, e))
    }

    async fn translate(&self, text: &str) -> PipelineResult<String> {
        let chunks = chunk_on_sentences(text, self.config.translation_chunk_chars);
        let mut translated = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let out = self
                .generator
                .generate(TRANSLATE_SYSTEM, chunk, 0.3)
                .await
                .map_err(|e| PipelineError::from_service(Stage::Transcription, e))?;
            translated.push(out.trim().to_string());
        }
        Ok(translated.join(" "))
    }

    async fn summarize(&self, translated: &str) -> PipelineResult<Summary> {
        let raw = self
            .generator
            .generate(SUMMARIZE_SYSTEM, translated, 0.7)
            .await
            .map_err(|e| PipelineError::from_service(Stage::Transcription, e))?;
        let value = shorts_services::openai::extract_json(&raw)
            .map_err(|e| PipelineError::from_service(Stage::Transcription, e))?;

        let field = |name: &str| -> PipelineResult<String> {
            value
                .get(name)
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| {
                    PipelineError::malformed(
                        Stage::Transcription,
                        format!("summary missing field '{name}'"),
                    )
                })
        };

        Ok(Summary {
            hook: field("hook")?,
            summary: field("summary")?,
            background: field("background")?,
        })
    }
}

/// Splits text into chunks below `max_chars`, breaking on sentence
/// boundaries. A single oversized sentence becomes its own chunk.
pub fn chunk_on_sentences(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in text.split_inclusive(". ") {
        if !current.is_empty() && current.chars().count() + sentence.chars().count() > max_chars {
            chunks.push(current.trim().to_string());
            current = String::new();
        }
        current.push_str(sentence);
    }
    if !current.trim().is_empty() {
        chunks.push(current.trim().to_string());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use shorts_services::{CaptionLine, ServiceResult};

    struct FixedCaptions(Option<Vec<CaptionLine>>);

    #[async_trait]
    impl CaptionSource for FixedCaptions {
        async fn fetch_captions(&self, _video_id: &str) -> ServiceResult<Option<Vec<CaptionLine>>> {
            Ok(self.0.clone())
        }
    }

    struct CountingStt(Arc<AtomicUsize>);

    #[async_trait]
    impl SpeechToText for CountingStt {
        async fn transcribe(&self, _audio_path: &Path) -> ServiceResult<String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok("spoken text".to_string())
        }
    }

    struct ScriptedGenerator;

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(
            &self,
            system_prompt: &str,
            user_prompt: &str,
            _temperature: f32,
        ) -> ServiceResult<String> {
            if system_prompt.contains("translator") {
                Ok(format!("번역: {user_prompt}"))
            } else {
                Ok(r#"{"hook": "충격적인 소식", "summary": "요약입니다.", "background": "배경입니다."}"#
                    .to_string())
            }
        }
    }

    fn video(id: &str) -> SourceVideo {
        SourceVideo {
            id: id.to_string(),
            title: "t".to_string(),
            description: String::new(),
            channel: "c".to_string(),
            published_at: chrono::Utc::now(),
            view_count: 0,
            like_count: 0,
            comment_count: 0,
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig::from_env()
    }

    #[tokio::test]
    async fn test_caption_track_skips_speech_to_text() {
        let stt_calls = Arc::new(AtomicUsize::new(0));
        let stage = TranscriptionStage::new(
            FixedCaptions(Some(vec![
                CaptionLine {
                    text: "Breaking news".to_string(),
                    start: 0.0,
                    duration: 1.0,
                },
                CaptionLine {
                    text: "tonight".to_string(),
                    start: 1.0,
                    duration: 1.0,
                },
            ])),
            CountingStt(stt_calls.clone()),
            ScriptedGenerator,
            config(),
        );

        let record = stage.run(&video("vid1")).await.unwrap();

        assert_eq!(stt_calls.load(Ordering::SeqCst), 0);
        assert_eq!(record.video_id, "vid1");
        assert_eq!(record.original_transcript, "Breaking news tonight");
        assert!(!record.translated_text.is_empty());
        assert_eq!(record.summary.hook, "충격적인 소식");
        assert_eq!(record.summary.summary, "요약입니다.");
        assert_eq!(record.summary.background, "배경입니다.");
    }

    #[tokio::test]
    async fn test_malformed_summary_is_fatal() {
        struct BadSummary;

        #[async_trait]
        impl TextGenerator for BadSummary {
            async fn generate(
                &self,
                system_prompt: &str,
                user_prompt: &str,
                _temperature: f32,
            ) -> ServiceResult<String> {
                if system_prompt.contains("translator") {
                    Ok(user_prompt.to_string())
                } else {
                    Ok(r#"{"hook": "only a hook"}"#.to_string())
                }
            }
        }

        let stage = TranscriptionStage::new(
            FixedCaptions(Some(vec![CaptionLine {
                text: "text".to_string(),
                start: 0.0,
                duration: 1.0,
            }])),
            CountingStt(Arc::new(AtomicUsize::new(0))),
            BadSummary,
            config(),
        );

        let err = stage.run(&video("vid1")).await.unwrap_err();
        assert!(matches!(err, PipelineError::MalformedGeneration { .. }));
    }

    #[test]
    fn test_chunking_respects_ceiling() {
        let text = "First sentence here. Second sentence here. Third sentence here.";
        let chunks = chunk_on_sentences(text, 45);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 45, "chunk too long: {chunk}");
        }
        let rejoined = chunks.join(" ");
        assert!(rejoined.contains("Second sentence"));
    }

    #[test]
    fn test_oversized_sentence_is_own_chunk() {
        let long = "x".repeat(100);
        let chunks = chunk_on_sentences(&long, 10);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_chunking_empty_text() {
        assert!(chunk_on_sentences("   ", 100).is_empty());
    }
}
