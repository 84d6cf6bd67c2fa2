//! Transcript records produced by the transcription stage.

use serde::{Deserialize, Serialize};

/// Three-field editorial summary of a translated transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Short emotionally engaging hook line (under ~3 seconds spoken)
    pub hook: String,

    /// Core summary, at most three sentences
    pub summary: String,

    /// One-sentence background note
    pub background: String,
}

/// Combined transcript record for one source video.
///
/// Written exactly once per video id, only after transcript extraction,
/// translation and summarization have all succeeded. Later stages treat
/// it as read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    /// Source video id
    pub video_id: String,

    /// Transcript text in the source language
    pub original_transcript: String,

    /// Transcript translated to the target language
    pub translated_text: String,

    /// Editorial summary of the translated text
    pub summary: Summary,
}
