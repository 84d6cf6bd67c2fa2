//! Scripting stage: script assembly, duration optimization and
//! title/tag generation.

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};

use shorts_models::{Script, SourceVideo, Stage, TemplateSet, TranscriptRecord};
use shorts_services::TextGenerator;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::templates;

const OPTIMIZE_SYSTEM: &str = "You shorten Korean narration scripts. Rewrite every field to be \
     more concise while preserving meaning. Return JSON with exactly these fields: \"hook\", \
     \"transition\", \"summary\", \"background\", \"ending\". Return only JSON.";

const TITLE_TAGS_SYSTEM: &str = "You write YouTube Shorts metadata for Korean news clips. Return \
     JSON with \"title\" (attention-grabbing, under 60 characters) and \"tags\" (array of at most \
     10 short strings). Return only JSON.";

/// Tag set used when tag generation fails.
const FALLBACK_TAGS: &[&str] = &["뉴스", "글로벌뉴스", "숏츠", "국제뉴스", "이슈"];

const MAX_TITLE_CHARS: usize = 60;
const MAX_TAGS: usize = 10;

pub struct ScriptingStage<G> {
    generator: G,
    config: PipelineConfig,
}

impl<G: TextGenerator> ScriptingStage<G> {
    pub fn new(generator: G, config: PipelineConfig) -> Self {
        Self { generator, config }
    }

    /// Full scripting pass: assemble, fit to duration, add metadata.
    pub async fn run(
        &self,
        video: &SourceVideo,
        transcript: &TranscriptRecord,
        templates: &TemplateSet,
    ) -> PipelineResult<Script> {
        // ThreadRng is !Send; it must not live across an await point.
        let mut script = {
            let mut rng = rand::rng();
            assemble(video, transcript, templates, &mut rng)
        };

        script = self
            .optimize_for_duration(script, self.config.target_duration_secs)
            .await?;
        script = self.generate_title_and_tags(script).await;

        info!(
            video_id = %script.video_id,
            chars = script.narration_chars(),
            "script ready"
        );
        Ok(script)
    }

    /// Rewrites the script when the duration estimate exceeds the
    /// target. A script already within target is returned unchanged.
    pub async fn optimize_for_duration(
        &self,
        mut script: Script,
        target_secs: f64,
    ) -> PipelineResult<Script> {
        let estimate = script.estimated_duration_secs(self.config.chars_per_second);
        if estimate <= target_secs {
            debug!(estimate, target_secs, "duration within target");
            return Ok(script);
        }

        let prompt = json!({
            "target_seconds": target_secs,
            "hook": script.hook,
            "transition": script.transition,
            "summary": script.summary,
            "background": script.background,
            "ending": script.ending,
        })
        .to_string();

        let raw = self
            .generator
            .generate(OPTIMIZE_SYSTEM, &prompt, 0.5)
            .await
            .map_err(|e| PipelineError::from_service(Stage::Scripting, e))?;
        let value = shorts_services::openai::extract_json(&raw)
            .map_err(|e| PipelineError::from_service(Stage::Scripting, e))?;

        let field = |name: &str| -> PipelineResult<String> {
            value
                .get(name)
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    PipelineError::malformed(
                        Stage::Scripting,
                        format!("rewrite missing field '{name}'"),
                    )
                })
        };

        script.hook = field("hook")?;
        script.transition = field("transition")?;
        script.summary = field("summary")?;
        script.background = field("background")?;
        script.ending = field("ending")?;

        debug!(
            new_estimate = script.estimated_duration_secs(self.config.chars_per_second),
            "script rewritten for duration"
        );
        Ok(script)
    }

    /// Derives an upload title and tag set from the script.
    ///
    /// Never fails the run. Title falls back to the original source
    /// title while tags fall back to a fixed generic set; the two
    /// fallbacks differ deliberately and the mismatch is logged as a
    /// policy choice.
    pub async fn generate_title_and_tags(&self, mut script: Script) -> Script {
        let prompt = json!({
            "original_title": script.title,
            "hook": script.hook,
            "summary": script.summary,
            "background": script.background,
        })
        .to_string();

        let parsed = match self.generator.generate(TITLE_TAGS_SYSTEM, &prompt, 0.8).await {
            Ok(raw) => shorts_services::openai::extract_json(&raw),
            Err(e) => Err(e),
        };

        match parsed {
            Ok(value) => {
                let title = value
                    .get("title")
                    .and_then(|v| v.as_str())
                    .map(|t| t.chars().take(MAX_TITLE_CHARS).collect::<String>())
                    .filter(|t| !t.trim().is_empty());
                let tags: Vec<String> = value
                    .get("tags")
                    .and_then(|v| v.as_array())
                    .map(|arr| {
                        arr.iter()
                            .filter_map(|t| t.as_str())
                            .map(str::to_string)
                            .take(MAX_TAGS)
                            .collect()
                    })
                    .unwrap_or_default();

                script.youtube_title = title;
                script.youtube_tags = if tags.is_empty() {
                    fallback_tags()
                } else {
                    tags
                };
            }
            Err(e) => {
                warn!(
                    video_id = %script.video_id,
                    error = %e,
                    "title/tag generation failed; keeping original title and generic tags"
                );
                script.youtube_title = None;
                script.youtube_tags = fallback_tags();
            }
        }
        script
    }
}

fn fallback_tags() -> Vec<String> {
    FALLBACK_TAGS.iter().map(|t| t.to_string()).collect()
}

/// Assembles a script from the transcript summary and the active
/// template set.
pub fn assemble<R: rand::Rng>(
    video: &SourceVideo,
    transcript: &TranscriptRecord,
    set: &TemplateSet,
    rng: &mut R,
) -> Script {
    let style = templates::choose_style(set, rng).to_string();
    Script {
        video_id: video.id.clone(),
        title: video.title.clone(),
        channel: video.channel.clone(),
        hook: templates::enhance_hook(&transcript.summary.hook, &style, set),
        transition: templates::choose_transition(set, rng).to_string(),
        summary: transcript.summary.summary.clone(),
        background: transcript.summary.background.clone(),
        ending: templates::choose_ending(set, rng).to_string(),
        created_at: Utc::now(),
        youtube_title: None,
        youtube_tags: Vec::new(),
    }
}
