//! Pipeline orchestrator.
//!
//! Drives one video id through the stage chain. Each stage output is
//! checkpointed in the artifact store before the next stage runs, so a
//! re-run loads existing artifacts instead of re-executing stages, and
//! a failed run resumes from its last completed stage. An advisory
//! lease excludes concurrent runs for the same video id.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use shorts_models::{
    RenderedVideo, RunState, Script, SourceVideo, Stage, TemplateSet, TranscriptRecord,
};
use shorts_store::{ArtifactStore, LeaseGuard, TemplateStore};

use crate::error::{PipelineError, PipelineResult};

/// Stage execution seam, implemented by the live wiring and by test
/// stubs.
#[async_trait]
pub trait PipelineStages: Send + Sync {
    async fn discover(&self) -> PipelineResult<Vec<SourceVideo>>;
    async fn transcribe(&self, video: &SourceVideo) -> PipelineResult<TranscriptRecord>;
    async fn script(
        &self,
        video: &SourceVideo,
        transcript: &TranscriptRecord,
        templates: &TemplateSet,
    ) -> PipelineResult<Script>;
    async fn render(&self, script: &Script) -> PipelineResult<RenderedVideo>;
    async fn publish(
        &self,
        script: &Script,
        rendered: &RenderedVideo,
        templates: &TemplateSet,
    ) -> PipelineResult<String>;
}

/// What the run operates on.
#[derive(Debug, Clone)]
pub enum RunTarget {
    /// Run discovery and take the highest-scoring candidate.
    DiscoverNew,
    /// Operate on a video id with a persisted discovery artifact.
    Existing(String),
}

/// Publishing artifact: maps the source video id to the id the
/// platform assigned at upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishRecord {
    pub source_id: String,
    pub published_id: String,
}

/// Result of a completed (possibly truncated) run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub video_id: String,
    pub last_stage: Stage,
    pub rendered: Option<RenderedVideo>,
    pub published_id: Option<String>,
}

pub struct Orchestrator<S> {
    stages: S,
    artifacts: ArtifactStore,
    templates: TemplateStore,
    lease_root: std::path::PathBuf,
    lease_stale: Duration,
}

impl<S: PipelineStages> Orchestrator<S> {
    pub fn new(
        stages: S,
        artifacts: ArtifactStore,
        templates: TemplateStore,
        lease_root: impl Into<std::path::PathBuf>,
        lease_stale: Duration,
    ) -> Self {
        Self {
            stages,
            artifacts,
            templates,
            lease_root: lease_root.into(),
            lease_stale,
        }
    }

    /// Runs the chain for a target, stopping after `stop_after`.
    ///
    /// Existing artifacts are loaded instead of re-executing their
    /// stage. Any stage failure halts the chain with downstream stages
    /// untouched.
    pub async fn run(&self, target: RunTarget, stop_after: Stage) -> PipelineResult<RunOutcome> {
        let video = self.resolve_candidate(&target).await?;
        let video_id = video.id.clone();
        info!(video_id = %video_id, stop_after = %stop_after, "starting run");

        let lease = LeaseGuard::acquire(&self.lease_root, &video_id, self.lease_stale).await?;
        let result = self.run_chain(&video, stop_after).await;
        lease.release().await?;

        match &result {
            Ok(outcome) => {
                info!(video_id = %video_id, last_stage = %outcome.last_stage, "run complete")
            }
            Err(e) => error!(video_id = %video_id, error = %e, "run failed"),
        }
        result
    }

    async fn resolve_candidate(&self, target: &RunTarget) -> PipelineResult<SourceVideo> {
        match target {
            RunTarget::Existing(video_id) => self
                .artifacts
                .load::<SourceVideo>(video_id, Stage::Discovery)
                .await?
                .ok_or_else(|| {
                    PipelineError::no_usable_data(
                        Stage::Discovery,
                        format!("no discovery artifact for {video_id}"),
                    )
                }),
            RunTarget::DiscoverNew => {
                let ranked = self.stages.discover().await?;
                // Every ranked candidate is checkpointed so a later
                // mid-chain run can pick one that is not the top entry.
                for candidate in &ranked {
                    self.artifacts
                        .store(&candidate.id, Stage::Discovery, candidate)
                        .await?;
                }
                let candidate = ranked.into_iter().next().ok_or_else(|| {
                    PipelineError::no_usable_data(Stage::Discovery, "empty candidate list")
                })?;
                self.mark_complete(&candidate.id, Stage::Discovery).await?;
                Ok(candidate)
            }
        }
    }

    async fn run_chain(&self, video: &SourceVideo, stop_after: Stage) -> PipelineResult<RunOutcome> {
        let video_id = &video.id;
        let mut outcome = RunOutcome {
            video_id: video_id.clone(),
            last_stage: Stage::Discovery,
            rendered: None,
            published_id: None,
        };
        if stop_after == Stage::Discovery {
            return Ok(outcome);
        }

        // The active template set is pinned for the whole run; a
        // concurrent adaptation only affects future runs.
        let templates = self.templates.load().await?;

        let transcript: TranscriptRecord = match self.artifacts.load(video_id, Stage::Transcription).await? {
            Some(existing) => existing,
            None => {
                let record = self.stages.transcribe(video).await?;
                self.artifacts
                    .store(video_id, Stage::Transcription, &record)
                    .await?;
                self.mark_complete(video_id, Stage::Transcription).await?;
                record
            }
        };
        outcome.last_stage = Stage::Transcription;
        if stop_after == Stage::Transcription {
            return Ok(outcome);
        }

        let script: Script = match self.artifacts.load(video_id, Stage::Scripting).await? {
            Some(existing) => existing,
            None => {
                let script = self.stages.script(video, &transcript, &templates).await?;
                self.artifacts
                    .store(video_id, Stage::Scripting, &script)
                    .await?;
                self.mark_complete(video_id, Stage::Scripting).await?;
                script
            }
        };
        outcome.last_stage = Stage::Scripting;
        if stop_after == Stage::Scripting {
            return Ok(outcome);
        }

        let rendered: RenderedVideo = match self.artifacts.load(video_id, Stage::Rendering).await? {
            Some(existing) => existing,
            None => {
                let rendered = self.stages.render(&script).await?;
                self.artifacts
                    .store(video_id, Stage::Rendering, &rendered)
                    .await?;
                self.mark_complete(video_id, Stage::Rendering).await?;
                rendered
            }
        };
        outcome.rendered = Some(rendered.clone());
        outcome.last_stage = Stage::Rendering;
        if stop_after == Stage::Rendering {
            return Ok(outcome);
        }

        let publish: PublishRecord = match self.artifacts.load(video_id, Stage::Publishing).await? {
            Some(existing) => existing,
            None => {
                let published_id = self
                    .stages
                    .publish(&script, &rendered, &templates)
                    .await?;
                let record = PublishRecord {
                    source_id: video_id.clone(),
                    published_id,
                };
                self.artifacts
                    .store(video_id, Stage::Publishing, &record)
                    .await?;
                self.mark_complete(video_id, Stage::Publishing).await?;
                record
            }
        };
        outcome.published_id = Some(publish.published_id);
        outcome.last_stage = Stage::Publishing;
        Ok(outcome)
    }

    async fn mark_complete(&self, video_id: &str, stage: Stage) -> PipelineResult<()> {
        let state = self
            .artifacts
            .load_run_state(video_id)
            .await?
            .unwrap_or_else(|| RunState::new(video_id));
        self.artifacts
            .store_run_state(&state.complete(stage))
            .await?;
        Ok(())
    }
}
