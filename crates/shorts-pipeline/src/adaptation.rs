//! Template adaptation engine.
//!
//! Folds accumulated feedback back into the shared template set. The
//! engine never mutates the active set in place: it builds a fresh
//! proposal, validates it, and only then swaps the stored document and
//! appends audit rows for the fields that changed.

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use shorts_metrics::MetricsStore;
use shorts_models::{FeedbackRecord, Stage, TemplateChangeRecord, TemplateSet};
use shorts_services::TextGenerator;
use shorts_store::TemplateStore;

use crate::error::{PipelineError, PipelineResult};

/// Minimum feedback records before any adaptation happens.
const MIN_FEEDBACK_RECORDS: usize = 3;

/// How many recent feedback records feed one adaptation pass.
const FEEDBACK_WINDOW: u32 = 50;

const ADAPT_SYSTEM: &str = "You tune phrase templates for Korean news shorts based on viewer \
     feedback. Given the current template set and recent feedback, return JSON with \"hook\" (map \
     of style name to pattern, each pattern containing exactly one {} slot), \"transition\" \
     (array of phrases), \"ending\" (array of phrases) and \"reason\" (one sentence explaining \
     the changes). Keep styles that work. Return only JSON.";

pub struct AdaptationEngine<G> {
    generator: G,
    templates: TemplateStore,
    metrics: MetricsStore,
}

/// Outcome of one adaptation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptationOutcome {
    /// The set now active
    pub active: TemplateSet,
    /// Audit rows written, one per changed field
    pub changes: Vec<TemplateChangeRecord>,
}

impl<G: TextGenerator> AdaptationEngine<G> {
    pub fn new(generator: G, templates: TemplateStore, metrics: MetricsStore) -> Self {
        Self {
            generator,
            templates,
            metrics,
        }
    }

    /// Runs one adaptation pass over recent feedback.
    pub async fn run(&self) -> PipelineResult<AdaptationOutcome> {
        let feedback = self.metrics.recent_feedback(FEEDBACK_WINDOW).await?;
        let current = self.templates.load().await?;
        self.update_templates(&current, &feedback).await
    }

    /// Applies feedback to the current set.
    ///
    /// Below the minimum sample size this is a no-op: the input set
    /// stays active and no audit rows are written. A structurally
    /// invalid proposal is discarded with the prior set left active.
    pub async fn update_templates(
        &self,
        current: &TemplateSet,
        feedback: &[FeedbackRecord],
    ) -> PipelineResult<AdaptationOutcome> {
        if feedback.len() < MIN_FEEDBACK_RECORDS {
            info!(
                records = feedback.len(),
                minimum = MIN_FEEDBACK_RECORDS,
                "not enough feedback for adaptation"
            );
            return Ok(AdaptationOutcome {
                active: current.clone(),
                changes: Vec::new(),
            });
        }

        let (proposed, reason) = self.propose(current, feedback).await?;
        if let Err(e) = proposed.validate() {
            warn!(error = %e, "template proposal rejected, keeping prior set");
            return Err(PipelineError::TemplateProposalRejected(e));
        }

        let changes = diff_changes(current, &proposed, &reason);
        if changes.is_empty() {
            info!("proposal identical to active set, nothing to do");
            return Ok(AdaptationOutcome {
                active: current.clone(),
                changes: Vec::new(),
            });
        }

        self.templates.replace(&proposed).await?;
        for change in &changes {
            self.metrics.insert_template_change(change).await?;
        }
        info!(changed_fields = changes.len(), reason = %reason, "template set adapted");

        Ok(AdaptationOutcome {
            active: proposed,
            changes,
        })
    }

    async fn propose(
        &self,
        current: &TemplateSet,
        feedback: &[FeedbackRecord],
    ) -> PipelineResult<(TemplateSet, String)> {
        let prompt = json!({
            "current_templates": current,
            "feedback": feedback.iter().map(|f| json!({
                "hook": f.hook_feedback,
                "summary": f.summary_feedback,
                "subtitles": f.subtitle_feedback,
                "length": f.length_feedback,
                "overall_score": f.overall_score,
            })).collect::<Vec<_>>(),
        })
        .to_string();

        let raw = self
            .generator
            .generate(ADAPT_SYSTEM, &prompt, 0.7)
            .await
            .map_err(|e| PipelineError::from_service(Stage::Analytics, e))?;
        let value = shorts_services::openai::extract_json(&raw)
            .map_err(|e| PipelineError::from_service(Stage::Analytics, e))?;

        let reason = value
            .get("reason")
            .and_then(|v| v.as_str())
            .unwrap_or("feedback-driven adjustment")
            .to_string();

        let proposed: TemplateSet = serde_json::from_value(json!({
            "hook": value.get("hook").cloned().unwrap_or(json!({})),
            "transition": value.get("transition").cloned().unwrap_or(json!([])),
            "ending": value.get("ending").cloned().unwrap_or(json!([])),
        }))
        .map_err(|e| {
            PipelineError::malformed(Stage::Analytics, format!("proposal shape: {e}"))
        })?;

        Ok((proposed, reason))
    }
}

/// One audit row per field whose value actually changed.
fn diff_changes(
    current: &TemplateSet,
    proposed: &TemplateSet,
    reason: &str,
) -> Vec<TemplateChangeRecord> {
    let mut changes = Vec::new();
    let mut push = |change_type: &str, old: String, new: String| {
        if old != new {
            changes.push(TemplateChangeRecord {
                change_type: change_type.to_string(),
                old_value: old,
                new_value: new,
                reason: reason.to_string(),
                changed_at: Utc::now(),
            });
        }
    };

    push(
        "hook",
        serde_json::to_string(&current.hook).unwrap_or_default(),
        serde_json::to_string(&proposed.hook).unwrap_or_default(),
    );
    push(
        "transition",
        serde_json::to_string(&current.transition).unwrap_or_default(),
        serde_json::to_string(&proposed.transition).unwrap_or_default(),
    );
    push(
        "ending",
        serde_json::to_string(&current.ending).unwrap_or_default(),
        serde_json::to_string(&proposed.ending).unwrap_or_default(),
    );
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use shorts_services::ServiceResult;

    struct CountingGenerator {
        calls: Arc<AtomicUsize>,
        reply: String,
    }

    #[async_trait]
    impl TextGenerator for CountingGenerator {
        async fn generate(
            &self,
            _system: &str,
            _user: &str,
            _temperature: f32,
        ) -> ServiceResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    fn feedback(n: usize) -> Vec<FeedbackRecord> {
        (0..n)
            .map(|i| FeedbackRecord {
                video_id: format!("pub{i}"),
                hook_feedback: "훅이 약함".to_string(),
                summary_feedback: "좋음".to_string(),
                subtitle_feedback: "좋음".to_string(),
                length_feedback: "적절".to_string(),
                overall_score: 6,
                generated_at: Utc::now(),
            })
            .collect()
    }

    /// Proposal that changes only the transition pool.
    fn transition_only_proposal() -> String {
        let mut set = TemplateSet::default();
        set.transition = vec!["완전히 새로운 전환.".to_string()];
        format!(
            r#"{{"hook": {}, "transition": {}, "ending": {}, "reason": "전환 문구 단조로움"}}"#,
            serde_json::to_string(&set.hook).unwrap(),
            serde_json::to_string(&set.transition).unwrap(),
            serde_json::to_string(&set.ending).unwrap(),
        )
    }

    async fn engine(
        reply: String,
        calls: Arc<AtomicUsize>,
        dir: &tempfile::TempDir,
    ) -> (AdaptationEngine<CountingGenerator>, MetricsStore, TemplateStore) {
        let metrics = MetricsStore::open_in_memory().await.unwrap();
        let templates = TemplateStore::new(dir.path());
        let engine = AdaptationEngine::new(
            CountingGenerator { calls, reply },
            templates.clone(),
            metrics.clone(),
        );
        (engine, metrics, templates)
    }

    #[tokio::test]
    async fn test_below_minimum_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let (engine, metrics, _) = engine(transition_only_proposal(), calls.clone(), &dir).await;

        let current = TemplateSet::default();
        let outcome = engine.update_templates(&current, &feedback(2)).await.unwrap();

        assert_eq!(outcome.active, current);
        assert!(outcome.changes.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(metrics.template_changes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_one_audit_row_per_changed_field() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, metrics, templates) = engine(
            transition_only_proposal(),
            Arc::new(AtomicUsize::new(0)),
            &dir,
        )
        .await;

        let current = TemplateSet::default();
        let outcome = engine.update_templates(&current, &feedback(3)).await.unwrap();

        // Only the transition pool differs from the default set.
        assert_eq!(outcome.changes.len(), 1);
        assert_eq!(outcome.changes[0].change_type, "transition");
        assert_eq!(outcome.changes[0].reason, "전환 문구 단조로움");

        let rows = metrics.template_changes().await.unwrap();
        assert_eq!(rows.len(), 1);

        // The stored set now carries the proposal.
        let active = templates.load().await.unwrap();
        assert_eq!(active.transition, vec!["완전히 새로운 전환.".to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_proposal_rejected_keeps_prior_set() {
        let dir = tempfile::tempdir().unwrap();
        let reply = r#"{"hook": {}, "transition": [], "ending": [], "reason": "r"}"#.to_string();
        let (engine, metrics, templates) =
            engine(reply, Arc::new(AtomicUsize::new(0)), &dir).await;

        // Seed the store so the prior set is observable afterwards.
        let current = templates.load().await.unwrap();
        let err = engine.update_templates(&current, &feedback(5)).await.unwrap_err();

        assert!(matches!(err, PipelineError::TemplateProposalRejected(_)));
        assert_eq!(templates.load().await.unwrap(), current);
        assert!(metrics.template_changes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_identical_proposal_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let set = TemplateSet::default();
        let reply = format!(
            r#"{{"hook": {}, "transition": {}, "ending": {}, "reason": "r"}}"#,
            serde_json::to_string(&set.hook).unwrap(),
            serde_json::to_string(&set.transition).unwrap(),
            serde_json::to_string(&set.ending).unwrap(),
        );
        let (engine, metrics, _) = engine(reply, Arc::new(AtomicUsize::new(0)), &dir).await;

        let outcome = engine.update_templates(&set, &feedback(4)).await.unwrap();
        assert!(outcome.changes.is_empty());
        assert!(metrics.template_changes().await.unwrap().is_empty());
    }
}
