//! Shared data models for the news shorts pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Source videos and discovery candidates
//! - Transcript and summary records
//! - Narration scripts and the shared template set
//! - Pipeline stages and persisted run state
//! - Published-video metadata, performance samples and feedback

pub mod caption;
pub mod feedback;
pub mod script;
pub mod stage;
pub mod template;
pub mod transcript;
pub mod video;

// Re-export common types
pub use caption::CaptionCue;
pub use feedback::{FeedbackRecord, PerformanceSample, TemplateChangeRecord, VideoMetadataRecord};
pub use script::Script;
pub use stage::{RunState, Stage};
pub use template::{TemplateError, TemplateSet};
pub use transcript::{Summary, TranscriptRecord};
pub use video::{rank_by_engagement, RenderedVideo, SourceVideo};
