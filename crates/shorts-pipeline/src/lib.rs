//! Stage-checkpointed shorts pipeline with feedback-driven template
//! adaptation.
//!
//! The orchestrator drives one source video through discovery,
//! transcription, scripting, rendering and publishing, checkpointing
//! every stage output. Analytics and template adaptation run out of
//! band once engagement metrics have accumulated.

pub mod adaptation;
pub mod analytics;
pub mod config;
pub mod discovery;
pub mod error;
pub mod live;
pub mod orchestrator;
pub mod publishing;
pub mod rendering;
pub mod scripting;
pub mod templates;
pub mod transcription;

pub use adaptation::{AdaptationEngine, AdaptationOutcome};
pub use analytics::AnalyticsStage;
pub use config::PipelineConfig;
pub use discovery::DiscoveryStage;
pub use error::{PipelineError, PipelineResult};
pub use live::{live_analytics, live_generator, LiveStages};
pub use orchestrator::{Orchestrator, PipelineStages, PublishRecord, RunOutcome, RunTarget};
pub use publishing::PublishingStage;
pub use rendering::RenderingStage;
pub use scripting::ScriptingStage;
pub use transcription::TranscriptionStage;
