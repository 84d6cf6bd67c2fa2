//! Clients for the external collaborators of the pipeline.
//!
//! Every stage treats its external dependencies as interchangeable
//! plumbing behind a trait seam:
//! - platform data API (discovery)
//! - caption retrieval and speech-to-text (transcription)
//! - text generation (translation, summarization, rewriting, feedback)
//! - text-to-speech (rendering)
//! - upload, analytics and comments (publishing, analytics)

pub mod analytics;
pub mod auth;
pub mod captions;
pub mod elevenlabs;
pub mod error;
pub mod openai;
pub mod traits;
pub mod upload;
pub mod youtube;

pub use analytics::{summarize_report, AnalyticsReport, PerformanceSummary, YoutubeAnalyticsClient};
pub use auth::OAuthTokenCache;
pub use captions::{CaptionClient, CaptionLine};
pub use elevenlabs::ElevenLabsClient;
pub use error::{ServiceError, ServiceResult};
pub use openai::OpenAiClient;
pub use traits::{CaptionSource, SpeechSynthesizer, SpeechToText, TextGenerator};
pub use upload::{UploadMetadata, YoutubeUploadClient};
pub use youtube::YoutubeDataClient;
