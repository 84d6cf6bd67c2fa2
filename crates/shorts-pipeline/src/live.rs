//! Live wiring of the stage seam to the real service clients.

use async_trait::async_trait;

use shorts_metrics::MetricsStore;
use shorts_models::{
    RenderedVideo, Script, SourceVideo, TemplateSet, TranscriptRecord,
};
use shorts_services::{
    CaptionClient, ElevenLabsClient, OAuthTokenCache, OpenAiClient, YoutubeDataClient,
    YoutubeUploadClient,
};

use crate::analytics::AnalyticsStage;
use crate::config::PipelineConfig;
use crate::discovery::DiscoveryStage;
use crate::error::PipelineResult;
use crate::orchestrator::PipelineStages;
use crate::publishing::PublishingStage;
use crate::rendering::RenderingStage;
use crate::scripting::ScriptingStage;
use crate::transcription::TranscriptionStage;

/// Concrete stage set backed by the production clients.
pub struct LiveStages {
    discovery: DiscoveryStage,
    transcription: TranscriptionStage<CaptionClient, OpenAiClient, OpenAiClient>,
    scripting: ScriptingStage<OpenAiClient>,
    rendering: RenderingStage<ElevenLabsClient>,
    publishing: PublishingStage,
}

impl LiveStages {
    pub fn new(config: PipelineConfig, metrics: MetricsStore) -> Self {
        let openai = OpenAiClient::new(config.openai_api_key.clone());
        let youtube = YoutubeDataClient::new(config.youtube_api_key.clone());
        let elevenlabs = ElevenLabsClient::new(config.elevenlabs_api_key.clone());
        let upload =
            YoutubeUploadClient::new(OAuthTokenCache::new(config.oauth_token_path.clone()));

        Self {
            discovery: DiscoveryStage::new(youtube, config.clone()),
            transcription: TranscriptionStage::new(
                CaptionClient::new(),
                openai.clone(),
                openai.clone(),
                config.clone(),
            ),
            scripting: ScriptingStage::new(openai, config.clone()),
            rendering: RenderingStage::new(elevenlabs, config.clone()),
            publishing: PublishingStage::new(upload, metrics, config),
        }
    }
}

#[async_trait]
impl PipelineStages for LiveStages {
    async fn discover(&self) -> PipelineResult<Vec<SourceVideo>> {
        self.discovery.run().await
    }

    async fn transcribe(&self, video: &SourceVideo) -> PipelineResult<TranscriptRecord> {
        self.transcription.run(video).await
    }

    async fn script(
        &self,
        video: &SourceVideo,
        transcript: &TranscriptRecord,
        templates: &TemplateSet,
    ) -> PipelineResult<Script> {
        self.scripting.run(video, transcript, templates).await
    }

    async fn render(&self, script: &Script) -> PipelineResult<RenderedVideo> {
        let rendered = self.rendering.run(script).await?;
        // Thumbnail generation is best effort; publishing picks the
        // file up if it exists.
        if let Err(e) = self.rendering.thumbnail(&rendered).await {
            tracing::warn!(video_id = %script.video_id, error = %e, "thumbnail extraction failed");
        }
        Ok(rendered)
    }

    async fn publish(
        &self,
        script: &Script,
        rendered: &RenderedVideo,
        templates: &TemplateSet,
    ) -> PipelineResult<String> {
        self.publishing.run(script, rendered, templates).await
    }
}

/// Text generator for the template adaptation engine.
pub fn live_generator(config: &PipelineConfig) -> OpenAiClient {
    OpenAiClient::new(config.openai_api_key.clone())
}

/// Builds the out-of-band analytics stage with its own credentials.
pub fn live_analytics(
    config: &PipelineConfig,
    metrics: MetricsStore,
) -> AnalyticsStage<OpenAiClient> {
    let analytics = shorts_services::YoutubeAnalyticsClient::new(OAuthTokenCache::new(
        config.oauth_token_path.clone(),
    ));
    AnalyticsStage::new(analytics, metrics, OpenAiClient::new(config.openai_api_key.clone()))
}
