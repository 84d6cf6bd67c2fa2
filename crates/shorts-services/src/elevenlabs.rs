//! ElevenLabs text-to-speech client.

use std::path::Path;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::error::{ServiceError, ServiceResult};
use crate::traits::SpeechSynthesizer;

const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";
const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";
const MODEL_ID: &str = "eleven_multilingual_v2";

const STABILITY: f64 = 0.5;
const SIMILARITY_BOOST: f64 = 0.75;

#[derive(Clone)]
pub struct ElevenLabsClient {
    http: reqwest::Client,
    api_key: String,
    voice_id: String,
    base_url: String,
}

impl ElevenLabsClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            voice_id: DEFAULT_VOICE_ID.to_string(),
            base_url: base_url.into(),
        }
    }

    pub fn with_voice(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = voice_id.into();
        self
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: &str, output_path: &Path) -> ServiceResult<()> {
        let url = format!("{}/v1/text-to-speech/{}", self.base_url, self.voice_id);
        let body = json!({
            "text": text,
            "model_id": MODEL_ID,
            "voice_settings": {
                "stability": STABILITY,
                "similarity_boost": SIMILARITY_BOOST,
            },
        });

        let response = self
            .http
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::api_status(
                "elevenlabs",
                status.as_u16(),
                body,
            ));
        }

        let audio = response.bytes().await?;
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output_path, &audio).await?;
        debug!(bytes = audio.len(), path = %output_path.display(), "narration audio written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn synthesize_writes_audio_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/v1/text-to-speech/{DEFAULT_VOICE_ID}")))
            .and(header("xi-api-key", "key"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp3-bytes".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("audio/hook.mp3");
        let client = ElevenLabsClient::with_base_url("key", server.uri());
        client.synthesize("Shocking news!", &out).await.unwrap();

        let written = tokio::fs::read(&out).await.unwrap();
        assert_eq!(written, b"mp3-bytes");
    }

    #[tokio::test]
    async fn api_error_propagates_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = ElevenLabsClient::with_base_url("key", server.uri());
        let err = client
            .synthesize("text", &dir.path().join("out.mp3"))
            .await
            .unwrap_err();
        match err {
            ServiceError::ApiStatus { status, .. } => assert_eq!(status, 401),
            other => panic!("unexpected error: {other}"),
        }
    }
}
