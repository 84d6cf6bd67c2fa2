//! Resumable video upload client.
//!
//! Uploads run in two steps: an initiation request carrying the
//! snippet/status metadata, then the file body streamed to the session
//! URL in fixed 1 MiB chunks with `Content-Range` headers.

use std::path::Path;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::auth::OAuthTokenCache;
use crate::error::{ServiceError, ServiceResult};

const DEFAULT_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/youtube/v3";

const CHUNK_SIZE: usize = 1024 * 1024;

/// People & Blogs.
const UPLOAD_CATEGORY_ID: &str = "22";

#[derive(Debug, Clone)]
pub struct UploadMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: String,
}

pub struct YoutubeUploadClient {
    http: reqwest::Client,
    auth: OAuthTokenCache,
    base_url: String,
}

impl YoutubeUploadClient {
    pub fn new(auth: OAuthTokenCache) -> Self {
        Self::with_base_url(auth, DEFAULT_UPLOAD_BASE)
    }

    pub fn with_base_url(auth: OAuthTokenCache, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth,
            base_url: base_url.into(),
        }
    }

    /// Uploads the file and returns the published video id.
    pub async fn upload_video(
        &self,
        file_path: &Path,
        metadata: &UploadMetadata,
    ) -> ServiceResult<String> {
        let token = self.auth.access_token().await?;
        let body = tokio::fs::read(file_path).await?;
        let total = body.len();

        let session_url = self.initiate_session(&token, metadata, total).await?;
        debug!(total_bytes = total, "upload session opened");

        let mut offset = 0usize;
        let mut final_response = None;
        while offset < total {
            let end = (offset + CHUNK_SIZE).min(total);
            let chunk = body[offset..end].to_vec();
            let content_range = format!("bytes {}-{}/{}", offset, end - 1, total);

            let response = self
                .http
                .put(&session_url)
                .bearer_auth(&token)
                .header("Content-Range", content_range)
                .header("Content-Length", chunk.len())
                .body(chunk)
                .send()
                .await?;

            let status = response.status();
            match status.as_u16() {
                // 308 Resume Incomplete: more chunks expected.
                308 => {}
                s if status.is_success() => {
                    debug!(status = s, "final chunk accepted");
                    final_response = Some(response);
                }
                s => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(ServiceError::api_status("youtube-upload", s, body));
                }
            }
            offset = end;
        }

        let response = final_response.ok_or_else(|| {
            ServiceError::malformed("youtube-upload", "session never acknowledged completion")
        })?;
        let uploaded: UploadResponse = response.json().await?;
        info!(video_id = %uploaded.id, "video uploaded");
        Ok(uploaded.id)
    }

    async fn initiate_session(
        &self,
        token: &str,
        metadata: &UploadMetadata,
        total_bytes: usize,
    ) -> ServiceResult<String> {
        let url = format!(
            "{}/videos?uploadType=resumable&part=snippet,status",
            self.base_url
        );
        let body = json!({
            "snippet": {
                "title": metadata.title,
                "description": metadata.description,
                "tags": metadata.tags,
                "categoryId": UPLOAD_CATEGORY_ID,
            },
            "status": {
                "privacyStatus": "public",
                "selfDeclaredMadeForKids": false,
            },
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .header("X-Upload-Content-Type", "video/mp4")
            .header("X-Upload-Content-Length", total_bytes)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::api_status(
                "youtube-upload",
                status.as_u16(),
                body,
            ));
        }

        response
            .headers()
            .get("Location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ServiceError::malformed("youtube-upload", "initiation response missing Location")
            })
    }

    /// Sets the thumbnail for an uploaded video. Best effort at call
    /// sites; thumbnail failure never fails a publish.
    pub async fn set_thumbnail(&self, video_id: &str, image_path: &Path) -> ServiceResult<()> {
        let token = self.auth.access_token().await?;
        let bytes = tokio::fs::read(image_path).await?;
        let url = format!(
            "{}/thumbnails/set?videoId={video_id}&uploadType=media",
            self.base_url
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .header("Content-Type", "image/jpeg")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::api_status(
                "youtube-upload",
                status.as_u16(),
                body,
            ));
        }
        Ok(())
    }
}
