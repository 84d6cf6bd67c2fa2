//! YouTube Data API v3 client used by discovery.
//!
//! All statistics fields arrive as JSON strings and may be absent when
//! the channel hides them; missing counters default to zero.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use shorts_models::SourceVideo;

use crate::error::{ServiceError, ServiceResult};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchId,
}

#[derive(Debug, Deserialize)]
struct SearchId {
    #[serde(rename = "channelId")]
    channel_id: Option<String>,
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    snippet: VideoSnippet,
    #[serde(default)]
    statistics: VideoStatistics,
}

#[derive(Debug, Deserialize)]
struct VideoSnippet {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "channelTitle")]
    channel_title: String,
    #[serde(rename = "publishedAt")]
    published_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
struct VideoStatistics {
    #[serde(rename = "viewCount", default)]
    view_count: Option<String>,
    #[serde(rename = "likeCount", default)]
    like_count: Option<String>,
    #[serde(rename = "commentCount", default)]
    comment_count: Option<String>,
}

fn parse_count(raw: &Option<String>) -> u64 {
    raw.as_deref()
        .and_then(|s| s.parse().ok())
        .unwrap_or_default()
}

#[derive(Clone)]
pub struct YoutubeDataClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl YoutubeDataClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> ServiceResult<T> {
        let url = format!("{}/{endpoint}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::api_status("youtube", status.as_u16(), body));
        }
        Ok(response.json().await?)
    }

    /// Resolves a channel display name to its channel id.
    pub async fn find_channel_id(&self, channel_name: &str) -> ServiceResult<Option<String>> {
        let response: SearchResponse = self
            .get_json(
                "search",
                &[
                    ("part", "snippet"),
                    ("type", "channel"),
                    ("q", channel_name),
                    ("maxResults", "1"),
                ],
            )
            .await?;

        Ok(response.items.into_iter().find_map(|i| i.id.channel_id))
    }

    /// Lists ids of the channel's uploads within the lookback window,
    /// newest first, capped at `max_results`.
    pub async fn recent_upload_ids(
        &self,
        channel_id: &str,
        lookback: Duration,
        max_results: u32,
    ) -> ServiceResult<Vec<String>> {
        let published_after = (Utc::now() - lookback).to_rfc3339();
        let max = max_results.to_string();
        let response: SearchResponse = self
            .get_json(
                "search",
                &[
                    ("part", "snippet"),
                    ("channelId", channel_id),
                    ("type", "video"),
                    ("order", "date"),
                    ("publishedAfter", published_after.as_str()),
                    ("maxResults", max.as_str()),
                ],
            )
            .await?;

        Ok(response.items.into_iter().filter_map(|i| i.id.video_id).collect())
    }

    /// Fetches title, channel and statistics for a batch of video ids.
    /// Ids the API does not return (deleted or private) are skipped.
    pub async fn video_details(&self, video_ids: &[String]) -> ServiceResult<Vec<SourceVideo>> {
        if video_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = video_ids.join(",");
        let response: VideoListResponse = self
            .get_json(
                "videos",
                &[("part", "snippet,statistics"), ("id", ids.as_str())],
            )
            .await?;

        if response.items.len() < video_ids.len() {
            warn!(
                requested = video_ids.len(),
                returned = response.items.len(),
                "some videos missing from details response"
            );
        }

        let videos = response
            .items
            .into_iter()
            .map(|item| SourceVideo {
                id: item.id,
                title: item.snippet.title,
                description: item.snippet.description,
                channel: item.snippet.channel_title,
                published_at: item.snippet.published_at,
                view_count: parse_count(&item.statistics.view_count),
                like_count: parse_count(&item.statistics.like_count),
                comment_count: parse_count(&item.statistics.comment_count),
            })
            .collect::<Vec<_>>();
        debug!(count = videos.len(), "fetched video details");
        Ok(videos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn find_channel_id_returns_first_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("type", "channel"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"id": {"channelId": "UC123"}}]
            })))
            .mount(&server)
            .await;

        let client = YoutubeDataClient::with_base_url("key", server.uri());
        let id = client.find_channel_id("CNN").await.unwrap();
        assert_eq!(id.as_deref(), Some("UC123"));
    }

    #[tokio::test]
    async fn video_details_parses_string_counters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/videos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{
                    "id": "vid1",
                    "snippet": {
                        "title": "Breaking",
                        "description": "Full coverage of the summit",
                        "channelTitle": "CNN",
                        "publishedAt": "2026-08-01T12:00:00Z"
                    },
                    "statistics": {"viewCount": "9000", "likeCount": "100"}
                }]
            })))
            .mount(&server)
            .await;

        let client = YoutubeDataClient::with_base_url("key", server.uri());
        let videos = client.video_details(&["vid1".to_string()]).await.unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].description, "Full coverage of the summit");
        assert_eq!(videos[0].view_count, 9000);
        assert_eq!(videos[0].like_count, 100);
        // commentCount absent from the response
        assert_eq!(videos[0].comment_count, 0);
    }

    #[tokio::test]
    async fn quota_exhaustion_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(403).set_body_string("quotaExceeded"))
            .mount(&server)
            .await;

        let client = YoutubeDataClient::with_base_url("key", server.uri());
        let err = client.find_channel_id("CNN").await.unwrap_err();
        match err {
            ServiceError::ApiStatus { status, body, .. } => {
                assert_eq!(status, 403);
                assert!(body.contains("quotaExceeded"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_id_batch_short_circuits() {
        let client = YoutubeDataClient::with_base_url("key", "http://127.0.0.1:1");
        let videos = client.video_details(&[]).await.unwrap();
        assert!(videos.is_empty());
    }
}
