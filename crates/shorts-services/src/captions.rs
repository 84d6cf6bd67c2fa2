//! Caption track retrieval.
//!
//! Track listing comes from yt-dlp metadata (`-J --skip-download`),
//! which exposes both manual subtitle tracks and auto-generated
//! captions with direct fetch URLs. The selected track is fetched in
//! json3 format and flattened into timed lines.

use std::collections::BTreeMap;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::traits::CaptionSource;

/// One caption cue as the platform reports it. Times are seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionLine {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

#[derive(Debug, Deserialize)]
struct VideoMetadata {
    #[serde(default)]
    subtitles: BTreeMap<String, Vec<CaptionTrack>>,
    #[serde(default)]
    automatic_captions: BTreeMap<String, Vec<CaptionTrack>>,
}

#[derive(Debug, Clone, Deserialize)]
struct CaptionTrack {
    url: String,
    #[serde(default)]
    ext: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Json3Document {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(rename = "tStartMs", default)]
    start_ms: u64,
    #[serde(rename = "dDurationMs", default)]
    duration_ms: u64,
    #[serde(default)]
    segs: Vec<Json3Segment>,
}

#[derive(Debug, Deserialize)]
struct Json3Segment {
    #[serde(default)]
    utf8: String,
}

#[derive(Clone)]
pub struct CaptionClient {
    http: reqwest::Client,
    ytdlp_bin: String,
}

impl CaptionClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            ytdlp_bin: "yt-dlp".to_string(),
        }
    }

    pub fn with_binary(mut self, bin: impl Into<String>) -> Self {
        self.ytdlp_bin = bin.into();
        self
    }

    async fn video_metadata(&self, video_id: &str) -> ServiceResult<VideoMetadata> {
        let url = format!("https://www.youtube.com/watch?v={video_id}");
        let output = Command::new(&self.ytdlp_bin)
            .args(["-J", "--skip-download", &url])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ServiceError::malformed(
                "captions",
                format!("metadata fetch failed for {video_id}: {stderr}"),
            ));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| ServiceError::malformed("captions", format!("metadata JSON: {e}")))
    }

    async fn fetch_track(&self, track: &CaptionTrack) -> ServiceResult<Vec<CaptionLine>> {
        // yt-dlp lists one entry per format. Ask for json3 explicitly in
        // case the listed URL defaults to another format.
        let url = if track.url.contains("fmt=") {
            track.url.clone()
        } else {
            format!("{}&fmt=json3", track.url)
        };
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::api_status(
                "captions",
                status.as_u16(),
                "caption track fetch failed",
            ));
        }
        let body = response.text().await?;
        parse_json3(&body)
    }
}

impl Default for CaptionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptionSource for CaptionClient {
    async fn fetch_captions(&self, video_id: &str) -> ServiceResult<Option<Vec<CaptionLine>>> {
        let metadata = match self.video_metadata(video_id).await {
            Ok(m) => m,
            Err(e) => {
                warn!(video_id, error = %e, "caption track listing failed");
                return Ok(None);
            }
        };

        let Some(track) = select_track(&metadata.subtitles, &metadata.automatic_captions) else {
            debug!(video_id, "no caption track available");
            return Ok(None);
        };

        let lines = self.fetch_track(&track).await?;
        if lines.is_empty() {
            return Ok(None);
        }
        Ok(Some(lines))
    }
}

/// Picks the best available track: manual English first, then any
/// manual track, then auto-generated English, then any auto track.
fn select_track(
    subtitles: &BTreeMap<String, Vec<CaptionTrack>>,
    automatic: &BTreeMap<String, Vec<CaptionTrack>>,
) -> Option<CaptionTrack> {
    let pick = |tracks: &[CaptionTrack]| {
        tracks
            .iter()
            .find(|t| t.ext.as_deref() == Some("json3"))
            .or_else(|| tracks.first())
            .cloned()
    };

    for map in [subtitles, automatic] {
        if let Some((_, tracks)) = map.iter().find(|(lang, _)| lang.starts_with("en")) {
            if let Some(track) = pick(tracks) {
                return Some(track);
            }
        }
        if let Some((_, tracks)) = map.iter().next() {
            if let Some(track) = pick(tracks) {
                return Some(track);
            }
        }
    }
    None
}

fn parse_json3(body: &str) -> ServiceResult<Vec<CaptionLine>> {
    let document: Json3Document = serde_json::from_str(body)
        .map_err(|e| ServiceError::malformed("captions", format!("json3 payload: {e}")))?;

    let mut lines = Vec::new();
    for event in document.events {
        let text: String = event.segs.iter().map(|s| s.utf8.as_str()).collect();
        let text = text.replace('\n', " ").trim().to_string();
        if text.is_empty() {
            continue;
        }
        lines.push(CaptionLine {
            text,
            start: event.start_ms as f64 / 1000.0,
            duration: event.duration_ms as f64 / 1000.0,
        });
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(url: &str, ext: &str) -> CaptionTrack {
        CaptionTrack {
            url: url.to_string(),
            ext: Some(ext.to_string()),
        }
    }

    #[test]
    fn manual_english_wins_over_auto() {
        let mut subtitles = BTreeMap::new();
        subtitles.insert("en".to_string(), vec![track("manual", "json3")]);
        let mut automatic = BTreeMap::new();
        automatic.insert("en".to_string(), vec![track("auto", "json3")]);

        let selected = select_track(&subtitles, &automatic).unwrap();
        assert_eq!(selected.url, "manual");
    }

    #[test]
    fn regional_english_variant_matches() {
        let mut subtitles = BTreeMap::new();
        subtitles.insert("en-US".to_string(), vec![track("manual-us", "json3")]);
        let selected = select_track(&subtitles, &BTreeMap::new()).unwrap();
        assert_eq!(selected.url, "manual-us");
    }

    #[test]
    fn falls_back_to_any_auto_track() {
        let mut automatic = BTreeMap::new();
        automatic.insert("ko".to_string(), vec![track("auto-ko", "json3")]);
        let selected = select_track(&BTreeMap::new(), &automatic).unwrap();
        assert_eq!(selected.url, "auto-ko");
    }

    #[test]
    fn no_tracks_yields_none() {
        assert!(select_track(&BTreeMap::new(), &BTreeMap::new()).is_none());
    }

    #[test]
    fn json3_events_flatten_to_lines() {
        let body = r#"{
            "events": [
                {"tStartMs": 0, "dDurationMs": 1500, "segs": [{"utf8": "Breaking "}, {"utf8": "news"}]},
                {"tStartMs": 1500, "dDurationMs": 500, "segs": [{"utf8": "\n"}]},
                {"tStartMs": 2000, "dDurationMs": 1000, "segs": [{"utf8": "tonight"}]}
            ]
        }"#;
        let lines = parse_json3(body).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Breaking news");
        assert_eq!(lines[0].start, 0.0);
        assert_eq!(lines[1].start, 2.0);
        assert_eq!(lines[1].duration, 1.0);
    }
}
