//! YouTube Analytics client and report summarization.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::auth::OAuthTokenCache;
use crate::error::{ServiceError, ServiceResult};

const DEFAULT_ANALYTICS_BASE: &str = "https://youtubeanalytics.googleapis.com/v2";
const DEFAULT_DATA_BASE: &str = "https://www.googleapis.com/youtube/v3";

const REPORT_METRICS: &str = "views,likes,comments,averageViewDuration,averageViewPercentage";

const MAX_COMMENTS: u32 = 100;

/// Raw per-day analytics rows as returned by the reports endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsReport {
    #[serde(rename = "columnHeaders", default)]
    pub column_headers: Vec<ColumnHeader>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnHeader {
    pub name: String,
}

/// Aggregated metrics for one collection window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceSummary {
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub avg_view_duration_secs: f64,
    pub avg_view_percentage: f64,
}

#[derive(Debug, Deserialize)]
struct CommentThreadsResponse {
    #[serde(default)]
    items: Vec<CommentThread>,
}

#[derive(Debug, Deserialize)]
struct CommentThread {
    snippet: CommentThreadSnippet,
}

#[derive(Debug, Deserialize)]
struct CommentThreadSnippet {
    #[serde(rename = "topLevelComment")]
    top_level_comment: TopLevelComment,
}

#[derive(Debug, Deserialize)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
struct CommentSnippet {
    #[serde(rename = "textDisplay", default)]
    text_display: String,
}

pub struct YoutubeAnalyticsClient {
    http: reqwest::Client,
    auth: OAuthTokenCache,
    analytics_base: String,
    data_base: String,
}

impl YoutubeAnalyticsClient {
    pub fn new(auth: OAuthTokenCache) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth,
            analytics_base: DEFAULT_ANALYTICS_BASE.to_string(),
            data_base: DEFAULT_DATA_BASE.to_string(),
        }
    }

    pub fn with_base_urls(
        mut self,
        analytics_base: impl Into<String>,
        data_base: impl Into<String>,
    ) -> Self {
        self.analytics_base = analytics_base.into();
        self.data_base = data_base.into();
        self
    }

    /// Runs a per-day report for one video over a date window.
    pub async fn video_report(
        &self,
        video_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ServiceResult<AnalyticsReport> {
        let token = self.auth.access_token().await?;
        let url = format!("{}/reports", self.analytics_base);
        let filters = format!("video=={video_id}");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .query(&[
                ("ids", "channel==MINE"),
                ("startDate", &start.to_string()),
                ("endDate", &end.to_string()),
                ("metrics", REPORT_METRICS),
                ("dimensions", "day"),
                ("filters", &filters),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::api_status(
                "youtube-analytics",
                status.as_u16(),
                body,
            ));
        }

        let report: AnalyticsReport = response.json().await?;
        debug!(video_id, rows = report.rows.len(), "fetched analytics report");
        Ok(report)
    }

    /// Fetches up to 100 top-level comment texts for a video.
    pub async fn video_comments(&self, video_id: &str) -> ServiceResult<Vec<String>> {
        let token = self.auth.access_token().await?;
        let url = format!("{}/commentThreads", self.data_base);
        let max = MAX_COMMENTS.to_string();

        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .query(&[
                ("part", "snippet"),
                ("videoId", video_id),
                ("maxResults", max.as_str()),
                ("textFormat", "plainText"),
            ])
            .send()
            .await?;

        let status = response.status();
        // Comments can be disabled per video; treat that as an empty list.
        if status.as_u16() == 403 {
            debug!(video_id, "comments unavailable");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::api_status(
                "youtube-analytics",
                status.as_u16(),
                body,
            ));
        }

        let parsed: CommentThreadsResponse = response.json().await?;
        Ok(parsed
            .items
            .into_iter()
            .map(|t| t.snippet.top_level_comment.snippet.text_display)
            .collect())
    }
}

/// Collapses per-day rows into window totals.
///
/// Duration and percentage are averaged across days without view
/// weighting, so low-traffic days count as much as launch day.
pub fn summarize_report(report: &AnalyticsReport) -> PerformanceSummary {
    let index = |name: &str| {
        report
            .column_headers
            .iter()
            .position(|h| h.name == name)
    };

    let views_i = index("views");
    let likes_i = index("likes");
    let comments_i = index("comments");
    let duration_i = index("averageViewDuration");
    let percentage_i = index("averageViewPercentage");

    let as_u64 = |row: &[Value], i: Option<usize>| {
        i.and_then(|i| row.get(i)).and_then(Value::as_u64).unwrap_or(0)
    };
    let as_f64 = |row: &[Value], i: Option<usize>| {
        i.and_then(|i| row.get(i)).and_then(Value::as_f64).unwrap_or(0.0)
    };

    let mut summary = PerformanceSummary::default();
    let mut duration_sum = 0.0;
    let mut percentage_sum = 0.0;
    for row in &report.rows {
        summary.views += as_u64(row, views_i);
        summary.likes += as_u64(row, likes_i);
        summary.comments += as_u64(row, comments_i);
        duration_sum += as_f64(row, duration_i);
        percentage_sum += as_f64(row, percentage_i);
    }

    let days = report.rows.len() as f64;
    if days > 0.0 {
        summary.avg_view_duration_secs = duration_sum / days;
        summary.avg_view_percentage = percentage_sum / days;
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report(rows: Vec<Vec<Value>>) -> AnalyticsReport {
        AnalyticsReport {
            column_headers: [
                "day",
                "views",
                "likes",
                "comments",
                "averageViewDuration",
                "averageViewPercentage",
            ]
            .iter()
            .map(|n| ColumnHeader { name: n.to_string() })
            .collect(),
            rows,
        }
    }

    #[test]
    fn summarize_totals_and_averages() {
        let summary = summarize_report(&report(vec![
            vec![json!("2026-08-01"), json!(100), json!(10), json!(2), json!(20.0), json!(80.0)],
            vec![json!("2026-08-02"), json!(50), json!(5), json!(1), json!(10.0), json!(40.0)],
        ]));

        assert_eq!(summary.views, 150);
        assert_eq!(summary.likes, 15);
        assert_eq!(summary.comments, 3);
        assert_eq!(summary.avg_view_duration_secs, 15.0);
        assert_eq!(summary.avg_view_percentage, 60.0);
    }

    #[test]
    fn summarize_empty_report_is_zero() {
        let summary = summarize_report(&report(vec![]));
        assert_eq!(summary, PerformanceSummary::default());
    }

    #[test]
    fn summarize_tolerates_missing_columns() {
        let partial = AnalyticsReport {
            column_headers: vec![
                ColumnHeader { name: "day".to_string() },
                ColumnHeader { name: "views".to_string() },
            ],
            rows: vec![vec![json!("2026-08-01"), json!(42)]],
        };
        let summary = summarize_report(&partial);
        assert_eq!(summary.views, 42);
        assert_eq!(summary.likes, 0);
    }
}
