//! SQLite-backed metrics store.

use std::path::Path;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::error::MetricsResult;
use shorts_models::{FeedbackRecord, PerformanceSample, TemplateChangeRecord, VideoMetadataRecord};

/// Durable store for published-video metadata, performance, feedback and
/// template changes.
#[derive(Debug, Clone)]
pub struct MetricsStore {
    pool: SqlitePool,
}

impl MetricsStore {
    /// Open (creating if needed) the store at the given file path.
    pub async fn open(db_path: &Path) -> MetricsResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        info!("Opened metrics store at {}", db_path.display());
        Ok(store)
    }

    /// Open an in-memory store (tests).
    pub async fn open_in_memory() -> MetricsResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create tables if missing. Idempotent.
    async fn init_schema(&self) -> MetricsResult<()> {
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&self.pool)
            .await?;
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS videos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                video_id TEXT UNIQUE NOT NULL,
                title TEXT NOT NULL,
                upload_time TEXT NOT NULL,
                hook_style TEXT NOT NULL,
                summary_length INTEGER NOT NULL,
                background_included BOOLEAN NOT NULL,
                subtitle_size TEXT NOT NULL,
                subtitle_speed TEXT NOT NULL,
                video_length INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS performance (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                video_id TEXT NOT NULL,
                period TEXT NOT NULL,
                views INTEGER NOT NULL,
                likes INTEGER NOT NULL,
                comments INTEGER NOT NULL,
                avg_view_duration REAL NOT NULL,
                avg_view_percentage REAL NOT NULL,
                collection_time TEXT NOT NULL,
                FOREIGN KEY (video_id) REFERENCES videos (video_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feedback (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                video_id TEXT NOT NULL,
                hook_feedback TEXT NOT NULL,
                summary_feedback TEXT NOT NULL,
                subtitle_feedback TEXT NOT NULL,
                length_feedback TEXT NOT NULL,
                overall_score INTEGER NOT NULL,
                generation_time TEXT NOT NULL,
                FOREIGN KEY (video_id) REFERENCES videos (video_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS template_changes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                change_type TEXT NOT NULL,
                old_value TEXT NOT NULL,
                new_value TEXT NOT NULL,
                reason TEXT NOT NULL,
                change_time TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert the metadata record written once at publish time.
    ///
    /// A duplicate published id is a caller bug and surfaces as a database
    /// error from the UNIQUE constraint.
    pub async fn insert_video_metadata(&self, record: &VideoMetadataRecord) -> MetricsResult<()> {
        sqlx::query(
            r#"
            INSERT INTO videos (
                video_id, title, upload_time, hook_style, summary_length,
                background_included, subtitle_size, subtitle_speed, video_length
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.video_id)
        .bind(&record.title)
        .bind(record.upload_time.to_rfc3339())
        .bind(&record.hook_style)
        .bind(record.summary_length as i64)
        .bind(record.background_included)
        .bind(&record.subtitle_size)
        .bind(&record.subtitle_speed)
        .bind(record.video_length as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch the metadata record for a published video.
    pub async fn get_video_metadata(
        &self,
        video_id: &str,
    ) -> MetricsResult<Option<VideoMetadataRecord>> {
        let row = sqlx::query(
            r#"
            SELECT video_id, title, upload_time, hook_style, summary_length,
                   background_included, subtitle_size, subtitle_speed, video_length
            FROM videos WHERE video_id = ?
            "#,
        )
        .bind(video_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(VideoMetadataRecord {
                video_id: row.try_get("video_id")?,
                title: row.try_get("title")?,
                upload_time: parse_time(row.try_get("upload_time")?),
                hook_style: row.try_get("hook_style")?,
                summary_length: row.try_get::<i64, _>("summary_length")? as u32,
                background_included: row.try_get("background_included")?,
                subtitle_size: row.try_get("subtitle_size")?,
                subtitle_speed: row.try_get("subtitle_speed")?,
                video_length: row.try_get::<i64, _>("video_length")? as u32,
            })
        })
        .transpose()
    }

    /// Append one performance sample row.
    pub async fn insert_performance_sample(&self, sample: &PerformanceSample) -> MetricsResult<()> {
        sqlx::query(
            r#"
            INSERT INTO performance (
                video_id, period, views, likes, comments,
                avg_view_duration, avg_view_percentage, collection_time
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&sample.video_id)
        .bind(&sample.period_label)
        .bind(sample.views as i64)
        .bind(sample.likes as i64)
        .bind(sample.comments as i64)
        .bind(sample.avg_view_duration)
        .bind(sample.avg_view_percentage)
        .bind(sample.collected_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All performance samples for a published video, oldest first.
    pub async fn performance_for(&self, video_id: &str) -> MetricsResult<Vec<PerformanceSample>> {
        let rows = sqlx::query(
            r#"
            SELECT video_id, period, views, likes, comments,
                   avg_view_duration, avg_view_percentage, collection_time
            FROM performance WHERE video_id = ? ORDER BY id
            "#,
        )
        .bind(video_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(PerformanceSample {
                    video_id: row.try_get("video_id")?,
                    period_label: row.try_get("period")?,
                    views: row.try_get::<i64, _>("views")? as u64,
                    likes: row.try_get::<i64, _>("likes")? as u64,
                    comments: row.try_get::<i64, _>("comments")? as u64,
                    avg_view_duration: row.try_get("avg_view_duration")?,
                    avg_view_percentage: row.try_get("avg_view_percentage")?,
                    collected_at: parse_time(row.try_get("collection_time")?),
                })
            })
            .collect()
    }

    /// Append one feedback row.
    pub async fn insert_feedback(&self, record: &FeedbackRecord) -> MetricsResult<()> {
        sqlx::query(
            r#"
            INSERT INTO feedback (
                video_id, hook_feedback, summary_feedback, subtitle_feedback,
                length_feedback, overall_score, generation_time
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.video_id)
        .bind(&record.hook_feedback)
        .bind(&record.summary_feedback)
        .bind(&record.subtitle_feedback)
        .bind(&record.length_feedback)
        .bind(record.overall_score as i64)
        .bind(record.generated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The most recent feedback rows, newest first.
    pub async fn recent_feedback(&self, limit: u32) -> MetricsResult<Vec<FeedbackRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT video_id, hook_feedback, summary_feedback, subtitle_feedback,
                   length_feedback, overall_score, generation_time
            FROM feedback ORDER BY id DESC LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(FeedbackRecord {
                    video_id: row.try_get("video_id")?,
                    hook_feedback: row.try_get("hook_feedback")?,
                    summary_feedback: row.try_get("summary_feedback")?,
                    subtitle_feedback: row.try_get("subtitle_feedback")?,
                    length_feedback: row.try_get("length_feedback")?,
                    overall_score: row.try_get::<i64, _>("overall_score")? as u8,
                    generated_at: parse_time(row.try_get("generation_time")?),
                })
            })
            .collect()
    }

    /// Append one template change audit row.
    pub async fn insert_template_change(&self, change: &TemplateChangeRecord) -> MetricsResult<()> {
        sqlx::query(
            r#"
            INSERT INTO template_changes (change_type, old_value, new_value, reason, change_time)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&change.change_type)
        .bind(&change.old_value)
        .bind(&change.new_value)
        .bind(&change.reason)
        .bind(change.changed_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All template change rows, oldest first.
    pub async fn template_changes(&self) -> MetricsResult<Vec<TemplateChangeRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT change_type, old_value, new_value, reason, change_time
            FROM template_changes ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(TemplateChangeRecord {
                    change_type: row.try_get("change_type")?,
                    old_value: row.try_get("old_value")?,
                    new_value: row.try_get("new_value")?,
                    reason: row.try_get("reason")?,
                    changed_at: parse_time(row.try_get("change_time")?),
                })
            })
            .collect()
    }
}

/// Parse an RFC 3339 timestamp column; rows are written by this store so
/// a malformed value falls back to the epoch rather than failing a read.
fn parse_time(raw: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(id: &str) -> VideoMetadataRecord {
        VideoMetadataRecord {
            video_id: id.to_string(),
            title: "🔥 금리 인상 단독 보도".to_string(),
            upload_time: Utc::now(),
            hook_style: "question".to_string(),
            summary_length: 42,
            background_included: true,
            subtitle_size: "medium".to_string(),
            subtitle_speed: "normal".to_string(),
            video_length: 30,
        }
    }

    fn sample(id: &str, period: &str) -> PerformanceSample {
        PerformanceSample {
            video_id: id.to_string(),
            period_label: period.to_string(),
            views: 1000,
            likes: 50,
            comments: 10,
            avg_view_duration: 18.5,
            avg_view_percentage: 62.0,
            collected_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_video_metadata_round_trip() {
        let store = MetricsStore::open_in_memory().await.unwrap();
        let record = metadata("up1");

        store.insert_video_metadata(&record).await.unwrap();

        let loaded = store.get_video_metadata("up1").await.unwrap().unwrap();
        assert_eq!(loaded.video_id, record.video_id);
        assert_eq!(loaded.hook_style, "question");
        assert_eq!(loaded.summary_length, 42);
        assert!(loaded.background_included);
    }

    #[tokio::test]
    async fn test_duplicate_metadata_rejected() {
        let store = MetricsStore::open_in_memory().await.unwrap();
        store.insert_video_metadata(&metadata("up1")).await.unwrap();

        assert!(store.insert_video_metadata(&metadata("up1")).await.is_err());
    }

    #[tokio::test]
    async fn test_performance_rows_append() {
        let store = MetricsStore::open_in_memory().await.unwrap();
        store.insert_video_metadata(&metadata("up1")).await.unwrap();

        // The same (video, period) collected twice yields two rows.
        store.insert_performance_sample(&sample("up1", "24h")).await.unwrap();
        store.insert_performance_sample(&sample("up1", "24h")).await.unwrap();
        store.insert_performance_sample(&sample("up1", "72h")).await.unwrap();

        let rows = store.performance_for("up1").await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].period_label, "24h");
        assert_eq!(rows[2].period_label, "72h");
    }

    #[tokio::test]
    async fn test_recent_feedback_ordering() {
        let store = MetricsStore::open_in_memory().await.unwrap();
        store.insert_video_metadata(&metadata("up1")).await.unwrap();

        for score in 1..=4u8 {
            store
                .insert_feedback(&FeedbackRecord {
                    video_id: "up1".to_string(),
                    hook_feedback: format!("hook {score}"),
                    summary_feedback: "summary".to_string(),
                    subtitle_feedback: "subtitle".to_string(),
                    length_feedback: "length".to_string(),
                    overall_score: score,
                    generated_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        let recent = store.recent_feedback(3).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].overall_score, 4);
        assert_eq!(recent[2].overall_score, 2);
    }

    #[tokio::test]
    async fn test_template_change_log() {
        let store = MetricsStore::open_in_memory().await.unwrap();

        store
            .insert_template_change(&TemplateChangeRecord {
                change_type: "transition".to_string(),
                old_value: "[\"a\"]".to_string(),
                new_value: "[\"b\"]".to_string(),
                reason: "viewers drop off during long transitions".to_string(),
                changed_at: Utc::now(),
            })
            .await
            .unwrap();

        let changes = store.template_changes().await.unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_type, "transition");
    }
}
