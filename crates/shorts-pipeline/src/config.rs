//! Pipeline configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Channels scanned by discovery when none are configured.
const DEFAULT_CHANNELS: &[&str] = &[
    "CNN",
    "BBC News",
    "Sky News",
    "Al Jazeera English",
    "DW News",
    "France 24 English",
    "ABC News",
    "NBC News",
    "The Guardian",
    "Reuters",
];

/// Relevance vocabulary for discovery filtering.
const DEFAULT_KEYWORDS: &[&str] = &[
    "breaking",
    "news",
    "crisis",
    "election",
    "economy",
    "war",
    "climate",
    "technology",
    "health",
    "politics",
];

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root directory for artifacts, run state, leases and templates
    pub data_dir: PathBuf,

    /// SQLite metrics database path
    pub db_path: PathBuf,

    /// Scratch directory for downloads and render intermediates
    pub work_dir: PathBuf,

    /// Source channels scanned by discovery
    pub channels: Vec<String>,

    /// Relevance keywords; a candidate must match at least one
    pub keywords: Vec<String>,

    /// Discovery lookback window in days
    pub lookback_days: i64,

    /// Per-channel result cap
    pub max_results: u32,

    /// Minimum view count for a discovery candidate
    pub min_view_count: u64,

    /// Hard cap on rendered clip duration in seconds
    pub max_clip_secs: f64,

    /// Offset into the source video where the clip starts
    pub clip_offset_secs: f64,

    /// Target narration duration in seconds
    pub target_duration_secs: f64,

    /// Speaking-rate model: narration characters per second
    pub chars_per_second: f64,

    /// Translation chunk ceiling in characters
    pub translation_chunk_chars: usize,

    /// Lease considered abandoned after this many seconds
    pub lease_stale_secs: u64,

    pub youtube_api_key: String,
    pub openai_api_key: String,
    pub elevenlabs_api_key: String,

    /// OAuth token file for upload and analytics
    pub oauth_token_path: PathBuf,
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Self {
            data_dir: env::var("SHORTS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            db_path: env::var("SHORTS_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/metrics.db")),
            work_dir: env::var("SHORTS_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("work")),
            channels: list_from_env("SHORTS_CHANNELS", DEFAULT_CHANNELS),
            keywords: list_from_env("SHORTS_KEYWORDS", DEFAULT_KEYWORDS),
            lookback_days: env_parse("SHORTS_LOOKBACK_DAYS", 1),
            max_results: env_parse("SHORTS_MAX_RESULTS", 10),
            min_view_count: env_parse("SHORTS_MIN_VIEW_COUNT", 5000),
            max_clip_secs: env_parse("SHORTS_MAX_CLIP_SECS", 60.0),
            clip_offset_secs: env_parse("SHORTS_CLIP_OFFSET_SECS", 0.0),
            target_duration_secs: env_parse("SHORTS_TARGET_DURATION_SECS", 30.0),
            chars_per_second: env_parse("SHORTS_CHARS_PER_SECOND", 4.0),
            translation_chunk_chars: env_parse("SHORTS_TRANSLATION_CHUNK_CHARS", 4000),
            lease_stale_secs: env_parse("SHORTS_LEASE_STALE_SECS", 3600),
            youtube_api_key: env::var("YOUTUBE_API_KEY").unwrap_or_default(),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            elevenlabs_api_key: env::var("ELEVENLABS_API_KEY").unwrap_or_default(),
            oauth_token_path: env::var("SHORTS_OAUTH_TOKEN_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/oauth_token.json")),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn list_from_env(key: &str, defaults: &[&str]) -> Vec<String> {
    env::var(key)
        .ok()
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .filter(|v: &Vec<String>| !v.is_empty())
        .unwrap_or_else(|| defaults.iter().map(|s| s.to_string()).collect())
}
