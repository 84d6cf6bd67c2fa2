//! Metrics store error types.

use thiserror::Error;

pub type MetricsResult<T> = Result<T, MetricsError>;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("No metadata record for published video {0}")]
    UnknownVideo(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
