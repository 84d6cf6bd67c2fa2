//! Store error types.

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Lease for video {video_id} is held by another run")]
    LeaseHeld { video_id: String },

    #[error("Invalid store document at {path}: {message}")]
    InvalidDocument { path: String, message: String },
}

impl StoreError {
    pub fn lease_held(video_id: impl Into<String>) -> Self {
        Self::LeaseHeld {
            video_id: video_id.into(),
        }
    }

    pub fn invalid_document(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            path: path.into(),
            message: message.into(),
        }
    }
}
