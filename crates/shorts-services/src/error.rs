//! Service client error types.

use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned {status}: {body}")]
    ApiStatus {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Malformed response from {service}: {message}")]
    MalformedResponse {
        service: &'static str,
        message: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    pub fn api_status(service: &'static str, status: u16, body: impl Into<String>) -> Self {
        Self::ApiStatus {
            service,
            status,
            body: body.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    pub fn malformed(service: &'static str, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            service,
            message: message.into(),
        }
    }
}
