//! Pipeline error taxonomy.
//!
//! Every failure a stage can surface maps to one of five categories:
//! an unreachable upstream service, structurally absent input data, a
//! generative reply that fails schema validation, a missing local
//! resource, or a rejected template proposal. Infrastructure errors
//! from the stores and the media toolchain wrap through transparently.

use thiserror::Error;

use shorts_media::MediaError;
use shorts_metrics::MetricsError;
use shorts_models::{Stage, TemplateError};
use shorts_services::ServiceError;
use shorts_store::StoreError;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("[{stage}] upstream service unavailable: {message}")]
    UpstreamUnavailable { stage: Stage, message: String },

    #[error("[{stage}] no usable data: {message}")]
    NoUsableData { stage: Stage, message: String },

    #[error("[{stage}] malformed generation output: {message}")]
    MalformedGeneration { stage: Stage, message: String },

    #[error("resource exhausted: {0}")]
    ResourceExhaustion(String),

    #[error("template proposal rejected: {0}")]
    TemplateProposalRejected(#[from] TemplateError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error(transparent)]
    Media(#[from] MediaError),
}

impl PipelineError {
    pub fn upstream(stage: Stage, message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            stage,
            message: message.into(),
        }
    }

    pub fn no_usable_data(stage: Stage, message: impl Into<String>) -> Self {
        Self::NoUsableData {
            stage,
            message: message.into(),
        }
    }

    pub fn malformed(stage: Stage, message: impl Into<String>) -> Self {
        Self::MalformedGeneration {
            stage,
            message: message.into(),
        }
    }

    /// Classify a service client failure for a stage. Schema problems
    /// are generation defects; everything else is an upstream fault.
    pub fn from_service(stage: Stage, error: ServiceError) -> Self {
        match error {
            ServiceError::MalformedResponse { .. } | ServiceError::Json(_) => {
                Self::malformed(stage, error.to_string())
            }
            other => Self::upstream(stage, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_classification() {
        let malformed = PipelineError::from_service(
            Stage::Scripting,
            ServiceError::malformed("openai", "missing field"),
        );
        assert!(matches!(
            malformed,
            PipelineError::MalformedGeneration { .. }
        ));

        let upstream =
            PipelineError::from_service(Stage::Discovery, ServiceError::api_status("youtube", 503, ""));
        assert!(matches!(upstream, PipelineError::UpstreamUnavailable { .. }));
    }
}
