//! Error types for quizsense

use thiserror::Error;

/// Errors that can occur during quiz analysis
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Quiz not found: {0}")]
    QuizNotFound(i64),

    #[error("No responses found for quiz {0}")]
    NoResponses(i64),

    #[error("Classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    #[error("Feature '{0}' is not part of the feature vector")]
    UnknownFeature(String),

    #[error("Unknown risk label: {0}")]
    UnknownLabel(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    StoreError(String),
}
