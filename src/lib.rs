//! Quizsense - quiz-session stress analysis engine
//!
//! Quizsense turns raw per-question response records into study guidance
//! through a deterministic pipeline: feature aggregation → classifier
//! prediction → hybrid rule decision → tailored recommendations → write-back.
//!
//! ## Modules
//!
//! - **aggregate**: Reduce (quiz, user) response records to a feature vector
//! - **decision**: Combine the classifier's label with override rules
//! - **recommend**: Expand the final label into recommendation lines
//! - **classifier**: Consume the trained model artifact and its metadata
//! - **store**: Abstract record store plus an in-memory implementation
//! - **pipeline**: Batch analysis of every user who answered a quiz

pub mod aggregate;
pub mod classifier;
pub mod decision;
pub mod emotion;
pub mod error;
pub mod pipeline;
pub mod recommend;
pub mod store;
pub mod types;

pub use aggregate::{Aggregation, FeatureAggregator};
pub use classifier::{Classifier, FeatureRow, LogisticModel, ModelMetadata};
pub use decision::decide_final_label;
pub use error::AnalysisError;
pub use pipeline::{AnalysisEngine, ModelInfo};
pub use recommend::build_recommendations;
pub use store::{MemoryStore, RecordStore};
pub use types::{
    Decision, FeatureVector, QuizAnalysis, QuizSummary, ResponseRecord, RiskLabel,
    StoredAnalysis, UserAnalysis,
};

/// Engine version embedded in exported reports
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for exported reports
pub const PRODUCER_NAME: &str = "quizsense";
