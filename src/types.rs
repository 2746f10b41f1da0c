//! Core types for the quizsense analysis pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw response records, derived feature vectors, decisions, and the
//! persisted/reported analysis shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::emotion::EmotionReading;
use crate::error::AnalysisError;

/// Closed set of final/raw analysis labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLabel {
    HighContentGap,
    BalancedImprovementNeeded,
    LowStressGoodProgress,
}

impl RiskLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::HighContentGap => "HIGH_CONTENT_GAP",
            RiskLabel::BalancedImprovementNeeded => "BALANCED_IMPROVEMENT_NEEDED",
            RiskLabel::LowStressGoodProgress => "LOW_STRESS_GOOD_PROGRESS",
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLabel {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HIGH_CONTENT_GAP" => Ok(RiskLabel::HighContentGap),
            "BALANCED_IMPROVEMENT_NEEDED" => Ok(RiskLabel::BalancedImprovementNeeded),
            "LOW_STRESS_GOOD_PROGRESS" => Ok(RiskLabel::LowStressGoodProgress),
            other => Err(AnalysisError::UnknownLabel(other.to_string())),
        }
    }
}

/// Dominant-emotion field as it appears on stored response records.
///
/// Producers wrote either a bare string (`"sad"`) or a structured reading
/// (`{"emotion": "sad", "confidence": 0.83}`). Anything else degrades to
/// neutral at resolution time rather than failing aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmotionField {
    Reading(EmotionReading),
    Name(String),
    Other(serde_json::Value),
}

impl EmotionField {
    /// Resolve to a single lowercase emotion name, defaulting to "neutral"
    pub fn resolve(&self) -> String {
        let name = match self {
            EmotionField::Reading(reading) => reading.emotion.as_str(),
            EmotionField::Name(name) => name.as_str(),
            EmotionField::Other(_) => "",
        };
        if name.is_empty() {
            "neutral".to_string()
        } else {
            name.to_lowercase()
        }
    }
}

/// One question attempt by one user. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub quiz_id: i64,
    pub user_id: String,
    pub question_id: i64,
    pub selected_answer: String,
    #[serde(default)]
    pub is_correct: bool,
    pub topic: String,
    /// Time taken to answer, in seconds
    #[serde(default)]
    pub time_taken: f64,
    /// Dominant emotion observed while answering (string or structured form)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dominant_emotion: Option<EmotionField>,
    /// Number of camera samples behind the dominant emotion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion_samples: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ResponseRecord {
    /// Lowercase dominant emotion for this record, "neutral" when absent or malformed
    pub fn resolved_emotion(&self) -> String {
        self.dominant_emotion
            .as_ref()
            .map(|field| field.resolve())
            .unwrap_or_else(|| "neutral".to_string())
    }
}

/// Fixed-schema feature vector derived per (quiz, user).
///
/// Ephemeral: recomputed on every analysis run, never persisted standalone.
/// All figures are rounded to 4 decimal places (half away from zero).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub avg_stress: f64,
    /// Wrong answers / total attempts, in [0, 1]
    pub wrong_ratio: f64,
    /// Mean seconds per question
    pub avg_time: f64,
    /// Attempts over 15 seconds / total attempts, in [0, 1]
    pub time_over_15_ratio: f64,
    /// Attempts with a negative dominant emotion / total attempts, in [0, 1]
    pub neg_emotion_ratio: f64,
    /// Most frequent emotion across the attempts
    pub dominant_emotion: String,
}

impl FeatureVector {
    /// Look up a numeric feature by its trained name
    pub fn numeric(&self, name: &str) -> Option<f64> {
        match name {
            "avg_stress" => Some(self.avg_stress),
            "wrong_ratio" => Some(self.wrong_ratio),
            "avg_time" => Some(self.avg_time),
            "time_over_15_ratio" => Some(self.time_over_15_ratio),
            "neg_emotion_ratio" => Some(self.neg_emotion_ratio),
            _ => None,
        }
    }
}

/// Human-readable aggregation summary, persisted alongside the final label
/// for audit and debugging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSummary {
    pub avg_stress_score: f64,
    pub avg_time: f64,
    pub wrong_answers: u32,
    pub emotion_counts: BTreeMap<String, u32>,
    pub total_questions: u32,
}

/// Outcome of the hybrid decider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub final_label: RiskLabel,
    pub overridden_by_rules: bool,
}

/// Persisted per-(user, quiz) analysis document. Upsert semantics: the last
/// analysis run wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAnalysis {
    pub user_id: String,
    pub quiz_id: i64,
    pub quiz_title: String,
    pub avg_stress_score: f64,
    pub avg_time: f64,
    pub wrong_answers: u32,
    pub emotion_counts: BTreeMap<String, u32>,
    pub total_questions: u32,
    pub raw_model_label: RiskLabel,
    pub raw_model_confidence: f64,
    /// Final label after rule overrides (what the UI shows)
    pub model_label: RiskLabel,
    pub overridden_by_rules: bool,
    /// All recommendation lines joined with a single space
    pub recommendation: String,
    pub recommendations: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}

/// Per-user analysis result as reported to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAnalysis {
    pub user_id: String,
    pub quiz_id: i64,
    pub quiz_title: String,
    pub features: FeatureVector,
    pub raw_model_label: RiskLabel,
    pub model_label: RiskLabel,
    /// Probability the classifier assigned to its own raw label, 4 dp
    pub model_confidence: f64,
    pub overridden_by_rules: bool,
    pub recommendation: String,
    pub recommendations: Vec<String>,
}

/// Batch analysis report for one quiz
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAnalysis {
    pub message: String,
    pub quiz_id: i64,
    /// Identifier for this analysis run (provenance in exported reports)
    pub run_id: Uuid,
    pub results: Vec<UserAnalysis>,
}
