//! Classifier adapter
//!
//! The trained model is consumed, never trained, here. `ModelMetadata`
//! describes the feature row the artifact was trained with; the [`Classifier`]
//! trait is the seam that keeps decision and recommendation logic testable
//! without a real artifact. [`LogisticModel`] scores the shipped multinomial
//! logistic-regression artifact from its JSON export.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::AnalysisError;
use crate::types::{FeatureVector, RiskLabel};

fn default_labels() -> Vec<RiskLabel> {
    vec![
        RiskLabel::BalancedImprovementNeeded,
        RiskLabel::HighContentGap,
        RiskLabel::LowStressGoodProgress,
    ]
}

fn default_num_features() -> Vec<String> {
    [
        "avg_stress",
        "wrong_ratio",
        "avg_time",
        "time_over_15_ratio",
        "neg_emotion_ratio",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_cat_features() -> Vec<String> {
    vec!["dominant_emotion".to_string()]
}

/// Training metadata shipped next to the model artifact.
///
/// Supplies the label set and the feature names/ordering the model was
/// trained with; fields missing from the JSON fall back to the defaults the
/// artifact has always used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    #[serde(default = "default_labels")]
    pub labels: Vec<RiskLabel>,
    #[serde(default = "default_num_features")]
    pub num_features: Vec<String>,
    #[serde(default = "default_cat_features")]
    pub cat_features: Vec<String>,
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            labels: default_labels(),
            num_features: default_num_features(),
            cat_features: default_cat_features(),
        }
    }
}

impl ModelMetadata {
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        let json = fs::read_to_string(path).map_err(|e| {
            AnalysisError::ClassifierUnavailable(format!(
                "cannot read metadata {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&json)
    }
}

/// One scoring row: numeric features in training order plus the categorical
/// dominant emotion
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub numeric: Vec<f64>,
    pub dominant_emotion: String,
}

impl FeatureRow {
    /// Build a row from a feature vector using the metadata's feature order
    pub fn from_vector(
        features: &FeatureVector,
        metadata: &ModelMetadata,
    ) -> Result<Self, AnalysisError> {
        let mut numeric = Vec::with_capacity(metadata.num_features.len());
        for name in &metadata.num_features {
            let value = features
                .numeric(name)
                .ok_or_else(|| AnalysisError::UnknownFeature(name.clone()))?;
            numeric.push(value);
        }

        for name in &metadata.cat_features {
            if name != "dominant_emotion" {
                return Err(AnalysisError::UnknownFeature(name.clone()));
            }
        }

        Ok(Self {
            numeric,
            dominant_emotion: features.dominant_emotion.clone(),
        })
    }
}

/// Black-box classifier over fixed feature rows
pub trait Classifier {
    /// Short human-readable description of the underlying model
    fn name(&self) -> &str;

    /// Known classes, in the order `predict_proba` reports them
    fn classes(&self) -> &[RiskLabel];

    /// Probability per class, aligned with `classes()`
    fn predict_proba(&self, row: &FeatureRow) -> Vec<f64>;

    /// Predicted label for the row
    fn predict(&self, row: &FeatureRow) -> RiskLabel;
}

/// Probability the classifier assigned to its own predicted label.
///
/// Maps the predicted label back into the class order; if the label is not
/// among the known classes the maximum probability is used instead.
pub fn confidence_for(raw_label: RiskLabel, classes: &[RiskLabel], proba: &[f64]) -> f64 {
    match classes.iter().position(|c| *c == raw_label) {
        Some(index) => proba.get(index).copied().unwrap_or(0.0),
        None => proba.iter().copied().fold(0.0, f64::max),
    }
}

/// Multinomial logistic-regression scorer loaded from a JSON artifact.
///
/// Mirrors the training pipeline: numeric features are standardized with the
/// stored means/scales, the dominant emotion is one-hot encoded over the
/// trained categories (unknown categories encode to all zeros), then a linear
/// decision function per class goes through softmax.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    classes: Vec<RiskLabel>,
    /// Standardization means, one per numeric feature
    feature_means: Vec<f64>,
    /// Standardization scales, one per numeric feature
    feature_scales: Vec<f64>,
    /// One-hot categories for dominant_emotion, in training column order
    emotion_categories: Vec<String>,
    /// Per-class coefficient rows over [numeric..., one_hot...]
    coefficients: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
}

impl LogisticModel {
    /// Parse and validate an artifact from JSON
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        let model: LogisticModel = serde_json::from_str(json)
            .map_err(|e| AnalysisError::ClassifierUnavailable(format!("bad artifact: {}", e)))?;
        model.validate()?;
        Ok(model)
    }

    /// Load an artifact from disk. Failure here is fatal for the service:
    /// there is no rule-only fallback mode.
    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        let json = fs::read_to_string(path).map_err(|e| {
            AnalysisError::ClassifierUnavailable(format!(
                "cannot read artifact {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<(), AnalysisError> {
        let classes = self.classes.len();
        let columns = self.feature_means.len() + self.emotion_categories.len();

        if classes == 0 {
            return Err(AnalysisError::ClassifierUnavailable(
                "artifact declares no classes".to_string(),
            ));
        }
        if self.feature_scales.len() != self.feature_means.len() {
            return Err(AnalysisError::ClassifierUnavailable(
                "feature_scales length does not match feature_means".to_string(),
            ));
        }
        if self.feature_scales.iter().any(|s| *s <= 0.0) {
            return Err(AnalysisError::ClassifierUnavailable(
                "feature_scales must be positive".to_string(),
            ));
        }
        if self.intercepts.len() != classes || self.coefficients.len() != classes {
            return Err(AnalysisError::ClassifierUnavailable(
                "coefficient rows do not match class count".to_string(),
            ));
        }
        if self.coefficients.iter().any(|row| row.len() != columns) {
            return Err(AnalysisError::ClassifierUnavailable(
                "coefficient row width does not match feature columns".to_string(),
            ));
        }
        Ok(())
    }

    /// Standardized numeric columns followed by the emotion one-hot columns
    fn expand(&self, row: &FeatureRow) -> Vec<f64> {
        let mut columns =
            Vec::with_capacity(self.feature_means.len() + self.emotion_categories.len());

        for (i, value) in row.numeric.iter().enumerate() {
            let mean = self.feature_means.get(i).copied().unwrap_or(0.0);
            let scale = self.feature_scales.get(i).copied().unwrap_or(1.0);
            columns.push((value - mean) / scale);
        }

        for category in &self.emotion_categories {
            columns.push(if *category == row.dominant_emotion {
                1.0
            } else {
                0.0
            });
        }

        columns
    }

    fn decision_scores(&self, row: &FeatureRow) -> Vec<f64> {
        let columns = self.expand(row);
        self.coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(coeffs, intercept)| {
                intercept
                    + coeffs
                        .iter()
                        .zip(&columns)
                        .map(|(c, x)| c * x)
                        .sum::<f64>()
            })
            .collect()
    }
}

impl Classifier for LogisticModel {
    fn name(&self) -> &str {
        "multinomial logistic regression"
    }

    fn classes(&self) -> &[RiskLabel] {
        &self.classes
    }

    fn predict_proba(&self, row: &FeatureRow) -> Vec<f64> {
        let scores = self.decision_scores(row);
        softmax(&scores)
    }

    fn predict(&self, row: &FeatureRow) -> RiskLabel {
        let proba = self.predict_proba(row);
        self.classes
            .iter()
            .zip(proba)
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(label, _)| *label)
            // validate() guarantees at least one class
            .unwrap_or(RiskLabel::BalancedImprovementNeeded)
    }
}

/// Numerically stable softmax
fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    if sum > 0.0 {
        exps.iter().map(|e| e / sum).collect()
    } else {
        vec![0.0; scores.len()]
    }
}
