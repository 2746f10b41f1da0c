//! Pipeline orchestration
//!
//! This module provides the public API for quizsense: it wires the feature
//! aggregator, the classifier, the hybrid decider, and the recommendation
//! builder together and writes the per-user results back to the record store.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::{round4, FeatureAggregator};
use crate::classifier::{confidence_for, Classifier, FeatureRow, ModelMetadata};
use crate::decision::decide_final_label;
use crate::error::AnalysisError;
use crate::recommend::build_recommendations;
use crate::store::RecordStore;
use crate::types::{QuizAnalysis, RiskLabel, StoredAnalysis, UserAnalysis};

/// Description of the loaded model, for the model-info surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model: String,
    pub labels: Vec<RiskLabel>,
    pub num_features: Vec<String>,
    pub cat_features: Vec<String>,
}

/// Analysis engine holding the immutable classifier handle and its metadata.
///
/// Construct once at startup; a load failure there is fatal rather than a
/// silent degrade, since there is no rule-only fallback mode.
pub struct AnalysisEngine<C: Classifier> {
    classifier: C,
    metadata: ModelMetadata,
}

impl<C: Classifier> AnalysisEngine<C> {
    pub fn new(classifier: C, metadata: ModelMetadata) -> Self {
        Self {
            classifier,
            metadata,
        }
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Describe the loaded model and its trained feature schema
    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            model: self.classifier.name().to_string(),
            labels: self.metadata.labels.clone(),
            num_features: self.metadata.num_features.clone(),
            cat_features: self.metadata.cat_features.clone(),
        }
    }

    /// Analyze every user who answered a quiz.
    ///
    /// Fails with [`AnalysisError::QuizNotFound`] for an unknown quiz and
    /// [`AnalysisError::NoResponses`] when nobody answered, both before any
    /// per-user work. A user whose records disappeared between the distinct
    /// query and aggregation is skipped, not fatal. Each user's result is
    /// upserted into the store keyed by (user_id, quiz_id); re-running with
    /// unchanged records converges to the same stored documents.
    pub fn analyze_quiz(
        &self,
        store: &mut dyn RecordStore,
        quiz_id: i64,
    ) -> Result<QuizAnalysis, AnalysisError> {
        let quiz_title = store
            .quiz_title(quiz_id)?
            .ok_or(AnalysisError::QuizNotFound(quiz_id))?;

        let user_ids = store.user_ids_for_quiz(quiz_id)?;
        if user_ids.is_empty() {
            return Err(AnalysisError::NoResponses(quiz_id));
        }

        let mut results = Vec::new();

        for user_id in user_ids {
            let records = store.responses_for(quiz_id, &user_id)?;
            let Some(agg) = FeatureAggregator::aggregate(&records) else {
                continue;
            };

            let row = FeatureRow::from_vector(&agg.features, &self.metadata)?;
            let raw_label = self.classifier.predict(&row);
            let proba = self.classifier.predict_proba(&row);
            let raw_confidence = confidence_for(raw_label, self.classifier.classes(), &proba);

            // Rules see the exact confidence; rounding is for storage/reporting only
            let decision = decide_final_label(&agg.features, raw_label, raw_confidence);
            let recommendations = build_recommendations(decision.final_label, &agg.features);
            let recommendation = recommendations.join(" ");
            let confidence = round4(raw_confidence);

            store.upsert_analysis(StoredAnalysis {
                user_id: user_id.clone(),
                quiz_id,
                quiz_title: quiz_title.clone(),
                avg_stress_score: agg.summary.avg_stress_score,
                avg_time: agg.summary.avg_time,
                wrong_answers: agg.summary.wrong_answers,
                emotion_counts: agg.summary.emotion_counts.clone(),
                total_questions: agg.summary.total_questions,
                raw_model_label: raw_label,
                raw_model_confidence: confidence,
                model_label: decision.final_label,
                overridden_by_rules: decision.overridden_by_rules,
                recommendation: recommendation.clone(),
                recommendations: recommendations.clone(),
                analyzed_at: Utc::now(),
            })?;

            results.push(UserAnalysis {
                user_id,
                quiz_id,
                quiz_title: quiz_title.clone(),
                features: agg.features,
                raw_model_label: raw_label,
                model_label: decision.final_label,
                model_confidence: confidence,
                overridden_by_rules: decision.overridden_by_rules,
                recommendation,
                recommendations,
            });
        }

        Ok(QuizAnalysis {
            message: format!("Analysis completed for quiz {}", quiz_id),
            quiz_id,
            run_id: Uuid::new_v4(),
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, QuizDoc};
    use crate::types::{EmotionField, ResponseRecord};
    use pretty_assertions::assert_eq;

    /// Deterministic classifier: always predicts `label`, assigning it
    /// `confidence` and splitting the remainder over the other classes
    struct StubClassifier {
        classes: Vec<RiskLabel>,
        label: RiskLabel,
        confidence: f64,
    }

    impl StubClassifier {
        fn new(label: RiskLabel, confidence: f64) -> Self {
            Self {
                classes: vec![
                    RiskLabel::BalancedImprovementNeeded,
                    RiskLabel::HighContentGap,
                    RiskLabel::LowStressGoodProgress,
                ],
                label,
                confidence,
            }
        }
    }

    impl Classifier for StubClassifier {
        fn name(&self) -> &str {
            "stub"
        }

        fn classes(&self) -> &[RiskLabel] {
            &self.classes
        }

        fn predict_proba(&self, _row: &FeatureRow) -> Vec<f64> {
            let rest = (1.0 - self.confidence) / (self.classes.len() - 1) as f64;
            self.classes
                .iter()
                .map(|c| if *c == self.label { self.confidence } else { rest })
                .collect()
        }

        fn predict(&self, _row: &FeatureRow) -> RiskLabel {
            self.label
        }
    }

    fn make_record(
        quiz_id: i64,
        user_id: &str,
        question_id: i64,
        is_correct: bool,
        time_taken: f64,
        emotion: &str,
    ) -> ResponseRecord {
        ResponseRecord {
            quiz_id,
            user_id: user_id.to_string(),
            question_id,
            selected_answer: "A".to_string(),
            is_correct,
            topic: "algebra".to_string(),
            time_taken,
            dominant_emotion: Some(EmotionField::Name(emotion.to_string())),
            emotion_samples: None,
            timestamp: None,
        }
    }

    fn make_store(quiz_id: i64) -> MemoryStore {
        let mut store = MemoryStore::new();
        store.add_quiz(QuizDoc {
            quiz_id,
            title: "Algebra I".to_string(),
            question_count: Some(10),
        });
        store
    }

    fn engine(label: RiskLabel, confidence: f64) -> AnalysisEngine<StubClassifier> {
        AnalysisEngine::new(StubClassifier::new(label, confidence), ModelMetadata::default())
    }

    #[test]
    fn test_unknown_quiz_is_not_found() {
        let mut store = MemoryStore::new();
        let engine = engine(RiskLabel::BalancedImprovementNeeded, 0.9);

        let err = engine.analyze_quiz(&mut store, 7).unwrap_err();
        assert!(matches!(err, AnalysisError::QuizNotFound(7)));
    }

    #[test]
    fn test_quiz_without_responses_fails_before_user_work() {
        let mut store = make_store(1);
        let engine = engine(RiskLabel::BalancedImprovementNeeded, 0.9);

        let err = engine.analyze_quiz(&mut store, 1).unwrap_err();
        assert!(matches!(err, AnalysisError::NoResponses(1)));
        assert_eq!(store.analysis_count(), 0);
    }

    #[test]
    fn test_extreme_wrong_ratio_overrides_classifier() {
        // 10 records, 9 wrong, all fast: rule 1 fires whatever the model says
        let mut store = make_store(1);
        for q in 0..10 {
            store.add_response(make_record(1, "u-1", q, q == 0, 8.0, "neutral"));
        }
        let engine = engine(RiskLabel::LowStressGoodProgress, 0.99);

        let report = engine.analyze_quiz(&mut store, 1).unwrap();
        assert_eq!(report.results.len(), 1);
        let result = &report.results[0];
        assert_eq!(result.features.wrong_ratio, 0.9);
        assert_eq!(result.raw_model_label, RiskLabel::LowStressGoodProgress);
        assert_eq!(result.model_label, RiskLabel::HighContentGap);
        assert!(result.overridden_by_rules);
    }

    #[test]
    fn test_strong_performance_overrides_classifier() {
        // 10 records, 1 wrong, low stress, nothing slow
        let mut store = make_store(1);
        for q in 0..10 {
            store.add_response(make_record(1, "u-1", q, q != 0, 10.0, "neutral"));
        }
        let engine = engine(RiskLabel::BalancedImprovementNeeded, 0.9);

        let report = engine.analyze_quiz(&mut store, 1).unwrap();
        let result = &report.results[0];
        assert_eq!(result.features.wrong_ratio, 0.1);
        assert!(result.features.avg_stress < 2.0);
        assert_eq!(result.model_label, RiskLabel::LowStressGoodProgress);
        assert!(result.overridden_by_rules);
    }

    #[test]
    fn test_confident_prediction_passes_through() {
        // 4/10 wrong with some slow answers: no override rule matches
        let mut store = make_store(1);
        for q in 0..10 {
            store.add_response(make_record(1, "u-1", q, q >= 4, 14.0, "sad"));
        }
        let engine = engine(RiskLabel::BalancedImprovementNeeded, 0.9);

        let report = engine.analyze_quiz(&mut store, 1).unwrap();
        let result = &report.results[0];
        assert_eq!(result.model_label, RiskLabel::BalancedImprovementNeeded);
        assert!(!result.overridden_by_rules);
        assert_eq!(result.model_confidence, 0.9);
    }

    #[test]
    fn test_rule_four_sees_unrounded_confidence() {
        // 0.64997 rounds to 0.65 at 4 dp but is still below the confidence
        // threshold, so the middle-class fallback must fire
        let mut store = make_store(1);
        for q in 0..10 {
            store.add_response(make_record(1, "u-1", q, q >= 4, 14.0, "sad"));
        }
        let engine = engine(RiskLabel::BalancedImprovementNeeded, 0.64997);

        let report = engine.analyze_quiz(&mut store, 1).unwrap();
        let result = &report.results[0];
        assert_eq!(result.model_label, RiskLabel::BalancedImprovementNeeded);
        assert!(result.overridden_by_rules);
        assert_eq!(result.model_confidence, 0.65);
    }

    #[test]
    fn test_low_confidence_extreme_label_not_downgraded() {
        let mut store = make_store(1);
        for q in 0..10 {
            store.add_response(make_record(1, "u-1", q, q >= 4, 14.0, "sad"));
        }
        let engine = engine(RiskLabel::HighContentGap, 0.5);

        let report = engine.analyze_quiz(&mut store, 1).unwrap();
        let result = &report.results[0];
        assert_eq!(result.model_label, RiskLabel::HighContentGap);
        assert!(!result.overridden_by_rules);
    }

    #[test]
    fn test_results_written_back_per_user() {
        let mut store = make_store(1);
        for q in 0..5 {
            store.add_response(make_record(1, "u-1", q, true, 8.0, "happy"));
            store.add_response(make_record(1, "u-2", q, false, 20.0, "fear"));
        }
        let engine = engine(RiskLabel::BalancedImprovementNeeded, 0.9);

        let report = engine.analyze_quiz(&mut store, 1).unwrap();
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.message, "Analysis completed for quiz 1");
        assert_eq!(store.analysis_count(), 2);

        let stored_analyses = store.analyses_for_user("u-2").unwrap();
        let stored = &stored_analyses[0];
        let reported = report.results.iter().find(|r| r.user_id == "u-2").unwrap();
        assert_eq!(stored.model_label, reported.model_label);
        assert_eq!(stored.quiz_title, "Algebra I");
        assert_eq!(stored.recommendations, reported.recommendations);
        assert_eq!(stored.recommendation, reported.recommendations.join(" "));
        assert_eq!(stored.total_questions, 5);
    }

    #[test]
    fn test_reanalysis_is_idempotent() {
        let mut store = make_store(1);
        for q in 0..10 {
            store.add_response(make_record(1, "u-1", q, q % 3 == 0, 12.0, "neutral"));
        }
        let engine = engine(RiskLabel::BalancedImprovementNeeded, 0.8);

        let first = engine.analyze_quiz(&mut store, 1).unwrap();
        let second = engine.analyze_quiz(&mut store, 1).unwrap();

        assert_eq!(store.analysis_count(), 1);
        let a = &first.results[0];
        let b = &second.results[0];
        assert_eq!(a.model_label, b.model_label);
        assert_eq!(a.model_confidence, b.model_confidence);
        assert_eq!(a.recommendations, b.recommendations);
        assert_eq!(a.features, b.features);
    }

    #[test]
    fn test_user_with_no_records_is_skipped() {
        /// Store that lists a user the response query knows nothing about
        struct GhostStore {
            inner: MemoryStore,
        }

        impl RecordStore for GhostStore {
            fn quiz_title(&self, quiz_id: i64) -> Result<Option<String>, AnalysisError> {
                self.inner.quiz_title(quiz_id)
            }

            fn user_ids_for_quiz(&self, quiz_id: i64) -> Result<Vec<String>, AnalysisError> {
                let mut ids = self.inner.user_ids_for_quiz(quiz_id)?;
                ids.push("ghost".to_string());
                Ok(ids)
            }

            fn responses_for(
                &self,
                quiz_id: i64,
                user_id: &str,
            ) -> Result<Vec<ResponseRecord>, AnalysisError> {
                self.inner.responses_for(quiz_id, user_id)
            }

            fn upsert_analysis(&mut self, analysis: StoredAnalysis) -> Result<(), AnalysisError> {
                self.inner.upsert_analysis(analysis)
            }

            fn analyses_for_user(
                &self,
                user_id: &str,
            ) -> Result<Vec<StoredAnalysis>, AnalysisError> {
                self.inner.analyses_for_user(user_id)
            }
        }

        let mut inner = make_store(1);
        for q in 0..5 {
            inner.add_response(make_record(1, "u-1", q, true, 8.0, "neutral"));
        }
        let mut store = GhostStore { inner };
        let engine = engine(RiskLabel::BalancedImprovementNeeded, 0.9);

        let report = engine.analyze_quiz(&mut store, 1).unwrap();
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].user_id, "u-1");
    }

    #[test]
    fn test_model_info_reflects_metadata() {
        let engine = engine(RiskLabel::BalancedImprovementNeeded, 0.9);
        let info = engine.model_info();

        assert_eq!(info.model, "stub");
        assert_eq!(info.labels.len(), 3);
        assert_eq!(info.num_features.len(), 5);
        assert_eq!(info.cat_features, vec!["dominant_emotion"]);
    }
}
