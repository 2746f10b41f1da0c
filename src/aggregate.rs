//! Feature aggregation
//!
//! Reduces the raw response records of one (quiz, user) pair into the fixed
//! feature vector consumed by the classifier and the decision rules, plus a
//! human-readable summary persisted for audit.

use std::collections::BTreeMap;

use crate::types::{FeatureVector, QuizSummary, ResponseRecord};

/// Answers slower than this count as "long" and add time pressure to stress
pub const LONG_ANSWER_THRESHOLD_SEC: f64 = 15.0;

/// Emotions that count toward the negative-emotion ratio
pub const NEGATIVE_EMOTIONS: [&str; 4] = ["sad", "angry", "fear", "disgust"];

/// Base stress weight per emotion. Unlisted emotions weigh 1.
fn emotion_weight(emotion: &str) -> f64 {
    match emotion {
        "neutral" => 1.0,
        "happy" => 0.0,
        "sad" => 3.0,
        "angry" => 4.0,
        "fear" => 5.0,
        "surprise" => 0.0,
        "disgust" => 4.0,
        _ => 1.0,
    }
}

fn is_negative(emotion: &str) -> bool {
    NEGATIVE_EMOTIONS.contains(&emotion)
}

/// Round to 4 decimal places, half away from zero
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Feature vector plus its audit summary for one (quiz, user) pair
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub features: FeatureVector,
    pub summary: QuizSummary,
}

/// Aggregator for per-(quiz, user) response records
pub struct FeatureAggregator;

impl FeatureAggregator {
    /// Aggregate response records into features and a summary.
    ///
    /// Returns `None` for an empty record set: with zero attempts the ratios
    /// are undefined, so callers skip the user instead of analyzing them.
    pub fn aggregate(records: &[ResponseRecord]) -> Option<Aggregation> {
        if records.is_empty() {
            return None;
        }

        let total = records.len();
        let mut wrong = 0u32;
        let mut total_time = 0.0;
        let mut over_threshold = 0usize;
        let mut negative = 0usize;
        let mut emotion_counts: BTreeMap<String, u32> = BTreeMap::new();
        let mut stress_total = 0.0;

        for record in records {
            let emotion = record.resolved_emotion();
            let long_answer = record.time_taken > LONG_ANSWER_THRESHOLD_SEC;

            total_time += record.time_taken;
            if long_answer {
                over_threshold += 1;
            }
            if !record.is_correct {
                wrong += 1;
            }
            if is_negative(&emotion) {
                negative += 1;
            }

            // Per-record stress: emotion base + 0.5 for a long answer + 1 for a miss
            let mut stress = emotion_weight(&emotion);
            if long_answer {
                stress += 0.5;
            }
            if !record.is_correct {
                stress += 1.0;
            }
            stress_total += stress;

            *emotion_counts.entry(emotion).or_insert(0) += 1;
        }

        let total_f = total as f64;
        let avg_stress = round4(stress_total / total_f);
        let avg_time = round4(total_time / total_f);
        let wrong_ratio = round4(wrong as f64 / total_f);
        let time_over_15_ratio = round4(over_threshold as f64 / total_f);
        let neg_emotion_ratio = round4(negative as f64 / total_f);

        let dominant_emotion = dominant_emotion(&emotion_counts);

        Some(Aggregation {
            features: FeatureVector {
                avg_stress,
                wrong_ratio,
                avg_time,
                time_over_15_ratio,
                neg_emotion_ratio,
                dominant_emotion,
            },
            summary: QuizSummary {
                avg_stress_score: avg_stress,
                avg_time,
                wrong_answers: wrong,
                emotion_counts,
                total_questions: total as u32,
            },
        })
    }
}

/// Most frequent emotion. Counts live in a BTreeMap and only a strictly
/// higher count displaces the leader, so ties resolve to the
/// lexicographically first name.
fn dominant_emotion(counts: &BTreeMap<String, u32>) -> String {
    let mut best: Option<(&str, u32)> = None;
    for (emotion, &count) in counts {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((emotion, count)),
        }
    }
    best.map(|(emotion, _)| emotion.to_string())
        .unwrap_or_else(|| "neutral".to_string())
}
