//! Tailored recommendation builder
//!
//! Expands a final label plus the feature vector into an ordered list of
//! study recommendations. The first line is always the headline for the
//! label, the last is always the weekly micro-plan.

use crate::types::{FeatureVector, RiskLabel};

/// Headline for each final label
pub fn headline(label: RiskLabel) -> &'static str {
    match label {
        RiskLabel::LowStressGoodProgress => {
            "Low stress and steady accuracy — great trajectory."
        }
        RiskLabel::BalancedImprovementNeeded => {
            "Balanced progress — a bit more speed and accuracy will help."
        }
        RiskLabel::HighContentGap => {
            "Content gaps detected — focus on core concepts and guided practice."
        }
    }
}

/// Build the ordered recommendation list for a final label.
///
/// Appends, in order: headline, accuracy band, timing band, stress/emotion
/// band, weekly plan. Given the fixed bands the result always has between
/// 3 and 6 lines.
pub fn build_recommendations(label: RiskLabel, features: &FeatureVector) -> Vec<String> {
    let wrong_ratio = features.wrong_ratio;
    let time_ratio = features.time_over_15_ratio;
    let avg_stress = features.avg_stress;
    let avg_time = features.avg_time;
    let neg_ratio = features.neg_emotion_ratio;
    let dominant = features.dominant_emotion.as_str();

    let mut lines: Vec<String> = Vec::new();
    lines.push(headline(label).to_string());

    // Accuracy guidance
    if wrong_ratio >= 0.7 {
        lines.push(
            "Revisit core topics first — do 10–15 targeted questions per concept.".to_string(),
        );
        lines.push(
            "Use worked examples, then attempt similar items without looking at solutions."
                .to_string(),
        );
    } else if wrong_ratio >= 0.4 {
        lines.push(
            "Focus on weak areas — add 2–3 short practice blocks per day (10 questions each)."
                .to_string(),
        );
    } else {
        lines.push(
            "Maintain your accuracy with spaced review (2–3 short sessions per week).".to_string(),
        );
    }

    // Timing guidance
    if time_ratio >= 0.6 {
        lines.push(
            "Practice with strict timeboxing (15s/question) to build speed under light pressure."
                .to_string(),
        );
    } else if time_ratio >= 0.3 {
        lines.push("Add a light timer (15–20s/question) to improve pacing.".to_string());
    } else {
        lines.push("Your pacing looks good — keep the same rhythm.".to_string());
    }

    // Stress / emotion guidance
    if avg_stress >= 4.0 || neg_ratio >= 0.5 {
        lines.push(
            "Insert short breaks and breathing exercises between sets (60–90s).".to_string(),
        );
    }
    if matches!(dominant, "fear" | "angry" | "disgust" | "sad") {
        lines.push(
            "Start each session with 2 easy warm-up questions to build momentum.".to_string(),
        );
    }
    if matches!(dominant, "happy" | "surprise" | "neutral")
        && wrong_ratio < 0.4
        && time_ratio < 0.3
    {
        lines.push(
            "You're in a good flow — gradually introduce mixed-difficulty sets.".to_string(),
        );
    }

    // Concrete micro-plan
    lines.push(format!(
        "Weekly plan: 3×20-min sessions • average time ≈ {:.0}s/question • review misses next day.",
        avg_time
    ));

    lines
}
