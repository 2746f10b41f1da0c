//! Hybrid label decision
//!
//! Combines the trained classifier's prediction with ordered override rules.
//! Rules 1-3 encode hard domain knowledge a noisy classifier must not
//! contradict; rule 4 steers low-confidence ambiguous predictions to the
//! middle class instead of trusting an extreme call.

use crate::types::{Decision, FeatureVector, RiskLabel};

/// Below this confidence an ambiguous prediction falls back to the middle class
pub const MIN_MODEL_CONFIDENCE: f64 = 0.65;

/// Decide the final label from features plus the classifier's raw output.
///
/// Rules are evaluated in order, first match wins:
/// 1. Extreme content gap (wrong_ratio >= 0.8)
/// 2. Strong content gap with time or stress pressure
/// 3. Very strong performance
/// 4. Low confidence on a non-extreme prediction -> middle class
/// 5. Otherwise the raw label passes through unchanged
pub fn decide_final_label(
    features: &FeatureVector,
    raw_label: RiskLabel,
    confidence: f64,
) -> Decision {
    let wrong_ratio = features.wrong_ratio;
    let avg_time = features.avg_time;
    let time_ratio = features.time_over_15_ratio;
    let avg_stress = features.avg_stress;

    if wrong_ratio >= 0.8 {
        return Decision {
            final_label: RiskLabel::HighContentGap,
            overridden_by_rules: true,
        };
    }

    if wrong_ratio >= 0.6 && (avg_time >= 20.0 || time_ratio >= 0.4 || avg_stress >= 2.5) {
        return Decision {
            final_label: RiskLabel::HighContentGap,
            overridden_by_rules: true,
        };
    }

    if wrong_ratio <= 0.2 && avg_stress < 2.0 && time_ratio <= 0.3 {
        return Decision {
            final_label: RiskLabel::LowStressGoodProgress,
            overridden_by_rules: true,
        };
    }

    if confidence < MIN_MODEL_CONFIDENCE
        && raw_label != RiskLabel::HighContentGap
        && raw_label != RiskLabel::LowStressGoodProgress
    {
        return Decision {
            final_label: RiskLabel::BalancedImprovementNeeded,
            overridden_by_rules: true,
        };
    }

    Decision {
        final_label: raw_label,
        overridden_by_rules: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn features(
        avg_stress: f64,
        wrong_ratio: f64,
        avg_time: f64,
        time_over_15_ratio: f64,
    ) -> FeatureVector {
        FeatureVector {
            avg_stress,
            wrong_ratio,
            avg_time,
            time_over_15_ratio,
            neg_emotion_ratio: 0.0,
            dominant_emotion: "neutral".to_string(),
        }
    }

    #[test]
    fn test_extreme_wrong_ratio_overrides_everything() {
        // Classifier says all is well with full confidence; rule 1 still wins
        let decision = decide_final_label(
            &features(0.5, 0.9, 5.0, 0.0),
            RiskLabel::LowStressGoodProgress,
            1.0,
        );
        assert_eq!(decision.final_label, RiskLabel::HighContentGap);
        assert!(decision.overridden_by_rules);
    }

    #[test]
    fn test_content_gap_with_pressure() {
        // wrong_ratio 0.6 alone is not enough
        let calm = decide_final_label(
            &features(2.0, 0.6, 10.0, 0.1),
            RiskLabel::BalancedImprovementNeeded,
            0.9,
        );
        assert_eq!(calm.final_label, RiskLabel::BalancedImprovementNeeded);
        assert!(!calm.overridden_by_rules);

        // Each pressure signal triggers rule 2 on its own
        for feats in [
            features(2.0, 0.6, 25.0, 0.1),
            features(2.0, 0.6, 10.0, 0.5),
            features(3.0, 0.6, 10.0, 0.1),
        ] {
            let decision =
                decide_final_label(&feats, RiskLabel::BalancedImprovementNeeded, 0.9);
            assert_eq!(decision.final_label, RiskLabel::HighContentGap);
            assert!(decision.overridden_by_rules);
        }
    }

    #[test]
    fn test_strong_performance_override() {
        let decision = decide_final_label(
            &features(1.2, 0.1, 8.0, 0.1),
            RiskLabel::BalancedImprovementNeeded,
            0.95,
        );
        assert_eq!(decision.final_label, RiskLabel::LowStressGoodProgress);
        assert!(decision.overridden_by_rules);
    }

    #[test]
    fn test_low_confidence_falls_back_to_middle_class() {
        let decision = decide_final_label(
            &features(2.5, 0.3, 12.0, 0.35),
            RiskLabel::BalancedImprovementNeeded,
            0.5,
        );
        assert_eq!(decision.final_label, RiskLabel::BalancedImprovementNeeded);
        assert!(decision.overridden_by_rules);
    }

    #[test]
    fn test_low_confidence_extreme_labels_exempt() {
        // HIGH_CONTENT_GAP at confidence 0.5 is not downgraded
        let decision = decide_final_label(
            &features(2.5, 0.3, 12.0, 0.35),
            RiskLabel::HighContentGap,
            0.5,
        );
        assert_eq!(decision.final_label, RiskLabel::HighContentGap);
        assert!(!decision.overridden_by_rules);

        let decision = decide_final_label(
            &features(2.5, 0.3, 12.0, 0.35),
            RiskLabel::LowStressGoodProgress,
            0.5,
        );
        assert_eq!(decision.final_label, RiskLabel::LowStressGoodProgress);
        assert!(!decision.overridden_by_rules);
    }

    #[test]
    fn test_confident_prediction_passes_through() {
        let decision = decide_final_label(
            &features(2.5, 0.3, 12.0, 0.35),
            RiskLabel::BalancedImprovementNeeded,
            0.9,
        );
        assert_eq!(decision.final_label, RiskLabel::BalancedImprovementNeeded);
        assert!(!decision.overridden_by_rules);
    }

    #[test]
    fn test_rule_order_is_a_priority_chain() {
        // Satisfies rule 1 and rule 2 and would satisfy rule 4; rule 1 decides
        let decision = decide_final_label(
            &features(3.0, 0.85, 25.0, 0.5),
            RiskLabel::BalancedImprovementNeeded,
            0.4,
        );
        assert_eq!(decision.final_label, RiskLabel::HighContentGap);
        assert!(decision.overridden_by_rules);
    }

    #[test]
    fn test_boundary_values() {
        // wrong_ratio exactly 0.8 fires rule 1
        let decision = decide_final_label(
            &features(1.0, 0.8, 5.0, 0.0),
            RiskLabel::LowStressGoodProgress,
            1.0,
        );
        assert_eq!(decision.final_label, RiskLabel::HighContentGap);

        // wrong_ratio exactly 0.2 with calm signals fires rule 3
        let decision = decide_final_label(
            &features(1.9, 0.2, 10.0, 0.3),
            RiskLabel::HighContentGap,
            1.0,
        );
        assert_eq!(decision.final_label, RiskLabel::LowStressGoodProgress);

        // confidence exactly 0.65 does not trigger rule 4
        let decision = decide_final_label(
            &features(2.5, 0.3, 12.0, 0.35),
            RiskLabel::BalancedImprovementNeeded,
            0.65,
        );
        assert!(!decision.overridden_by_rules);
    }
}
