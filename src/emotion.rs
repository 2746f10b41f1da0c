//! Emotion sample handling
//!
//! The facial-expression subsystem is an external black box that reports, per
//! captured image, a confidence for each emotion it knows. This module reduces
//! a burst of such samples to a ranked list of readings and picks the dominant
//! one for the response record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::aggregate::round4;

/// Minimum averaged confidence for an emotion to be reported at all
pub const MIN_SAMPLE_CONFIDENCE: f64 = 0.1;

/// A single emotion with its averaged confidence (0-1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionReading {
    pub emotion: String,
    /// Absent on older records that stored only the emotion name
    #[serde(default)]
    pub confidence: f64,
}

/// Average a burst of per-image emotion confidences into ranked readings.
///
/// Samples arrive as vendor percentages (0-100) keyed by emotion name; names
/// are lowercased, confidences normalized to 0-1 and averaged per emotion.
/// Emotions below [`MIN_SAMPLE_CONFIDENCE`] are dropped. The result is sorted
/// by confidence, highest first; equal confidences keep lexicographic order.
pub fn average_samples(samples: &[BTreeMap<String, f64>]) -> Vec<EmotionReading> {
    let mut totals: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for sample in samples {
        for (emotion, confidence) in sample {
            totals
                .entry(emotion.to_lowercase())
                .or_default()
                .push(confidence / 100.0);
        }
    }

    let mut readings: Vec<EmotionReading> = totals
        .into_iter()
        .filter_map(|(emotion, confidences)| {
            let mean = confidences.iter().sum::<f64>() / confidences.len() as f64;
            if mean >= MIN_SAMPLE_CONFIDENCE {
                Some(EmotionReading {
                    emotion,
                    confidence: round4(mean),
                })
            } else {
                None
            }
        })
        .collect();

    // Stable sort: ties stay in the lexicographic order BTreeMap produced
    readings.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    readings
}

/// Pick the reading with the highest confidence. Only a strictly higher
/// confidence displaces the leader, so ties keep the first reading.
pub fn dominant_reading(readings: &[EmotionReading]) -> Option<&EmotionReading> {
    let mut best: Option<&EmotionReading> = None;
    for reading in readings {
        match best {
            Some(current) if reading.confidence <= current.confidence => {}
            _ => best = Some(reading),
        }
    }
    best
}
