// Detection classifier.
//
// Turns a spectral peak plus loudness into a labelled detection. Confidence
// combines loudness with tonal purity, a log2 mapping of peak dominance; a
// configurable floor gates out weak or ambiguous readings.

use std::fmt;

use serde::Serialize;

use super::spectrum::SpectralPeak;
use crate::config::DetectionConfig;

/// Dominance at which tonal purity saturates at 100% (2^6 = 64x the band
/// average).
const PURITY_SATURATION_OCTAVES: f64 = 6.0;

/// Classification outcome, serialized with the wire labels the backend
/// expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Detection {
    /// Peak inside the honey-bee band with sufficient confidence.
    #[serde(rename = "bal")]
    HoneyBee,
    /// Confident peak above the honey-bee band.
    #[serde(rename = "esek")]
    Hornet,
    /// Too quiet, too noisy, or below the honey-bee band.
    #[serde(rename = "belirsiz")]
    Undetermined,
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Detection::HoneyBee => "bal",
            Detection::Hornet => "esek",
            Detection::Undetermined => "belirsiz",
        };
        write!(f, "{}", label)
    }
}

/// One fully classified pipeline iteration.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationResult {
    pub peak_frequency_hz: f64,
    pub peak_magnitude: f64,
    pub amplitude_percent: f64,
    pub confidence_percent: f64,
    pub detection: Detection,
}

/// Map dominance to a 0-100% purity figure.
///
/// Dominance at or below 1 (peak no stronger than the band average) is pure
/// noise and scores 0. Above that the score grows with log2(dominance),
/// saturating at 64x.
pub fn tonal_purity(dominance: f64) -> f64 {
    if dominance <= 1.0 {
        return 0.0;
    }
    (100.0 * dominance.log2() / PURITY_SATURATION_OCTAVES).clamp(0.0, 100.0)
}

pub struct Classifier {
    honey_bee_min_hz: f64,
    honey_bee_max_hz: f64,
    min_confidence_percent: f64,
}

impl Classifier {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            honey_bee_min_hz: config.honey_bee_min_hz,
            honey_bee_max_hz: config.honey_bee_max_hz,
            min_confidence_percent: config.min_confidence_percent,
        }
    }

    /// Classify one spectral peak given the block's loudness percentage.
    pub fn classify(&self, peak: &SpectralPeak, loudness_percent: f64) -> ClassificationResult {
        let purity = tonal_purity(peak.dominance());
        let confidence = (loudness_percent * purity / 100.0).clamp(0.0, 100.0);

        let detection = if confidence < self.min_confidence_percent {
            Detection::Undetermined
        } else if peak.frequency_hz >= self.honey_bee_min_hz
            && peak.frequency_hz <= self.honey_bee_max_hz
        {
            Detection::HoneyBee
        } else if peak.frequency_hz > self.honey_bee_max_hz {
            Detection::Hornet
        } else {
            // Below the honey-bee band: no species is assigned.
            Detection::Undetermined
        };

        ClassificationResult {
            peak_frequency_hz: peak.frequency_hz,
            peak_magnitude: peak.magnitude,
            amplitude_percent: loudness_percent,
            confidence_percent: confidence,
            detection,
        }
    }
}
