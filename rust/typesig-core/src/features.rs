//! Feature extraction from a typed phrase and its submission timing.
//!
//! Per-key timing is approximated: without a key-event capture pipeline, the
//! timeline is a synthetic series with one timestamp per character at a fixed
//! cadence. Real key-down timestamps can be supplied through
//! [`KeyTimeline::from_timestamps`] without changing anything downstream.

use crate::error::{BiometricError, Result};
use crate::sample::{FeatureVector, PerFeature};

/// Default cadence of the synthetic key timeline, in seconds.
pub const DEFAULT_KEY_DELAY_SECS: f64 = 0.1;

/// Per-character key timestamps in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyTimeline {
    timestamps: Vec<f64>,
}

impl KeyTimeline {
    /// One timestamp per character, `delay_secs` apart, starting at zero.
    pub fn synthetic(char_count: usize, delay_secs: f64) -> Self {
        Self {
            timestamps: (0..char_count).map(|i| i as f64 * delay_secs).collect(),
        }
    }

    pub fn from_timestamps(timestamps: Vec<f64>) -> Result<Self> {
        if timestamps.iter().any(|t| !t.is_finite()) {
            return Err(BiometricError::InvalidTiming(
                "key timestamps must be finite".to_string(),
            ));
        }
        if timestamps.windows(2).any(|w| w[1] < w[0]) {
            return Err(BiometricError::InvalidTiming(
                "key timestamps must be non-decreasing".to_string(),
            ));
        }
        Ok(Self { timestamps })
    }

    /// Mean difference between consecutive timestamps; zero for fewer than two keys.
    pub fn mean_interval(&self) -> f64 {
        if self.timestamps.len() < 2 {
            return 0.0;
        }
        let intervals: f64 = self.timestamps.windows(2).map(|w| w[1] - w[0]).sum();
        intervals / (self.timestamps.len() - 1) as f64
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    key_delay_secs: f64,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_DELAY_SECS)
    }
}

impl FeatureExtractor {
    pub fn new(key_delay_secs: f64) -> Self {
        Self { key_delay_secs }
    }

    /// Extracts features using the synthetic key timeline.
    pub fn extract(&self, phrase: &str, elapsed_secs: f64) -> Result<FeatureVector> {
        let char_count = validate(phrase, elapsed_secs)?;
        let timeline = KeyTimeline::synthetic(char_count, self.key_delay_secs);
        compose(char_count, elapsed_secs, &timeline)
    }

    /// Extracts features using caller-supplied key timestamps.
    pub fn extract_with_timeline(
        &self,
        phrase: &str,
        elapsed_secs: f64,
        timeline: &KeyTimeline,
    ) -> Result<FeatureVector> {
        let char_count = validate(phrase, elapsed_secs)?;
        compose(char_count, elapsed_secs, timeline)
    }
}

fn validate(phrase: &str, elapsed_secs: f64) -> Result<usize> {
    if phrase.is_empty() {
        return Err(BiometricError::InvalidInput(
            "phrase must not be empty".to_string(),
        ));
    }
    if !elapsed_secs.is_finite() || elapsed_secs <= 0.0 {
        return Err(BiometricError::InvalidTiming(format!(
            "elapsed time must be positive, got {elapsed_secs}"
        )));
    }
    Ok(phrase.chars().count())
}

/// Fails when a feature overflows, since non-finite values cannot be stored.
fn compose(
    char_count: usize,
    elapsed_secs: f64,
    timeline: &KeyTimeline,
) -> Result<FeatureVector> {
    let features = PerFeature::new(
        char_count as f64 / elapsed_secs,
        elapsed_secs,
        timeline.mean_interval(),
    );
    if let Some((feature, value)) = features.iter().find(|(_, v)| !v.is_finite()) {
        return Err(BiometricError::InvalidTiming(format!(
            "{feature} is not finite ({value}) for elapsed time {elapsed_secs}"
        )));
    }
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typing_speed_is_chars_over_elapsed() {
        let extractor = FeatureExtractor::default();
        let fv = extractor.extract("hello world", 2.2).unwrap();
        assert_eq!(fv.typing_speed, 11.0 / 2.2);
        assert_eq!(fv.hold_time, 2.2);
    }

    #[test]
    fn test_key_press_dynamics_converges_to_delay() {
        let extractor = FeatureExtractor::new(0.1);
        let fv = extractor.extract("the quick brown fox", 3.0).unwrap();
        assert!((fv.key_press_dynamics - 0.1).abs() < 1e-9);

        let slow = FeatureExtractor::new(0.25);
        let fv = slow.extract("abc", 1.0).unwrap();
        assert!((fv.key_press_dynamics - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_single_char_has_zero_dynamics() {
        let fv = FeatureExtractor::default().extract("x", 0.5).unwrap();
        assert_eq!(fv.key_press_dynamics, 0.0);
        assert_eq!(fv.typing_speed, 2.0);
    }

    #[test]
    fn test_counts_unicode_scalars() {
        let fv = FeatureExtractor::default().extract("привіт", 2.0).unwrap();
        assert_eq!(fv.typing_speed, 3.0);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = FeatureExtractor::default();
        let a = extractor.extract("repeatable", 1.7).unwrap();
        let b = extractor.extract("repeatable", 1.7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_phrase_rejected() {
        let result = FeatureExtractor::default().extract("", 1.0);
        assert!(matches!(result, Err(BiometricError::InvalidInput(_))));

        // Empty phrase is reported even when the timing is also bad.
        let result = FeatureExtractor::default().extract("", 0.0);
        assert!(matches!(result, Err(BiometricError::InvalidInput(_))));
    }

    #[test]
    fn test_non_positive_elapsed_rejected() {
        let extractor = FeatureExtractor::default();
        for elapsed in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = extractor.extract("abc", elapsed);
            assert!(
                matches!(result, Err(BiometricError::InvalidTiming(_))),
                "elapsed {elapsed} accepted"
            );
        }
    }

    #[test]
    fn test_overflowing_speed_rejected() {
        let result = FeatureExtractor::default().extract("abc", 1e-310);
        assert!(matches!(result, Err(BiometricError::InvalidTiming(_))));
    }

    #[test]
    fn test_real_timeline() {
        let timeline = KeyTimeline::from_timestamps(vec![0.0, 0.2, 0.3, 0.7]).unwrap();
        let fv = FeatureExtractor::default()
            .extract_with_timeline("abcd", 1.0, &timeline)
            .unwrap();
        assert!((fv.key_press_dynamics - 0.7 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_timeline_rejects_regression() {
        assert!(matches!(
            KeyTimeline::from_timestamps(vec![0.0, 0.5, 0.4]),
            Err(BiometricError::InvalidTiming(_))
        ));
        assert!(matches!(
            KeyTimeline::from_timestamps(vec![0.0, f64::NAN]),
            Err(BiometricError::InvalidTiming(_))
        ));
    }
}
