//! Acceptance bounds derived from a user's sample history.

use crate::error::{BiometricError, Result};
use crate::sample::{feature_series, PerFeature, Sample};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Default bound width in population standard deviations.
pub const DEFAULT_BOUND_SIGMA: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub mean: f64,
    pub std_dev: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    /// Inclusive on both ends.
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// Per-feature bounds for one user. Always recomputed from history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub sample_count: usize,
    pub bounds: PerFeature<Bounds>,
}

/// `mean ± k · population_std_dev` over `values`.
pub fn compute_bounds(values: &[f64], k: f64) -> Result<Bounds> {
    if values.is_empty() {
        return Err(BiometricError::InsufficientData(
            "bounds need at least one value".to_string(),
        ));
    }

    let mean = values.mean();
    let std_dev = if values.len() == 1 {
        0.0
    } else {
        values.population_std_dev()
    };

    Ok(Bounds {
        mean,
        std_dev,
        lower: mean - k * std_dev,
        upper: mean + k * std_dev,
    })
}

pub fn compute_profile(user_id: &str, samples: &[Sample], k: f64) -> Result<Profile> {
    if samples.is_empty() {
        return Err(BiometricError::NoHistory(user_id.to_string()));
    }

    let bounds = feature_series(samples).try_map(|feature, values| {
        let bounds = compute_bounds(values, k)?;
        log::debug!(
            "{feature}: mean {:.6}, std dev {:.6}, bounds [{:.6}, {:.6}]",
            bounds.mean,
            bounds.std_dev,
            bounds.lower,
            bounds.upper
        );
        Ok::<_, BiometricError>(bounds)
    })?;

    Ok(Profile {
        user_id: user_id.to_string(),
        sample_count: samples.len(),
        bounds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_value_collapses() {
        let b = compute_bounds(&[3.25], DEFAULT_BOUND_SIGMA).unwrap();
        assert_eq!(b.lower, 3.25);
        assert_eq!(b.upper, 3.25);
        assert_eq!(b.std_dev, 0.0);
        assert!(b.contains(3.25));
        assert!(!b.contains(3.2500001));
    }

    #[test]
    fn test_known_mean_and_population_std() {
        // mean 5, population std dev 2
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let b = compute_bounds(&values, 5.0).unwrap();
        assert!((b.mean - 5.0).abs() < 1e-9);
        assert!((b.std_dev - 2.0).abs() < 1e-9);
        assert!((b.lower - (-5.0)).abs() < 1e-9);
        assert!((b.upper - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_custom_sigma() {
        let b = compute_bounds(&[1.0, 3.0], 2.0).unwrap();
        assert!((b.lower - 0.0).abs() < 1e-9);
        assert!((b.upper - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_values() {
        assert!(matches!(
            compute_bounds(&[], 5.0),
            Err(BiometricError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_profile_per_feature() {
        let samples = vec![
            Sample::new("u", "a", 1, PerFeature::new(4.0, 2.0, 0.1)),
            Sample::new("u", "b", 2, PerFeature::new(6.0, 2.0, 0.1)),
        ];
        let profile = compute_profile("u", &samples, 5.0).unwrap();

        assert_eq!(profile.sample_count, 2);
        assert!((profile.bounds.typing_speed.lower - 0.0).abs() < 1e-9);
        assert!((profile.bounds.typing_speed.upper - 10.0).abs() < 1e-9);
        assert_eq!(profile.bounds.hold_time.lower, 2.0);
        assert_eq!(profile.bounds.hold_time.upper, 2.0);
    }

    #[test]
    fn test_profile_without_history() {
        assert!(matches!(
            compute_profile("ghost", &[], 5.0),
            Err(BiometricError::NoHistory(id)) if id == "ghost"
        ));
    }
}
