//! Typing samples and the per-feature containers shared by every stage.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three timing features tracked for each typed phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    TypingSpeed,
    HoldTime,
    KeyPressDynamics,
}

impl Feature {
    pub const ALL: [Feature; 3] = [
        Feature::TypingSpeed,
        Feature::HoldTime,
        Feature::KeyPressDynamics,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Feature::TypingSpeed => "typing_speed",
            Feature::HoldTime => "hold_time",
            Feature::KeyPressDynamics => "key_press_dynamics",
        }
    }

    /// Human-readable label with unit, used in reports.
    pub fn label(self) -> &'static str {
        match self {
            Feature::TypingSpeed => "Typing Speed (chars/s)",
            Feature::HoldTime => "Hold Time (s)",
            Feature::KeyPressDynamics => "Key Press Dynamics (s)",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One value per feature.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerFeature<T> {
    pub typing_speed: T,
    pub hold_time: T,
    pub key_press_dynamics: T,
}

impl<T> PerFeature<T> {
    pub fn new(typing_speed: T, hold_time: T, key_press_dynamics: T) -> Self {
        Self {
            typing_speed,
            hold_time,
            key_press_dynamics,
        }
    }

    pub fn get(&self, feature: Feature) -> &T {
        match feature {
            Feature::TypingSpeed => &self.typing_speed,
            Feature::HoldTime => &self.hold_time,
            Feature::KeyPressDynamics => &self.key_press_dynamics,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(Feature, &T) -> U) -> PerFeature<U> {
        PerFeature {
            typing_speed: f(Feature::TypingSpeed, &self.typing_speed),
            hold_time: f(Feature::HoldTime, &self.hold_time),
            key_press_dynamics: f(Feature::KeyPressDynamics, &self.key_press_dynamics),
        }
    }

    pub fn try_map<U, E>(
        &self,
        mut f: impl FnMut(Feature, &T) -> Result<U, E>,
    ) -> Result<PerFeature<U>, E> {
        Ok(PerFeature {
            typing_speed: f(Feature::TypingSpeed, &self.typing_speed)?,
            hold_time: f(Feature::HoldTime, &self.hold_time)?,
            key_press_dynamics: f(Feature::KeyPressDynamics, &self.key_press_dynamics)?,
        })
    }

    /// Iterates in `Feature::ALL` order.
    pub fn iter(&self) -> impl Iterator<Item = (Feature, &T)> {
        Feature::ALL.into_iter().map(move |feature| (feature, self.get(feature)))
    }
}

pub type FeatureVector = PerFeature<f64>;

impl FeatureVector {
    /// Absolute per-feature distance to another vector.
    pub fn abs_diff(&self, other: &FeatureVector) -> FeatureVector {
        self.map(|feature, value| (value - other.get(feature)).abs())
    }
}

/// One typing observation as persisted in a user's record file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub user_id: String,
    pub phrase: String,
    pub phrase_number: u64,
    pub typing_speed: f64,
    pub hold_time: f64,
    pub key_press_dynamics: f64,
}

impl Sample {
    pub fn new(
        user_id: impl Into<String>,
        phrase: impl Into<String>,
        phrase_number: u64,
        features: FeatureVector,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            phrase: phrase.into(),
            phrase_number,
            typing_speed: features.typing_speed,
            hold_time: features.hold_time,
            key_press_dynamics: features.key_press_dynamics,
        }
    }

    pub fn features(&self) -> FeatureVector {
        PerFeature::new(self.typing_speed, self.hold_time, self.key_press_dynamics)
    }
}

/// Splits a history into one value series per feature, preserving order.
pub fn feature_series(samples: &[Sample]) -> PerFeature<Vec<f64>> {
    PerFeature::new(
        samples.iter().map(|s| s.typing_speed).collect(),
        samples.iter().map(|s| s.hold_time).collect(),
        samples.iter().map(|s| s.key_press_dynamics).collect(),
    )
}
