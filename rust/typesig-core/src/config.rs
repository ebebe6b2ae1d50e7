use crate::features::DEFAULT_KEY_DELAY_SECS;
use crate::sample::PerFeature;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "typesig.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypesigConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Phrases collected per enrollment or extension round.
    #[serde(default = "default_training_iterations")]
    pub training_iterations: usize,

    /// Cadence of the synthetic key timeline.
    #[serde(default = "default_key_delay")]
    pub key_delay_secs: f64,

    /// Width of the acceptance bounds in population standard deviations.
    #[serde(default = "default_bound_sigma")]
    pub bound_sigma: f64,

    #[serde(default = "default_significance_level")]
    pub significance_level: f64,

    #[serde(default)]
    pub thresholds: MatchThresholds,

    #[serde(default)]
    pub regression: RegressionConfig,
}

/// Per-feature absolute-difference limits for matching a stored sample.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MatchThresholds {
    #[serde(default = "default_hold_threshold")]
    pub hold_time: f64,
    #[serde(default = "default_speed_threshold")]
    pub typing_speed: f64,
    #[serde(default = "default_dynamics_threshold")]
    pub key_press_dynamics: f64,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            hold_time: default_hold_threshold(),
            typing_speed: default_speed_threshold(),
            key_press_dynamics: default_dynamics_threshold(),
        }
    }
}

impl MatchThresholds {
    pub fn as_features(&self) -> PerFeature<f64> {
        PerFeature::new(self.typing_speed, self.hold_time, self.key_press_dynamics)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_folds")]
    pub folds: usize,
    #[serde(default = "default_ridge_alpha")]
    pub ridge_alpha: f64,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            folds: default_folds(),
            ridge_alpha: default_ridge_alpha(),
        }
    }
}

// Defaults
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".typesig"))
        .unwrap_or_else(|| PathBuf::from(".typesig"))
}
fn default_training_iterations() -> usize {
    5
}
fn default_key_delay() -> f64 {
    DEFAULT_KEY_DELAY_SECS
}
fn default_bound_sigma() -> f64 {
    5.0
}
fn default_significance_level() -> f64 {
    0.05
}
fn default_hold_threshold() -> f64 {
    1.0
}
fn default_speed_threshold() -> f64 {
    1.0
}
fn default_dynamics_threshold() -> f64 {
    0.1
}
fn default_true() -> bool {
    true
}
fn default_folds() -> usize {
    5
}
fn default_ridge_alpha() -> f64 {
    1.0
}

impl Default for TypesigConfig {
    fn default() -> Self {
        Self::default_with_dir(&default_data_dir())
    }
}

impl TypesigConfig {
    pub fn load_or_default(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let raw = fs::read_to_string(&config_path)?;
            let mut config: TypesigConfig = serde_json::from_str(&raw)?;
            config.data_dir = data_dir.to_path_buf();
            config.validate()?;
            return Ok(config);
        }

        let config = Self::default_with_dir(data_dir);
        config.persist()?;
        Ok(config)
    }

    pub fn default_with_dir(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            training_iterations: default_training_iterations(),
            key_delay_secs: default_key_delay(),
            bound_sigma: default_bound_sigma(),
            significance_level: default_significance_level(),
            thresholds: MatchThresholds::default(),
            regression: RegressionConfig::default(),
        }
    }

    pub fn persist(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        let config_path = self.data_dir.join(CONFIG_FILE);
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(config_path, raw)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.training_iterations == 0 {
            return Err(anyhow!("training_iterations must be at least 1"));
        }
        if !(self.key_delay_secs > 0.0) {
            return Err(anyhow!("key_delay_secs must be positive"));
        }
        if !(self.bound_sigma > 0.0) {
            return Err(anyhow!("bound_sigma must be positive"));
        }
        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            return Err(anyhow!("significance_level must lie in (0, 1)"));
        }
        for (feature, limit) in self.thresholds.as_features().iter() {
            if !(*limit > 0.0) {
                return Err(anyhow!("threshold for {feature} must be positive"));
            }
        }
        if self.regression.folds < 2 {
            return Err(anyhow!("regression.folds must be at least 2"));
        }
        if self.regression.ridge_alpha < 0.0 {
            return Err(anyhow!("regression.ridge_alpha must not be negative"));
        }
        Ok(())
    }
}
