//! Identification of a user from a single typed phrase.
//!
//! Two independent tracks run on every attempt. The advisory track checks each
//! feature against the profile bounds and runs the significance tests; its
//! results are reported but never decide anything. The gating track scans the
//! stored history in order and accepts on the first sample whose three feature
//! differences are all below the match thresholds.

use crate::analysis::significance::{SignificanceReport, SignificanceTester};
use crate::config::{MatchThresholds, TypesigConfig};
use crate::enrollment::{PhraseRequest, PhraseSource, Purpose};
use crate::error::{BiometricError, Result};
use crate::features::FeatureExtractor;
use crate::profile::{compute_profile, Bounds, Profile, DEFAULT_BOUND_SIGMA};
use crate::sample::{FeatureVector, PerFeature, Sample};
use crate::store::SampleStore;
use serde::Serialize;
use std::fmt;

/// Terminal state of an identification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuthState {
    Accepted,
    Rejected,
    NoHistory,
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuthState::Accepted => "ACCEPTED",
            AuthState::Rejected => "REJECTED",
            AuthState::NoHistory => "NO_HISTORY",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RangeCheck {
    pub value: f64,
    pub bounds: Bounds,
    pub within: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Verdict {
    Accepted {
        matched: Sample,
        differences: FeatureVector,
    },
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthenticationReport {
    pub user_id: String,
    pub features: FeatureVector,
    pub profile: Profile,
    pub range_checks: PerFeature<RangeCheck>,
    pub significance: SignificanceReport,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AuthenticationOutcome {
    NoHistory { user_id: String },
    Evaluated(AuthenticationReport),
}

impl AuthenticationOutcome {
    pub fn state(&self) -> AuthState {
        match self {
            AuthenticationOutcome::NoHistory { .. } => AuthState::NoHistory,
            AuthenticationOutcome::Evaluated(report) => match report.verdict {
                Verdict::Accepted { .. } => AuthState::Accepted,
                Verdict::Rejected => AuthState::Rejected,
            },
        }
    }
}

pub struct Authenticator<'a> {
    store: &'a SampleStore,
    extractor: FeatureExtractor,
    tester: SignificanceTester,
    bound_sigma: f64,
    thresholds: MatchThresholds,
}

impl<'a> Authenticator<'a> {
    pub fn new(store: &'a SampleStore, config: &TypesigConfig) -> Self {
        Self {
            store,
            extractor: FeatureExtractor::new(config.key_delay_secs),
            tester: SignificanceTester::new(config.significance_level),
            bound_sigma: config.bound_sigma,
            thresholds: config.thresholds,
        }
    }

    /// Authenticator with the stock bounds, thresholds and key cadence.
    pub fn with_defaults(store: &'a SampleStore) -> Self {
        Self {
            store,
            extractor: FeatureExtractor::default(),
            tester: SignificanceTester::default(),
            bound_sigma: DEFAULT_BOUND_SIGMA,
            thresholds: MatchThresholds::default(),
        }
    }

    /// Evaluates one typed phrase against the user's stored history.
    pub fn identify(
        &self,
        user_id: &str,
        phrase: &str,
        elapsed_secs: f64,
    ) -> Result<AuthenticationOutcome> {
        let history = self.store.load_all(user_id)?;
        let profile = match compute_profile(user_id, &history, self.bound_sigma) {
            Ok(profile) => profile,
            Err(BiometricError::NoHistory(_)) => {
                log::info!("no enrollment data for {user_id}");
                return Ok(AuthenticationOutcome::NoHistory {
                    user_id: user_id.to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        let features = self.extractor.extract(phrase, elapsed_secs)?;
        Ok(AuthenticationOutcome::Evaluated(
            self.evaluate(user_id, &history, profile, features),
        ))
    }

    /// Collects a phrase from `source`, then identifies it.
    pub fn identify_phrase<S: PhraseSource + ?Sized>(
        &self,
        user_id: &str,
        source: &mut S,
    ) -> Result<AuthenticationOutcome> {
        if !self.store.presence(user_id)?.has_samples() {
            log::info!("no enrollment data for {user_id}");
            return Ok(AuthenticationOutcome::NoHistory {
                user_id: user_id.to_string(),
            });
        }
        let request = PhraseRequest {
            user_id: user_id.to_string(),
            phrase_number: None,
            purpose: Purpose::Identification,
        };
        let typed = source.collect_phrase(&request)?;
        self.identify(user_id, &typed.text, typed.elapsed_secs)
    }

    fn evaluate(
        &self,
        user_id: &str,
        history: &[Sample],
        profile: Profile,
        features: FeatureVector,
    ) -> AuthenticationReport {
        let range_checks = profile.bounds.map(|feature, bounds| {
            let value = *features.get(feature);
            let within = bounds.contains(value);
            if !within {
                log::warn!(
                    "{feature} {value:.6} outside [{:.6}, {:.6}] for {user_id}",
                    bounds.lower,
                    bounds.upper
                );
            }
            RangeCheck {
                value,
                bounds: *bounds,
                within,
            }
        });

        let significance = self.tester.evaluate(history, &features);
        let verdict = find_match(history, &features, &self.thresholds);

        match &verdict {
            Verdict::Accepted { matched, .. } => log::info!(
                "{user_id} accepted against phrase #{}",
                matched.phrase_number
            ),
            Verdict::Rejected => log::info!("{user_id} rejected"),
        }

        AuthenticationReport {
            user_id: user_id.to_string(),
            features,
            profile,
            range_checks,
            significance,
            verdict,
        }
    }
}

/// First stored sample whose feature differences are all under the thresholds.
pub fn find_match(
    history: &[Sample],
    features: &FeatureVector,
    thresholds: &MatchThresholds,
) -> Verdict {
    let limits = thresholds.as_features();
    for sample in history {
        let differences = features.abs_diff(&sample.features());
        let all_close = differences
            .iter()
            .all(|(feature, diff)| *diff < *limits.get(feature));
        if all_close {
            return Verdict::Accepted {
                matched: sample.clone(),
                differences,
            };
        }
    }
    Verdict::Rejected
}
