//! Collection of typing samples from an external phrase source.

use crate::analysis::regression::{cross_validate, CrossValidation};
use crate::config::TypesigConfig;
use crate::error::{BiometricError, Result};
use crate::features::FeatureExtractor;
use crate::profile::{compute_profile, Profile};
use crate::sample::Sample;
use crate::store::SampleStore;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Purpose {
    Enrollment,
    Identification,
}

/// What the phrase source is being asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseRequest {
    pub user_id: String,
    /// Set while collecting samples; `None` for identification.
    pub phrase_number: Option<u64>,
    pub purpose: Purpose,
}

/// A phrase as submitted, with the seconds between prompt and submission.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedPhrase {
    pub text: String,
    pub elapsed_secs: f64,
}

/// Supplies typed phrases, typically by prompting an operator at a terminal.
pub trait PhraseSource {
    fn collect_phrase(&mut self, request: &PhraseRequest) -> Result<TypedPhrase>;
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionReport {
    pub user_id: String,
    pub added: usize,
    pub first_phrase_number: u64,
    pub last_phrase_number: u64,
    pub total_samples: usize,
    pub profile: Profile,
    pub cross_validation: Option<CrossValidation>,
}

pub struct Enrollment<'a> {
    store: &'a SampleStore,
    config: &'a TypesigConfig,
    extractor: FeatureExtractor,
}

impl<'a> Enrollment<'a> {
    pub fn new(store: &'a SampleStore, config: &'a TypesigConfig) -> Self {
        Self {
            store,
            config,
            extractor: FeatureExtractor::new(config.key_delay_secs),
        }
    }

    /// Initial collection for a user with no stored samples.
    pub fn enroll<S: PhraseSource + ?Sized>(
        &self,
        user_id: &str,
        source: &mut S,
        iterations: usize,
    ) -> Result<CollectionReport> {
        if self.store.presence(user_id)?.has_samples() {
            return Err(BiometricError::AlreadyEnrolled(user_id.to_string()));
        }
        log::info!("enrolling {user_id} with {iterations} phrase(s)");
        self.collect(user_id, source, iterations)
    }

    /// Supplementary collection, numbered after the last stored phrase.
    pub fn extend<S: PhraseSource + ?Sized>(
        &self,
        user_id: &str,
        source: &mut S,
        iterations: usize,
    ) -> Result<CollectionReport> {
        log::info!("extending {user_id} with {iterations} phrase(s)");
        self.collect(user_id, source, iterations)
    }

    fn collect<S: PhraseSource + ?Sized>(
        &self,
        user_id: &str,
        source: &mut S,
        iterations: usize,
    ) -> Result<CollectionReport> {
        if iterations == 0 {
            return Err(BiometricError::InvalidInput(
                "at least one phrase must be collected".to_string(),
            ));
        }

        let first = self.store.next_phrase_number(user_id)?;
        let mut batch = Vec::with_capacity(iterations);
        for phrase_number in first..first + iterations as u64 {
            let request = PhraseRequest {
                user_id: user_id.to_string(),
                phrase_number: Some(phrase_number),
                purpose: Purpose::Enrollment,
            };
            let typed = source.collect_phrase(&request)?;
            let features = self.extractor.extract(&typed.text, typed.elapsed_secs)?;
            batch.push(Sample::new(user_id, typed.text, phrase_number, features));
        }

        self.store.append(user_id, &batch)?;

        let history = self.store.load_all(user_id)?;
        let profile = compute_profile(user_id, &history, self.config.bound_sigma)?;
        let cross_validation = if self.config.regression.enabled {
            let cv = cross_validate(
                &history,
                self.config.regression.folds,
                self.config.regression.ridge_alpha,
            );
            if cv.is_none() {
                log::debug!(
                    "skipping cross-validation: {} sample(s) for {} folds",
                    history.len(),
                    self.config.regression.folds
                );
            }
            cv
        } else {
            None
        };

        Ok(CollectionReport {
            user_id: user_id.to_string(),
            added: batch.len(),
            first_phrase_number: first,
            last_phrase_number: first + batch.len() as u64 - 1,
            total_samples: history.len(),
            profile,
            cross_validation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StorePresence;
    use std::collections::VecDeque;
    use tempfile::TempDir;

    /// Replays fixed phrases and records every request it receives.
    struct ScriptedSource {
        phrases: VecDeque<TypedPhrase>,
        requests: Vec<PhraseRequest>,
    }

    impl ScriptedSource {
        fn new(phrases: &[(&str, f64)]) -> Self {
            Self {
                phrases: phrases
                    .iter()
                    .map(|(text, elapsed)| TypedPhrase {
                        text: text.to_string(),
                        elapsed_secs: *elapsed,
                    })
                    .collect(),
                requests: Vec::new(),
            }
        }
    }

    impl PhraseSource for ScriptedSource {
        fn collect_phrase(&mut self, request: &PhraseRequest) -> Result<TypedPhrase> {
            self.requests.push(request.clone());
            self.phrases
                .pop_front()
                .ok_or_else(|| BiometricError::InvalidInput("script exhausted".to_string()))
        }
    }

    #[test]
    fn test_enroll_then_extend_numbers_phrases() {
        let dir = TempDir::new().expect("create temp dir");
        let store = SampleStore::new(dir.path());
        let config = TypesigConfig::default_with_dir(dir.path());
        let enrollment = Enrollment::new(&store, &config);

        let mut source =
            ScriptedSource::new(&[("hello", 1.0), ("hello", 1.2), ("hello", 0.9)]);
        let report = enrollment.enroll("amy", &mut source, 3).unwrap();
        assert_eq!(report.added, 3);
        assert_eq!((report.first_phrase_number, report.last_phrase_number), (1, 3));
        assert_eq!(report.total_samples, 3);
        assert_eq!(report.profile.sample_count, 3);
        assert!(report.cross_validation.is_none());

        let numbers: Vec<_> = source.requests.iter().map(|r| r.phrase_number).collect();
        assert_eq!(numbers, vec![Some(1), Some(2), Some(3)]);

        let mut more = ScriptedSource::new(&[("hello", 1.1), ("hello", 1.05)]);
        let report = enrollment.extend("amy", &mut more, 2).unwrap();
        assert_eq!((report.first_phrase_number, report.last_phrase_number), (4, 5));
        assert_eq!(report.total_samples, 5);
        assert!(report.cross_validation.is_some());
        assert_eq!(store.next_phrase_number("amy").unwrap(), 6);
    }

    #[test]
    fn test_enroll_twice_is_refused() {
        let dir = TempDir::new().expect("create temp dir");
        let store = SampleStore::new(dir.path());
        let config = TypesigConfig::default_with_dir(dir.path());
        let enrollment = Enrollment::new(&store, &config);

        enrollment
            .enroll("bo", &mut ScriptedSource::new(&[("abc", 1.0)]), 1)
            .unwrap();
        let again = enrollment.enroll("bo", &mut ScriptedSource::new(&[("abc", 1.0)]), 1);
        assert!(matches!(again, Err(BiometricError::AlreadyEnrolled(_))));
    }

    #[test]
    fn test_enroll_over_empty_record() {
        let dir = TempDir::new().expect("create temp dir");
        let store = SampleStore::new(dir.path());
        std::fs::write(store.path_for("cy").unwrap(), "[]").unwrap();
        let config = TypesigConfig::default_with_dir(dir.path());

        let report = Enrollment::new(&store, &config)
            .enroll("cy", &mut ScriptedSource::new(&[("abc", 1.0)]), 1)
            .unwrap();
        assert_eq!(report.first_phrase_number, 1);
    }

    #[test]
    fn test_bad_phrase_aborts_whole_batch() {
        let dir = TempDir::new().expect("create temp dir");
        let store = SampleStore::new(dir.path());
        let config = TypesigConfig::default_with_dir(dir.path());

        let mut source = ScriptedSource::new(&[("fine", 1.0), ("", 1.0), ("never", 1.0)]);
        let result = Enrollment::new(&store, &config).enroll("di", &mut source, 3);
        assert!(matches!(result, Err(BiometricError::InvalidInput(_))));
        assert_eq!(store.presence("di").unwrap(), StorePresence::Absent);
        assert_eq!(source.requests.len(), 2);
    }

    #[test]
    fn test_regression_can_be_disabled() {
        let dir = TempDir::new().expect("create temp dir");
        let store = SampleStore::new(dir.path());
        let mut config = TypesigConfig::default_with_dir(dir.path());
        config.regression.enabled = false;

        let phrases: Vec<(&str, f64)> = (0..6)
            .map(|i| ("typing", 1.0 + i as f64 * 0.1))
            .collect();
        let report = Enrollment::new(&store, &config)
            .enroll("ed", &mut ScriptedSource::new(&phrases), 6)
            .unwrap();
        assert!(report.cross_validation.is_none());
    }
}
