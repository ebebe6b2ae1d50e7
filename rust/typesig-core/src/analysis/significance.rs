//! Two-sample significance tests of a new observation against history.
//!
//! The new observation forms a group of one. That group has no within-group
//! variance, so it contributes zero to the pooled sum of squares; the results
//! can be NaN or infinite and are passed through as-is.

use crate::sample::{feature_series, FeatureVector, PerFeature, Sample};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};
use std::fmt;

/// Default significance level.
pub const DEFAULT_ALPHA: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TestResult {
    pub statistic: f64,
    pub p_value: f64,
}

impl TestResult {
    fn undefined() -> Self {
        Self {
            statistic: f64::NAN,
            p_value: f64::NAN,
        }
    }

    pub fn significance(&self, alpha: f64) -> Significance {
        if self.p_value.is_nan() {
            Significance::Undetermined
        } else if self.p_value < alpha {
            Significance::Significant
        } else {
            Significance::NotSignificant
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Significance {
    Significant,
    NotSignificant,
    /// The p-value is NaN.
    Undetermined,
}

impl fmt::Display for Significance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Significance::Significant => "significantly different",
            Significance::NotSignificant => "not significantly different",
            Significance::Undetermined => "undetermined",
        };
        f.write_str(s)
    }
}

struct GroupStats {
    n: f64,
    mean: f64,
    ss: f64,
}

fn group_stats(values: &[f64]) -> GroupStats {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let ss = values.iter().map(|x| (x - mean).powi(2)).sum();
    GroupStats { n, mean, ss }
}

/// Pooled-variance Student t-test with a two-sided p-value.
pub fn t_test_ind(a: &[f64], b: &[f64]) -> TestResult {
    if a.is_empty() || b.is_empty() {
        return TestResult::undefined();
    }
    let ga = group_stats(a);
    let gb = group_stats(b);

    let df = ga.n + gb.n - 2.0;
    if df <= 0.0 {
        return TestResult::undefined();
    }

    let pooled = (ga.ss + gb.ss) / df;
    let se = (pooled * (1.0 / ga.n + 1.0 / gb.n)).sqrt();
    let statistic = (ga.mean - gb.mean) / se;

    let p_value = if statistic.is_nan() {
        f64::NAN
    } else if statistic.is_infinite() {
        0.0
    } else {
        StudentsT::new(0.0, 1.0, df)
            .map(|dist| (2.0 * dist.sf(statistic.abs())).min(1.0))
            .unwrap_or(f64::NAN)
    };

    TestResult { statistic, p_value }
}

/// One-way analysis of variance across `groups`.
pub fn f_oneway(groups: &[&[f64]]) -> TestResult {
    if groups.len() < 2 || groups.iter().any(|g| g.is_empty()) {
        return TestResult::undefined();
    }

    let stats: Vec<GroupStats> = groups.iter().map(|g| group_stats(g)).collect();
    let total_n: f64 = stats.iter().map(|g| g.n).sum();
    let grand_mean = stats.iter().map(|g| g.n * g.mean).sum::<f64>() / total_n;

    let ss_between: f64 = stats
        .iter()
        .map(|g| g.n * (g.mean - grand_mean).powi(2))
        .sum();
    let ss_within: f64 = stats.iter().map(|g| g.ss).sum();

    let df_between = groups.len() as f64 - 1.0;
    let df_within = total_n - groups.len() as f64;
    if df_within <= 0.0 {
        return TestResult::undefined();
    }

    let statistic = (ss_between / df_between) / (ss_within / df_within);
    let p_value = if statistic.is_nan() {
        f64::NAN
    } else if statistic.is_infinite() {
        0.0
    } else {
        FisherSnedecor::new(df_between, df_within)
            .map(|dist| dist.sf(statistic))
            .unwrap_or(f64::NAN)
    };

    TestResult { statistic, p_value }
}

/// t- and F-test results for every feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignificanceReport {
    pub alpha: f64,
    pub t_tests: PerFeature<TestResult>,
    pub f_tests: PerFeature<TestResult>,
}

impl SignificanceReport {
    pub fn t_significance(&self) -> PerFeature<Significance> {
        self.t_tests.map(|_, r| r.significance(self.alpha))
    }

    pub fn f_significance(&self) -> PerFeature<Significance> {
        self.f_tests.map(|_, r| r.significance(self.alpha))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SignificanceTester {
    alpha: f64,
}

impl Default for SignificanceTester {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}

impl SignificanceTester {
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    /// Compares each feature of `observation` with the same feature across `history`.
    pub fn evaluate(&self, history: &[Sample], observation: &FeatureVector) -> SignificanceReport {
        let series = feature_series(history);

        let t_tests = series.map(|feature, values| {
            t_test_ind(values, &[*observation.get(feature)])
        });
        let f_tests = series.map(|feature, values| {
            let single = [*observation.get(feature)];
            f_oneway(&[values.as_slice(), &single[..]])
        });

        for (feature, result) in t_tests.iter() {
            log::debug!(
                "t-test {feature}: t = {:.6}, p = {:.6}",
                result.statistic,
                result.p_value
            );
        }
        for (feature, result) in f_tests.iter() {
            log::debug!(
                "F-test {feature}: F = {:.6}, p = {:.6}",
                result.statistic,
                result.p_value
            );
        }

        SignificanceReport {
            alpha: self.alpha,
            t_tests,
            f_tests,
        }
    }
}
