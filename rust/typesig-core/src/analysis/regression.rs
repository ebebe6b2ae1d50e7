//! Linear model of hold time over standardized typing features, with K-fold
//! cross-validation. Reported after collection as telemetry; the authenticator
//! never consults it.

use crate::error::{BiometricError, Result};
use crate::sample::Sample;
use serde::Serialize;

const N_FEATURES: usize = 3;
const PIVOT_EPSILON: f64 = 1e-12;

type Row = [f64; N_FEATURES];

fn rows_of(samples: &[Sample]) -> Vec<Row> {
    samples
        .iter()
        .map(|s| [s.typing_speed, s.hold_time, s.key_press_dynamics])
        .collect()
}

/// Centers each column and divides by its population standard deviation.
/// Constant columns keep a scale of 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StandardScaler {
    pub mean: Row,
    pub scale: Row,
}

impl StandardScaler {
    pub fn fit(rows: &[Row]) -> Result<Self> {
        if rows.is_empty() {
            return Err(BiometricError::InsufficientData(
                "scaler needs at least one row".to_string(),
            ));
        }
        let n = rows.len() as f64;
        let mut mean = [0.0; N_FEATURES];
        let mut scale = [0.0; N_FEATURES];

        for (j, (m, s)) in mean.iter_mut().zip(scale.iter_mut()).enumerate() {
            *m = rows.iter().map(|r| r[j]).sum::<f64>() / n;
            let var = rows.iter().map(|r| (r[j] - *m).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            *s = if std > 0.0 { std } else { 1.0 };
        }
        Ok(Self { mean, scale })
    }

    pub fn transform(&self, row: &Row) -> Row {
        let mut out = [0.0; N_FEATURES];
        for (j, value) in out.iter_mut().enumerate() {
            *value = (row[j] - self.mean[j]) / self.scale[j];
        }
        out
    }
}

/// Ridge regression fitted through the normal equations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TypingModel {
    pub coefficients: Row,
    pub intercept: f64,
}

impl TypingModel {
    pub fn fit(x: &[Row], y: &[f64], alpha: f64) -> Result<Self> {
        if x.is_empty() || x.len() != y.len() {
            return Err(BiometricError::InsufficientData(format!(
                "cannot fit {} rows against {} targets",
                x.len(),
                y.len()
            )));
        }
        let n = x.len() as f64;

        let mut x_mean = [0.0; N_FEATURES];
        for (j, m) in x_mean.iter_mut().enumerate() {
            *m = x.iter().map(|r| r[j]).sum::<f64>() / n;
        }
        let y_mean = y.iter().sum::<f64>() / n;

        let mut gram = [[0.0; N_FEATURES]; N_FEATURES];
        let mut rhs = [0.0; N_FEATURES];
        for (row, &target) in x.iter().zip(y) {
            let centered: Row = std::array::from_fn(|j| row[j] - x_mean[j]);
            for ((gram_row, r), xi) in gram.iter_mut().zip(rhs.iter_mut()).zip(&centered) {
                *r += xi * (target - y_mean);
                for (g, xj) in gram_row.iter_mut().zip(&centered) {
                    *g += xi * xj;
                }
            }
        }
        for (i, diag) in gram.iter_mut().enumerate() {
            diag[i] += alpha;
        }

        let coefficients = solve(gram, rhs).ok_or_else(|| {
            BiometricError::InsufficientData("regression system is singular".to_string())
        })?;
        let intercept = y_mean
            - coefficients
                .iter()
                .zip(x_mean.iter())
                .map(|(w, m)| w * m)
                .sum::<f64>();

        Ok(Self {
            coefficients,
            intercept,
        })
    }

    pub fn predict(&self, row: &Row) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row.iter())
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: [[f64; N_FEATURES]; N_FEATURES], mut b: Row) -> Option<Row> {
    for col in 0..N_FEATURES {
        let pivot = (col..N_FEATURES)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < PIVOT_EPSILON {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        let pivot_row = a[col];
        let pivot_b = b[col];
        for (row, rhs) in a.iter_mut().zip(b.iter_mut()).skip(col + 1) {
            let factor = row[col] / pivot_row[col];
            for (value, p) in row.iter_mut().zip(&pivot_row).skip(col) {
                *value -= factor * p;
            }
            *rhs -= factor * pivot_b;
        }
    }

    let mut x = [0.0; N_FEATURES];
    for row in (0..N_FEATURES).rev() {
        let tail: f64 = ((row + 1)..N_FEATURES).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

/// Coefficient of determination. NaN for fewer than two points.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.len() < 2 || y_true.len() != y_pred.len() {
        return f64::NAN;
    }
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossValidation {
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    /// Model refitted on every sample.
    pub model: Option<TypingModel>,
}

/// Contiguous K-fold split sizes; the first `n % k` folds get one extra sample.
fn fold_sizes(n: usize, folds: usize) -> Vec<usize> {
    (0..folds)
        .map(|i| n / folds + usize::from(i < n % folds))
        .collect()
}

/// K-fold cross-validation of [`TypingModel`] predicting hold time.
///
/// Returns `None` when there are fewer samples than folds.
pub fn cross_validate(samples: &[Sample], folds: usize, alpha: f64) -> Option<CrossValidation> {
    if folds < 2 || samples.len() < folds {
        return None;
    }

    let raw = rows_of(samples);
    let scaler = StandardScaler::fit(&raw).ok()?;
    let x: Vec<Row> = raw.iter().map(|r| scaler.transform(r)).collect();
    let y: Vec<f64> = samples.iter().map(|s| s.hold_time).collect();

    let mut fold_scores = Vec::with_capacity(folds);
    let mut start = 0;
    for size in fold_sizes(samples.len(), folds) {
        let end = start + size;
        let train_x: Vec<Row> = x[..start].iter().chain(&x[end..]).copied().collect();
        let train_y: Vec<f64> = y[..start].iter().chain(&y[end..]).copied().collect();

        let score = match TypingModel::fit(&train_x, &train_y, alpha) {
            Ok(model) => {
                let predicted: Vec<f64> =
                    x[start..end].iter().map(|r| model.predict(r)).collect();
                r2_score(&y[start..end], &predicted)
            }
            Err(e) => {
                log::debug!("fold {start}..{end} not fitted: {e}");
                f64::NAN
            }
        };
        fold_scores.push(score);
        start = end;
    }

    let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
    let model = TypingModel::fit(&x, &y, alpha).ok();

    Some(CrossValidation {
        fold_scores,
        mean_score,
        model,
    })
}
