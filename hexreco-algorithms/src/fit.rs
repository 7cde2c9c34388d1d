//! Weighted least-squares polynomial fitting.
#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
//!
//! The abscissae are shifted to their mean and scaled to `[-1, 1]` before the
//! design matrix is built, which keeps cubic fits over detector depths of a
//! few hundred millimetres well conditioned. The system is solved through an
//! SVD so rank deficiency is detected instead of producing garbage.

use hexreco_core::FitError;
use nalgebra::{DMatrix, DVector};

/// Relative singular-value threshold below which a direction counts as absent.
const RANK_TOLERANCE: f64 = 1e-10;

/// A polynomial in a shifted and scaled variable `t = (x - origin) / scale`.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    coefficients: Vec<f64>,
    origin: f64,
    scale: f64,
    range: (f64, f64),
}

impl Polynomial {
    /// Coefficients of increasing power in the normalised variable.
    #[must_use]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Degree of the polynomial.
    #[must_use]
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Abscissa range the polynomial was fitted on, padded by one unit.
    #[must_use]
    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    /// Evaluates the polynomial at `x` (Horner's rule).
    #[must_use]
    pub fn eval(&self, x: f64) -> f64 {
        let t = (x - self.origin) / self.scale;
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc.mul_add(t, c))
    }
}

/// Fits `y(x)` with a polynomial of the given degree.
///
/// Each point is weighted by `1 / y_err²`. Points whose error is not a
/// positive finite number are left out, unless no point carries a usable
/// error, in which case every point gets unit weight.
///
/// # Errors
/// - [`FitError::LengthMismatch`] if the slices differ in length
/// - [`FitError::NonFiniteInput`] if a coordinate is NaN or infinite
/// - [`FitError::InsufficientPoints`] if fewer than `degree + 1` points remain
/// - [`FitError::RankDeficient`] if the points do not pin down every coefficient
///   (for example too few distinct abscissae)
pub fn fit_polynomial(
    x: &[f64],
    y: &[f64],
    y_err: &[f64],
    degree: usize,
) -> Result<Polynomial, FitError> {
    if x.len() != y.len() || x.len() != y_err.len() {
        return Err(FitError::LengthMismatch {
            x: x.len(),
            y: y.len(),
            errors: y_err.len(),
        });
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(FitError::NonFiniteInput);
    }

    let weights = point_weights(y_err);
    let usable: Vec<usize> = (0..x.len()).filter(|&i| weights[i] > 0.0).collect();
    let required = degree + 1;
    if usable.len() < required {
        return Err(FitError::InsufficientPoints {
            usable: usable.len(),
            required,
        });
    }

    let (min_x, max_x) = usable
        .iter()
        .map(|&i| x[i])
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    let origin = usable.iter().map(|&i| x[i]).sum::<f64>() / usable.len() as f64;
    let half_span = (max_x - origin).max(origin - min_x);
    let scale = if half_span > 0.0 { half_span } else { 1.0 };

    let design = DMatrix::from_fn(usable.len(), required, |row, col| {
        let i = usable[row];
        weights[i].sqrt() * ((x[i] - origin) / scale).powi(col as i32)
    });
    let rhs = DVector::from_iterator(
        usable.len(),
        usable.iter().map(|&i| weights[i].sqrt() * y[i]),
    );

    let svd = design.svd(true, true);
    let tolerance = svd.singular_values.max() * RANK_TOLERANCE;
    let rank = svd.rank(tolerance);
    if rank < required {
        return Err(FitError::RankDeficient { rank, required });
    }

    let solution = svd
        .solve(&rhs, tolerance)
        .map_err(|e| FitError::Solver(e.to_string()))?;
    let coefficients: Vec<f64> = solution.iter().copied().collect();
    if coefficients.iter().any(|c| !c.is_finite()) {
        return Err(FitError::NonFiniteInput);
    }

    Ok(Polynomial {
        coefficients,
        origin,
        scale,
        range: (min_x - 1.0, max_x + 1.0),
    })
}

fn point_weights(errors: &[f64]) -> Vec<f64> {
    let has_errors = errors.iter().any(|&e| e.is_finite() && e > 0.0);
    errors
        .iter()
        .map(|&e| {
            if !has_errors {
                1.0
            } else if e.is_finite() && e > 0.0 {
                1.0 / (e * e)
            } else {
                0.0
            }
        })
        .collect()
}
