//! Polynomial fit of response against log dose
//!
//! A fallback model for compounds whose response is not sigmoidal. Unlike the
//! LL.4 fit, every replicate enters the least-squares problem.

use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::aggregate::is_fittable;
use super::fit::r_squared;
use super::model::{p_dose, MICROMOLAR};
use crate::data::DoseResponseObservation;
use crate::error::{Diagnostic, FitFailure, Outcome};
use crate::pool;

/// Singular values below this are treated as zero in the least-squares solve
const SVD_EPS: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolyOptions {
    /// Polynomial degree (default: 2)
    pub degree: usize,
    /// Samples in the fitted curve (default: 256)
    pub points: usize,
    /// Multiplier converting doses to molar for the log-dose transform (default: 1e-6)
    pub unit_factor: f64,
    /// Worker threads for per-compound fits (None = global rayon pool)
    pub threads: Option<usize>,
}

impl Default for PolyOptions {
    fn default() -> Self {
        Self {
            degree: 2,
            points: 256,
            unit_factor: MICROMOLAR,
            threads: None,
        }
    }
}

impl PolyOptions {
    pub fn with_degree(mut self, degree: usize) -> Self {
        self.degree = degree;
        self
    }

    pub fn with_points(mut self, points: usize) -> Self {
        self.points = points;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }
}

/// Least-squares polynomial coefficients in ascending powers of `x`
///
/// Needs at least `degree + 1` distinct `x` values.
pub fn polyfit(x: &[f64], y: &[f64], degree: usize) -> Result<Vec<f64>, FitFailure> {
    let mut distinct = x.to_vec();
    distinct.sort_by(f64::total_cmp);
    distinct.dedup();
    if x.len() != y.len() || distinct.len() < degree + 1 {
        return Err(FitFailure::InsufficientData {
            groups: distinct.len(),
            required: degree + 1,
        });
    }

    let vandermonde = DMatrix::from_fn(x.len(), degree + 1, |i, j| x[i].powi(j as i32));
    let rhs = DVector::from_column_slice(y);
    let coefficients = vandermonde
        .svd(true, true)
        .solve(&rhs, SVD_EPS)
        .map_err(|e| FitFailure::Solver(e.to_string()))?;

    if coefficients.iter().any(|c| !c.is_finite()) {
        return Err(FitFailure::NonFinite);
    }
    Ok(coefficients.iter().copied().collect())
}

/// Evaluate ascending-power coefficients at `x`
pub fn polyval(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// A point of a sampled polynomial curve
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolyPoint {
    pub log_dose: f64,
    pub response: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolynomialFit {
    pub compound_id: String,
    pub degree: usize,
    /// Ascending powers of log dose
    pub coefficients: Vec<f64>,
    pub residuals: f64,
    pub r_squared: Option<f64>,
    /// Replicate rows used
    pub n: usize,
    pub min_log_dose: f64,
    pub max_log_dose: f64,
}

impl PolynomialFit {
    pub fn predict(&self, log_dose: f64) -> f64 {
        polyval(&self.coefficients, log_dose)
    }

    /// `points` evenly spaced samples over `[0.98 min, 1.02 max]` log dose
    pub fn curve(&self, points: usize) -> Vec<PolyPoint> {
        let lo = 0.98 * self.min_log_dose;
        let hi = 1.02 * self.max_log_dose;
        let step = if points > 1 {
            (hi - lo) / (points - 1) as f64
        } else {
            0.0
        };
        (0..points)
            .map(|i| {
                let log_dose = lo + step * i as f64;
                PolyPoint {
                    log_dose,
                    response: self.predict(log_dose),
                }
            })
            .collect()
    }
}

/// Fit one compound from its `(dose, response)` replicates
pub fn fit_polynomial(
    compound_id: &str,
    rows: &[(f64, f64)],
    options: &PolyOptions,
) -> Result<PolynomialFit, FitFailure> {
    let x: Vec<f64> = rows
        .iter()
        .map(|&(dose, _)| p_dose(dose, options.unit_factor))
        .collect();
    let y: Vec<f64> = rows.iter().map(|&(_, response)| response).collect();
    let coefficients = polyfit(&x, &y, options.degree)?;

    let predicted: Vec<f64> = x.iter().map(|&v| polyval(&coefficients, v)).collect();
    let residuals = y
        .iter()
        .zip(&predicted)
        .map(|(obs, pred)| (obs - pred).powi(2))
        .sum();
    let (min_log_dose, max_log_dose) = x
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    tracing::debug!(
        compound = compound_id,
        degree = options.degree,
        "fitted polynomial"
    );

    Ok(PolynomialFit {
        compound_id: compound_id.to_string(),
        degree: options.degree,
        coefficients,
        residuals,
        r_squared: r_squared(&y, &predicted),
        n: rows.len(),
        min_log_dose,
        max_log_dose,
    })
}

/// Drop unusable rows and fit a polynomial to every compound
pub fn fit_polynomials(
    observations: &[DoseResponseObservation],
    options: &PolyOptions,
) -> Outcome<Vec<PolynomialFit>> {
    let mut by_compound: BTreeMap<&str, Vec<(f64, f64)>> = BTreeMap::new();
    let mut dropped = 0;
    for obs in observations {
        if is_fittable(obs) {
            by_compound
                .entry(obs.compound_id.as_str())
                .or_default()
                .push((obs.dose, obs.response));
        } else {
            dropped += 1;
        }
    }

    let results: Vec<(&str, Result<PolynomialFit, FitFailure>)> =
        pool::install(options.threads, || {
            by_compound
                .par_iter()
                .map(|(&compound, rows)| (compound, fit_polynomial(compound, rows, options)))
                .collect()
        });

    let mut outcome = Outcome::new(Vec::with_capacity(results.len()));
    if dropped > 0 {
        outcome.warn(Diagnostic::DroppedRows {
            context: "dose-response rows with zero or invalid dose or response".to_string(),
            count: dropped,
        });
    }
    for (compound, result) in results {
        match result {
            Ok(fit) => outcome.value.push(fit),
            Err(failure) => outcome.warn(Diagnostic::FitFailed {
                compound: compound.to_string(),
                failure,
            }),
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn recovers_an_exact_quadratic() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let y: Vec<f64> = x.iter().map(|v| 2.0 - 3.0 * v + 0.5 * v * v).collect();
        let c = polyfit(&x, &y, 2).unwrap();
        assert_eq!(c.len(), 3);
        assert_relative_eq!(c[0], 2.0, epsilon = 1e-8);
        assert_relative_eq!(c[1], -3.0, epsilon = 1e-8);
        assert_relative_eq!(c[2], 0.5, epsilon = 1e-8);
        assert_relative_eq!(polyval(&c, 10.0), 22.0, epsilon = 1e-6);
    }

    #[test]
    fn line_through_noisy_replicates_is_least_squares() {
        // symmetric scatter around y = 1 + 2x
        let x = [0.0, 0.0, 1.0, 1.0, 2.0, 2.0];
        let y = [0.5, 1.5, 2.5, 3.5, 4.5, 5.5];
        let c = polyfit(&x, &y, 1).unwrap();
        assert_relative_eq!(c[0], 1.0, epsilon = 1e-10);
        assert_relative_eq!(c[1], 2.0, epsilon = 1e-10);
    }

    #[test]
    fn replicates_do_not_count_as_distinct_doses() {
        let x = [1.0, 1.0, 2.0, 2.0];
        let y = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(
            polyfit(&x, &y, 2),
            Err(FitFailure::InsufficientData {
                groups: 2,
                required: 3
            })
        );
    }

    #[test]
    fn curve_spans_the_padded_log_dose_range() {
        let rows = [(1.0, 10.0), (10.0, 30.0), (100.0, 20.0), (1000.0, 5.0)];
        let fit = fit_polynomial("c1", &rows, &PolyOptions::default()).unwrap();
        assert_eq!(fit.n, 4);
        assert_relative_eq!(fit.min_log_dose, 3.0, epsilon = 1e-12);
        assert_relative_eq!(fit.max_log_dose, 6.0, epsilon = 1e-12);

        let curve = fit.curve(PolyOptions::default().points);
        assert_eq!(curve.len(), 256);
        assert_relative_eq!(curve[0].log_dose, 2.94, epsilon = 1e-12);
        assert_relative_eq!(curve[255].log_dose, 6.12, epsilon = 1e-12);
        assert_relative_eq!(curve[100].response, fit.predict(curve[100].log_dose));
    }

    #[test]
    fn batch_reports_dropped_rows_and_failures() {
        let mut obs: Vec<DoseResponseObservation> = [1.0, 10.0, 100.0, 1000.0]
            .iter()
            .map(|&d| DoseResponseObservation::new("bell", d, 50.0 - (d.log10() - 1.5).powi(2)))
            .collect();
        obs.push(DoseResponseObservation::new("bell", 0.0, 12.0));
        obs.push(DoseResponseObservation::new("flat", 1.0, 3.0));
        obs.push(DoseResponseObservation::new("flat", 2.0, 3.0));

        let outcome = fit_polynomials(&obs, &PolyOptions::default().with_threads(2));
        assert_eq!(outcome.value.len(), 1);
        let bell = &outcome.value[0];
        assert_eq!(bell.compound_id, "bell");
        assert_relative_eq!(bell.r_squared.unwrap(), 1.0, epsilon = 1e-9);
        assert!(bell.residuals < 1e-9);

        assert!(outcome
            .diagnostics
            .contains(&Diagnostic::DroppedRows {
                context: "dose-response rows with zero or invalid dose or response".into(),
                count: 1
            }));
        assert!(outcome.diagnostics.contains(&Diagnostic::FitFailed {
            compound: "flat".into(),
            failure: FitFailure::InsufficientData {
                groups: 2,
                required: 3
            }
        }));
    }
}
