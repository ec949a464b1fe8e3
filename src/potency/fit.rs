use std::collections::BTreeMap;
use std::time::Duration;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::aggregate::{aggregate, DoseGroup};
use super::model::{ll4, p_dose, Ll4Params, MICROMOLAR};
use crate::data::DoseResponseObservation;
use crate::error::{Diagnostic, FitFailure, Outcome};
use crate::optimize::{minimize, Ll4Problem, SolverSettings};
use crate::pool;

/// Dose-response fitting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    /// Multiplier converting doses to molar for the log-dose transform (default: 1e-6)
    pub unit_factor: f64,
    /// Minimum number of dose groups for a fit (default: 4, one per parameter)
    pub min_groups: usize,
    pub solver: SolverSettings,
    /// Worker threads for per-compound fits (None = global rayon pool)
    pub threads: Option<usize>,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            unit_factor: MICROMOLAR,
            min_groups: 4,
            solver: SolverSettings::default(),
            threads: None,
        }
    }
}

impl FitOptions {
    pub fn with_unit_factor(mut self, unit_factor: f64) -> Self {
        self.unit_factor = unit_factor;
        self
    }

    /// Per-fit time limit; `None` disables it
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.solver.timeout = timeout;
        self
    }

    pub fn with_solver(mut self, solver: SolverSettings) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }
}

/// Converged LL.4 fit of one compound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseResponseFit {
    pub compound_id: String,
    pub hill_slope: f64,
    pub min_response: f64,
    pub max_response: f64,
    pub ec50: f64,
    /// Residual sum of squares over the dose group means
    pub residuals: f64,
    /// Squared correlation of observed and fitted responses
    pub r_squared: Option<f64>,
    /// Number of dose groups fitted
    pub n: usize,
    pub iterations: u64,
}

/// A point on a fitted curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurvePoint {
    pub dose: f64,
    pub log_dose: f64,
    pub response: f64,
}

impl DoseResponseFit {
    pub fn params(&self) -> Ll4Params {
        Ll4Params::new(self.hill_slope, self.min_response, self.max_response, self.ec50)
    }

    pub fn predict(&self, dose: f64) -> f64 {
        ll4(dose, &self.params())
    }

    /// Fitted response at the EC50
    pub fn ec50_response(&self) -> f64 {
        self.params().midpoint()
    }

    /// EC50 on the negative log molar scale
    pub fn p_ec50(&self, unit_factor: f64) -> f64 {
        p_dose(self.ec50, unit_factor)
    }

    /// Fitted curve sampled linearly over `[0.55 min_dose, 1.6 max_dose]`
    pub fn reference_curve(
        &self,
        min_dose: f64,
        max_dose: f64,
        points: usize,
        unit_factor: f64,
    ) -> Vec<CurvePoint> {
        let low = min_dose * 0.55;
        let high = max_dose * 1.6;
        let step = if points > 1 {
            (high - low) / (points - 1) as f64
        } else {
            0.0
        };
        (0..points)
            .map(|i| {
                let dose = low + step * i as f64;
                CurvePoint {
                    dose,
                    log_dose: p_dose(dose, unit_factor),
                    response: self.predict(dose),
                }
            })
            .collect()
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Squared Pearson correlation, undefined when either series is constant
pub fn r_squared(observed: &[f64], predicted: &[f64]) -> Option<f64> {
    let n = observed.len();
    if n < 2 || n != predicted.len() {
        return None;
    }
    let mx = observed.iter().sum::<f64>() / n as f64;
    let my = predicted.iter().sum::<f64>() / n as f64;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in observed.iter().zip(predicted) {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx).powi(2);
        syy += (y - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some(sxy * sxy / (sxx * syy))
}

/// Explicit starting point: b = 1, c = min, d = max, e = median dose
pub fn initial_guess(groups: &[DoseGroup]) -> Ll4Params {
    let doses: Vec<f64> = groups.iter().map(|g| g.dose).collect();
    let (min, max) = groups
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), g| {
            (lo.min(g.mean), hi.max(g.mean))
        });
    Ll4Params::new(1.0, min, max, median(&doses))
}

/// Fit the LL.4 model to the dose group means of one compound
pub fn fit_compound(
    compound_id: &str,
    groups: &[DoseGroup],
    options: &FitOptions,
) -> Result<DoseResponseFit, FitFailure> {
    // at least one group is needed for the initial guess
    let required = options.min_groups.max(1);
    if groups.len() < required {
        return Err(FitFailure::InsufficientData {
            groups: groups.len(),
            required,
        });
    }

    let doses: Vec<f64> = groups.iter().map(|g| g.dose).collect();
    let means: Vec<f64> = groups.iter().map(|g| g.mean).collect();
    let problem = Ll4Problem::new(&doses, &means, options.solver.timeout);
    let minimum = minimize(problem, initial_guess(groups), &options.solver)?;

    let p = minimum.params;
    let predicted: Vec<f64> = doses.iter().map(|&x| ll4(x, &p)).collect();
    tracing::debug!(
        compound = compound_id,
        ec50 = p.e,
        hill_slope = p.b,
        iterations = minimum.iterations,
        "fitted dose-response curve"
    );

    Ok(DoseResponseFit {
        compound_id: compound_id.to_string(),
        hill_slope: p.b,
        min_response: p.c,
        max_response: p.d,
        ec50: p.e,
        residuals: minimum.rss,
        r_squared: r_squared(&means, &predicted),
        n: groups.len(),
        iterations: minimum.iterations,
    })
}

/// Fit every compound of already aggregated (and possibly pruned) dose groups
///
/// Compounds are fitted independently; a failed fit is reported as a
/// diagnostic and leaves no entry in the output.
pub fn fit_groups(
    compounds: &BTreeMap<String, Vec<DoseGroup>>,
    options: &FitOptions,
) -> Outcome<Vec<DoseResponseFit>> {
    let results: Vec<(&String, Result<DoseResponseFit, FitFailure>)> =
        pool::install(options.threads, || {
            compounds
                .par_iter()
                .map(|(compound, groups)| (compound, fit_compound(compound, groups, options)))
                .collect()
        });

    let mut outcome = Outcome::new(Vec::with_capacity(results.len()));
    for (compound, result) in results {
        match result {
            Ok(fit) => outcome.value.push(fit),
            Err(failure) => outcome.warn(Diagnostic::FitFailed {
                compound: compound.clone(),
                failure,
            }),
        }
    }
    tracing::info!(
        "Fitted {} of {} compounds",
        outcome.value.len(),
        compounds.len()
    );
    outcome
}

/// Drop unusable rows, aggregate replicates and fit every compound
pub fn fit_dose_response(
    observations: &[DoseResponseObservation],
    options: &FitOptions,
) -> Outcome<Vec<DoseResponseFit>> {
    let grouped = aggregate(observations, options.unit_factor);
    let mut fits = fit_groups(&grouped.value, options);
    let mut diagnostics = grouped.diagnostics;
    diagnostics.append(&mut fits.diagnostics);
    fits.diagnostics = diagnostics;
    fits
}
