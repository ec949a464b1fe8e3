use std::time::{Duration, Instant};

use anyhow::Error;
use argmin::{
    core::{CostFunction, Executor, State, TerminationReason},
    solver::neldermead::NelderMead,
};
use serde::{Deserialize, Serialize};

use crate::error::FitFailure;
use crate::potency::model::{ll4, Ll4Params};

/// Nelder–Mead settings for one LL.4 fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Iteration cap per solver run (default: 5000)
    pub max_iters: u64,
    /// Standard deviation of the simplex costs at which a run has converged
    /// (default: 1e-12; costs are normalized by the total sum of squares)
    pub tolerance: f64,
    /// Additional runs restarted from the best point (default: 2)
    pub restarts: usize,
    /// Wall-clock limit for the whole fit (default: 10 s, None = unlimited)
    pub timeout: Option<Duration>,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iters: 5000,
            tolerance: 1e-12,
            restarts: 2,
            timeout: Some(Duration::from_secs(10)),
        }
    }
}

/// Least-squares objective of the LL.4 model over `(dose, response)` pairs
///
/// Parameters are `[b, c, d, ln e]`.
#[derive(Debug, Clone, Copy)]
pub struct Ll4Problem<'a> {
    doses: &'a [f64],
    responses: &'a [f64],
    /// Total sum of squares, normalizes the cost
    scale: f64,
    started: Instant,
    timeout: Option<Duration>,
}

impl<'a> Ll4Problem<'a> {
    pub fn new(doses: &'a [f64], responses: &'a [f64], timeout: Option<Duration>) -> Self {
        let n = responses.len().max(1) as f64;
        let mean = responses.iter().sum::<f64>() / n;
        let tss: f64 = responses.iter().map(|r| (r - mean).powi(2)).sum();
        Self {
            doses,
            responses,
            scale: if tss > 0.0 { tss } else { 1.0 },
            started: Instant::now(),
            timeout,
        }
    }

    /// Residual sum of squares at `params`
    pub fn rss(&self, params: &Ll4Params) -> f64 {
        self.doses
            .iter()
            .zip(self.responses)
            .map(|(&x, &y)| (y - ll4(x, params)).powi(2))
            .sum()
    }
}

impl CostFunction for Ll4Problem<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        if let Some(limit) = self.timeout {
            if self.started.elapsed() >= limit {
                return Err(FitFailure::Timeout { limit }.into());
            }
        }
        let rss = self.rss(&Ll4Params::from_theta(theta)) / self.scale;
        Ok(if rss.is_finite() { rss } else { f64::MAX })
    }
}

/// Best parameters found by [`minimize`]
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub params: Ll4Params,
    pub rss: f64,
    pub iterations: u64,
}

fn initial_simplex(point: &[f64], steps: &[f64]) -> Vec<Vec<f64>> {
    let mut vertices = Vec::with_capacity(point.len() + 1);
    vertices.push(point.to_vec());
    for (i, step) in steps.iter().enumerate() {
        let mut perturbed = point.to_vec();
        perturbed[i] += step;
        vertices.push(perturbed);
    }
    vertices
}

/// Vertex offsets scaled to the response range
fn simplex_steps(initial: &Ll4Params) -> Vec<f64> {
    let span = (initial.d - initial.c).abs();
    let level = if span > 0.0 {
        0.1 * span
    } else if initial.d != 0.0 {
        0.1 * initial.d.abs()
    } else {
        0.1
    };
    vec![0.5, level, level, 0.5]
}

fn classify(err: Error) -> FitFailure {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<FitFailure>())
        .cloned()
        .unwrap_or_else(|| FitFailure::Solver(err.to_string()))
}

/// Minimize the LL.4 residuals starting from `initial`
///
/// Each restart rebuilds the simplex around the best point so far. The fit
/// is accepted only if the final run met the tolerance.
pub fn minimize(
    problem: Ll4Problem<'_>,
    initial: Ll4Params,
    settings: &SolverSettings,
) -> Result<Minimum, FitFailure> {
    let steps = simplex_steps(&initial);
    let mut theta = initial.to_theta();
    let mut best_cost = f64::INFINITY;
    let mut iterations = 0;
    let mut converged = false;
    let mut last_reason = String::new();

    for round in 0..=settings.restarts {
        let solver: NelderMead<Vec<f64>, f64> = NelderMead::new(initial_simplex(&theta, &steps))
            .with_sd_tolerance(settings.tolerance)
            .map_err(classify)?;
        let res = Executor::new(problem, solver)
            .configure(|state| state.max_iters(settings.max_iters))
            .run()
            .map_err(classify)?;

        iterations += res.state.get_iter();
        let cost = res.state.get_best_cost();
        converged = matches!(
            res.state.get_termination_reason(),
            Some(TerminationReason::SolverConverged)
        );
        last_reason = format!("{:?}", res.state.get_termination_reason());
        let improvement = best_cost - cost;
        if let Some(best) = res.state.best_param {
            if cost <= best_cost {
                theta = best;
                best_cost = cost;
            }
        }
        tracing::trace!(round, cost, converged, "LL.4 solver run finished");

        if converged && improvement.abs() <= settings.tolerance.max(1e-12 * best_cost) {
            break;
        }
    }

    if !converged {
        return Err(FitFailure::NotConverged {
            iterations,
            reason: last_reason,
        });
    }
    let params = Ll4Params::from_theta(&theta);
    if !params.is_finite() {
        return Err(FitFailure::NonFinite);
    }
    Ok(Minimum {
        params,
        rss: problem.rss(&params),
        iterations,
    })
}
