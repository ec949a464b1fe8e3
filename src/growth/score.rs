use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::TimeSeriesPoint;
use crate::error::{Diagnostic, Outcome};
use crate::plate::natural_cmp;
use crate::pool;

/// Growth scoring configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthOptions {
    /// Weight of the peak growth rate in the growth score (default: 0.25)
    pub rate_weight: f64,
    /// Worker threads for per-well scoring (None = global rayon pool)
    pub threads: Option<usize>,
}

impl Default for GrowthOptions {
    fn default() -> Self {
        Self {
            rate_weight: 0.25,
            threads: None,
        }
    }
}

impl GrowthOptions {
    pub fn with_rate_weight(mut self, weight: f64) -> Self {
        self.rate_weight = weight;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }
}

/// Relative change of each reading from the previous one
///
/// The first reading is compared with itself, so its rate is zero. A zero
/// previous reading leaves the rate undefined.
pub fn growth_rates(od: &[f64]) -> Vec<Option<f64>> {
    od.iter()
        .enumerate()
        .map(|(i, &current)| {
            let past = if i == 0 { od[0] } else { od[i - 1] };
            if past == 0.0 {
                None
            } else {
                Some((current - past) / past)
            }
        })
        .collect()
}

/// The time-ordered growth curve of one well
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthCurve {
    pub well: String,
    pub times: Vec<f64>,
    pub od: Vec<f64>,
    pub rates: Vec<Option<f64>>,
}

/// One reading of a growth curve with its rate, in long format
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthPoint {
    pub well: String,
    pub time: f64,
    pub od: f64,
    pub growth_rate: Option<f64>,
}

impl GrowthCurve {
    /// Sort readings by time and compute the rate series; `None` without readings
    pub fn from_points(well: impl Into<String>, mut readings: Vec<(f64, f64)>) -> Option<Self> {
        if readings.is_empty() {
            return None;
        }
        readings.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (times, od): (Vec<f64>, Vec<f64>) = readings.into_iter().unzip();
        let rates = growth_rates(&od);
        Some(Self {
            well: well.into(),
            times,
            od,
            rates,
        })
    }

    pub fn initial_od(&self) -> f64 {
        self.od[0]
    }

    pub fn max_od(&self) -> f64 {
        self.od.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Largest defined growth rate
    pub fn max_rate(&self) -> Option<f64> {
        self.rates
            .iter()
            .flatten()
            .copied()
            .fold(None, |acc: Option<f64>, r| Some(acc.map_or(r, |a| a.max(r))))
    }

    /// Smallest defined growth rate and the index of its first occurrence
    pub fn min_rate(&self) -> Option<(usize, f64)> {
        self.rates
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.map(|r| (i, r)))
            .fold(None, |acc, (i, r)| match acc {
                Some((_, min)) if min <= r => acc,
                _ => Some((i, r)),
            })
    }

    pub fn score(&self, options: &GrowthOptions) -> GrowthScore {
        let max_od = self.max_od();
        let initial_od = self.initial_od();
        let max_growth_rate = self.max_rate();
        GrowthScore {
            well: self.well.clone(),
            max_od,
            initial_od,
            max_growth_rate,
            gscore: max_growth_rate.map(|rate| (max_od - initial_od) + options.rate_weight * rate),
        }
    }

    pub fn points(&self) -> Vec<GrowthPoint> {
        self.times
            .iter()
            .zip(&self.od)
            .zip(&self.rates)
            .map(|((&time, &od), &growth_rate)| GrowthPoint {
                well: self.well.clone(),
                time,
                od,
                growth_rate,
            })
            .collect()
    }
}

/// Scalar summary of a growth curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthScore {
    pub well: String,
    pub max_od: f64,
    pub initial_od: f64,
    pub max_growth_rate: Option<f64>,
    pub gscore: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCurve {
    pub curve: GrowthCurve,
    pub score: GrowthScore,
}

fn score_well(
    well: String,
    readings: Vec<(f64, f64)>,
    options: &GrowthOptions,
) -> Option<(ScoredCurve, Vec<Diagnostic>)> {
    let curve = GrowthCurve::from_points(well, readings)?;
    let mut diagnostics = Vec::new();
    for (i, rate) in curve.rates.iter().enumerate() {
        if rate.is_none() {
            diagnostics.push(Diagnostic::degenerate(
                curve.well.clone(),
                format!("growth rate at time {}", curve.times[i]),
            ));
        }
    }
    let score = curve.score(options);
    if score.gscore.is_none() {
        diagnostics.push(Diagnostic::degenerate(curve.well.clone(), "growth score"));
    }
    tracing::debug!(well = %curve.well, gscore = ?score.gscore, "scored growth curve");
    Some((ScoredCurve { curve, score }, diagnostics))
}

/// Score every well of a long-format time series
///
/// Wells are processed independently; the result is in plate order.
pub fn score_growth(points: &[TimeSeriesPoint], options: &GrowthOptions) -> Outcome<Vec<ScoredCurve>> {
    let mut wells: BTreeMap<&str, Vec<(f64, f64)>> = BTreeMap::new();
    for point in points {
        wells
            .entry(point.well.as_str())
            .or_default()
            .push((point.time, point.od));
    }
    let wells: Vec<(String, Vec<(f64, f64)>)> = wells
        .into_iter()
        .map(|(well, readings)| (well.to_string(), readings))
        .collect();

    let scored: Vec<(ScoredCurve, Vec<Diagnostic>)> = pool::install(options.threads, || {
        wells
            .into_par_iter()
            .filter_map(|(well, readings)| score_well(well, readings, options))
            .collect()
    });

    let mut outcome = Outcome::new(Vec::with_capacity(scored.len()));
    for (curve, diagnostics) in scored {
        outcome.extend(diagnostics);
        outcome.value.push(curve);
    }
    outcome
        .value
        .sort_by(|a, b| natural_cmp(&a.curve.well, &b.curve.well));
    tracing::info!("Scored {} growth curves", outcome.value.len());
    outcome
}
