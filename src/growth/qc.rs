use std::collections::HashMap;
use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize, Serializer};

use super::score::GrowthCurve;
use crate::data::Status;
use crate::error::{Diagnostic, Outcome};
use crate::pool;

/// Thresholds for rejecting aberrant growth curves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveQcOptions {
    /// A growth rate below this value counts as a sudden drop (default: -0.2)
    pub max_drop: f64,
    /// Drops are only rejected after this reading index (default: 4)
    pub drop_index: usize,
    /// Curves starting above this OD are rejected (default: 0.2)
    pub max_initial_od: f64,
    pub threads: Option<usize>,
}

impl Default for CurveQcOptions {
    fn default() -> Self {
        Self {
            max_drop: -0.2,
            drop_index: 4,
            max_initial_od: 0.2,
            threads: None,
        }
    }
}

impl CurveQcOptions {
    pub fn with_max_drop(mut self, max_drop: f64) -> Self {
        self.max_drop = max_drop;
        self
    }

    pub fn with_drop_index(mut self, index: usize) -> Self {
        self.drop_index = index;
        self
    }

    pub fn with_max_initial_od(mut self, od: f64) -> Self {
        self.max_initial_od = od;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }
}

/// Why a curve was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvalidReason {
    /// A steep drop late in the curve
    LateDrop,
    /// The first reading is already too high
    HighInitialOd,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidReason::LateDrop => f.write_str("late growth drop"),
            InvalidReason::HighInitialOd => f.write_str("high initial OD"),
        }
    }
}

/// Result column of the quality filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveVerdict {
    InvalidSample,
    Valid(Status),
}

impl CurveVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, CurveVerdict::Valid(_))
    }
}

impl fmt::Display for CurveVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurveVerdict::InvalidSample => f.write_str("Invalid_sample"),
            CurveVerdict::Valid(status) => status.fmt(f),
        }
    }
}

impl Serialize for CurveVerdict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurveQcResult {
    pub well: String,
    pub result: CurveVerdict,
    pub reason: Option<InvalidReason>,
    pub min_rate: Option<f64>,
    pub min_rate_index: Option<usize>,
    pub initial_od: f64,
}

/// Apply the rejection rules to one curve; the first matching rule wins
pub fn check_curve(curve: &GrowthCurve, status: Status, options: &CurveQcOptions) -> CurveQcResult {
    let min = curve.min_rate();
    let initial_od = curve.initial_od();

    let reason = match min {
        Some((index, rate)) if rate < options.max_drop && index > options.drop_index => {
            Some(InvalidReason::LateDrop)
        }
        _ if initial_od > options.max_initial_od => Some(InvalidReason::HighInitialOd),
        _ => None,
    };

    CurveQcResult {
        well: curve.well.clone(),
        result: match reason {
            Some(_) => CurveVerdict::InvalidSample,
            None => CurveVerdict::Valid(status),
        },
        reason,
        min_rate: min.map(|(_, rate)| rate),
        min_rate_index: min.map(|(index, _)| index),
        initial_od,
    }
}

/// Label every curve, looking up each well's status in the layout
///
/// Reference wells are not checked. Wells missing from the layout are
/// skipped with a diagnostic.
pub fn filter_curves(
    curves: &[GrowthCurve],
    statuses: &HashMap<String, Status>,
    options: &CurveQcOptions,
) -> Outcome<Vec<CurveQcResult>> {
    let checked: Vec<Result<Option<CurveQcResult>, Diagnostic>> =
        pool::install(options.threads, || {
            curves
                .par_iter()
                .map(|curve| match statuses.get(&curve.well) {
                    None => Err(Diagnostic::MissingStatus {
                        well: curve.well.clone(),
                    }),
                    Some(Status::Reference) => Ok(None),
                    Some(&status) => Ok(Some(check_curve(curve, status, options))),
                })
                .collect()
        });

    let mut outcome = Outcome::new(Vec::with_capacity(checked.len()));
    for result in checked {
        match result {
            Ok(Some(qc)) => {
                if let Some(reason) = qc.reason {
                    outcome.warn(Diagnostic::InvalidCurve {
                        well: qc.well.clone(),
                        reason,
                    });
                }
                outcome.value.push(qc);
            }
            Ok(None) => {}
            Err(diagnostic) => outcome.warn(diagnostic),
        }
    }
    outcome
}
