use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::{mean, sample_variance, Status, WellRecord};
use crate::error::{Diagnostic, Outcome, ScreenError};
use crate::pool;

/// Multi-feature summary configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssayOptions {
    /// Worker threads for per-feature summaries (None = global rayon pool)
    pub threads: Option<usize>,
}

impl AssayOptions {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }
}

/// Descriptive statistics of one status group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub status: Status,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation, undefined for a single well
    pub std: Option<f64>,
    pub var: Option<f64>,
}

impl GroupStats {
    fn from_values(status: Status, values: &[f64]) -> Option<Self> {
        let var = sample_variance(values);
        Some(Self {
            status,
            count: values.len(),
            mean: mean(values)?,
            std: var.map(f64::sqrt),
            var,
        })
    }
}

/// Control separation metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlQuality {
    pub z_factor: Option<f64>,
    pub signal_to_background: Option<f64>,
}

/// `1 - 3 (σ₊ + σ₋) / |μ₊ - μ₋|`, undefined when the control means coincide
pub fn z_factor(mean_pos: f64, std_pos: f64, mean_neg: f64, std_neg: f64) -> Option<f64> {
    let separation = (mean_pos - mean_neg).abs();
    if separation == 0.0 {
        return None;
    }
    Some(1.0 - 3.0 * (std_pos + std_neg) / separation)
}

/// Ratio of the positive to the negative control mean
pub fn signal_to_background(mean_pos: f64, mean_neg: f64) -> Option<f64> {
    if mean_neg == 0.0 {
        return None;
    }
    Some(mean_pos / mean_neg)
}

/// Statistics of one feature across the status groups of a plate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssaySummary {
    pub feature: String,
    pub groups: Vec<GroupStats>,
    /// Present only when both control groups exist
    pub controls: Option<ControlQuality>,
}

/// Flat summary row, one per status group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssayStatsRow {
    pub feature: String,
    pub status: Status,
    pub count: usize,
    pub mean: f64,
    pub std: Option<f64>,
    pub var: Option<f64>,
    pub z_factor: Option<f64>,
    pub sb: Option<f64>,
}

impl AssaySummary {
    pub fn group(&self, status: Status) -> Option<&GroupStats> {
        self.groups.iter().find(|g| g.status == status)
    }

    pub fn rows(&self) -> Vec<AssayStatsRow> {
        let (z_factor, sb) = match &self.controls {
            Some(c) => (c.z_factor, c.signal_to_background),
            None => (None, None),
        };
        self.groups
            .iter()
            .map(|g| AssayStatsRow {
                feature: self.feature.clone(),
                status: g.status,
                count: g.count,
                mean: g.mean,
                std: g.std,
                var: g.var,
                z_factor,
                sb,
            })
            .collect()
    }
}

/// Summarize one feature; Reference wells are ignored
pub fn summarize(
    records: &[WellRecord],
    feature: &str,
) -> Result<Outcome<AssaySummary>, ScreenError> {
    if !records.iter().any(|r| r.features.contains_key(feature)) {
        return Err(ScreenError::InputSchema {
            table: "well".to_string(),
            column: feature.to_string(),
        });
    }

    let mut by_status: BTreeMap<Status, Vec<f64>> = BTreeMap::new();
    for record in records.iter().filter(|r| r.status != Status::Reference) {
        if let Some(value) = record.feature(feature) {
            by_status.entry(record.status).or_default().push(value);
        }
    }

    let groups: Vec<GroupStats> = by_status
        .iter()
        .filter_map(|(status, values)| GroupStats::from_values(*status, values))
        .collect();

    let mut outcome = Outcome::new(());
    let find = |status| groups.iter().find(|g: &&GroupStats| g.status == status);
    let controls = match (find(Status::Positive), find(Status::Negative)) {
        (Some(pos), Some(neg)) => {
            let z = match (pos.std, neg.std) {
                (Some(sp), Some(sn)) => z_factor(pos.mean, sp, neg.mean, sn),
                _ => None,
            };
            if z.is_none() {
                outcome.warn(Diagnostic::degenerate(feature, "Z-factor"));
            }
            let sb = signal_to_background(pos.mean, neg.mean);
            if sb.is_none() {
                outcome.warn(Diagnostic::degenerate(feature, "signal-to-background"));
            }
            Some(ControlQuality {
                z_factor: z,
                signal_to_background: sb,
            })
        }
        (pos, neg) => {
            let mut missing = Vec::new();
            if pos.is_none() {
                missing.push(Status::Positive);
            }
            if neg.is_none() {
                missing.push(Status::Negative);
            }
            outcome.warn(Diagnostic::InsufficientControls {
                feature: feature.to_string(),
                missing,
            });
            None
        }
    };

    Ok(outcome.map(|_| AssaySummary {
        feature: feature.to_string(),
        groups,
        controls,
    }))
}

/// Summarize several features independently
pub fn summarize_features(
    records: &[WellRecord],
    features: &[&str],
    options: &AssayOptions,
) -> Vec<Result<Outcome<AssaySummary>, ScreenError>> {
    pool::install(options.threads, || {
        features
            .par_iter()
            .map(|feature| summarize(records, feature))
            .collect()
    })
}
