//! Removal of the collapsed high-dose tail of a dose series

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::aggregate::{dose_groups, DoseGroup};
use crate::data::DoseResponseObservation;
use crate::pool;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PruneOptions {
    /// Relative change from the running peak below which a dose is dropped (default: -0.15)
    pub threshold: f64,
    /// Starting value of the running peak (default: 1e-7)
    pub seed_max: f64,
    /// Worker threads for per-compound pruning (None = global rayon pool)
    pub threads: Option<usize>,
}

impl Default for PruneOptions {
    fn default() -> Self {
        Self {
            threshold: -0.15,
            seed_max: 1e-7,
            threads: None,
        }
    }
}

impl PruneOptions {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }
}

/// Keep the dose positions whose mean response has not fallen more than
/// `threshold` below the running maximum
///
/// `means` must be in ascending dose order.
pub fn kept_positions(means: &[f64], options: &PruneOptions) -> Vec<usize> {
    let mut curr_max = options.seed_max;
    let mut kept = Vec::with_capacity(means.len());
    for (i, &mean) in means.iter().enumerate() {
        let percent_change = mean / curr_max - 1.0;
        if mean > curr_max {
            curr_max = mean;
        }
        if percent_change > options.threshold {
            kept.push(i);
        }
    }
    kept
}

/// Prune aggregated dose groups of one compound
pub fn prune_groups(groups: &[DoseGroup], options: &PruneOptions) -> Vec<DoseGroup> {
    let mut sorted = groups.to_vec();
    sorted.sort_by(|a, b| a.dose.total_cmp(&b.dose));
    let means: Vec<f64> = sorted.iter().map(|g| g.mean).collect();
    kept_positions(&means, options)
        .into_iter()
        .map(|i| sorted[i].clone())
        .collect()
}

/// Prune the raw observations of one compound, returning the kept rows in dose order
pub fn prune_compound(
    observations: &[DoseResponseObservation],
    options: &PruneOptions,
) -> Vec<DoseResponseObservation> {
    // the unit factor only affects log_dose, which pruning ignores
    let groups = dose_groups(observations, 1.0);
    let means: Vec<f64> = groups.iter().map(|g| g.mean).collect();
    let kept: Vec<f64> = kept_positions(&means, options)
        .into_iter()
        .map(|i| groups[i].dose)
        .collect();

    let mut rows: Vec<DoseResponseObservation> = observations
        .iter()
        .filter(|o| kept.contains(&o.dose))
        .cloned()
        .collect();
    rows.sort_by(|a, b| a.dose.total_cmp(&b.dose));
    rows
}

/// Prune every compound independently
pub fn prune_all(
    observations: &[DoseResponseObservation],
    options: &PruneOptions,
) -> Vec<DoseResponseObservation> {
    let mut by_compound: BTreeMap<&str, Vec<DoseResponseObservation>> = BTreeMap::new();
    for obs in observations {
        by_compound
            .entry(obs.compound_id.as_str())
            .or_default()
            .push(obs.clone());
    }
    let pruned: Vec<Vec<DoseResponseObservation>> = pool::install(options.threads, || {
        by_compound
            .into_par_iter()
            .map(|(_, rows)| prune_compound(&rows, options))
            .collect()
    });
    pruned.into_iter().flatten().collect()
}
