//! Replicate aggregation of dose-response observations

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::model::p_dose;
use crate::data::{mean, sample_std, DoseResponseObservation};
use crate::error::{Diagnostic, Outcome};

/// Replicates of one compound at one dose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseGroup {
    pub dose: f64,
    pub log_dose: f64,
    pub mean: f64,
    /// Undefined for a single replicate
    pub std: Option<f64>,
    pub n: usize,
}

impl DoseGroup {
    pub fn from_responses(dose: f64, responses: &[f64], unit_factor: f64) -> Option<Self> {
        Some(Self {
            dose,
            log_dose: p_dose(dose, unit_factor),
            mean: mean(responses)?,
            std: sample_std(responses),
            n: responses.len(),
        })
    }
}

/// Whether an observation can enter the log-dose transform and the fit
///
/// Zero responses are discarded along with zero doses.
pub fn is_fittable(obs: &DoseResponseObservation) -> bool {
    obs.dose.is_finite() && obs.dose > 0.0 && obs.response != 0.0 && obs.response.is_finite()
}

/// Group replicates by dose, ascending; the observations may be in any order
pub fn dose_groups<'a, I>(observations: I, unit_factor: f64) -> Vec<DoseGroup>
where
    I: IntoIterator<Item = &'a DoseResponseObservation>,
{
    let mut by_dose: Vec<(f64, Vec<f64>)> = Vec::new();
    let mut sorted: Vec<&DoseResponseObservation> = observations.into_iter().collect();
    sorted.sort_by(|a, b| a.dose.total_cmp(&b.dose));
    for obs in sorted {
        if let Some((dose, responses)) = by_dose.last_mut() {
            if *dose == obs.dose {
                responses.push(obs.response);
                continue;
            }
        }
        by_dose.push((obs.dose, vec![obs.response]));
    }
    by_dose
        .into_iter()
        .filter_map(|(dose, responses)| DoseGroup::from_responses(dose, &responses, unit_factor))
        .collect()
}

/// Drop unusable rows and aggregate replicates per (compound, dose)
pub fn aggregate(
    observations: &[DoseResponseObservation],
    unit_factor: f64,
) -> Outcome<BTreeMap<String, Vec<DoseGroup>>> {
    let mut by_compound: BTreeMap<&str, Vec<&DoseResponseObservation>> = BTreeMap::new();
    let mut dropped = 0;
    for obs in observations {
        if is_fittable(obs) {
            by_compound.entry(obs.compound_id.as_str()).or_default().push(obs);
        } else {
            dropped += 1;
        }
    }

    let mut outcome = Outcome::new(
        by_compound
            .into_iter()
            .map(|(compound, rows)| (compound.to_string(), dose_groups(rows, unit_factor)))
            .collect(),
    );
    if dropped > 0 {
        outcome.warn(Diagnostic::DroppedRows {
            context: "dose-response rows with zero or invalid dose or response".to_string(),
            count: dropped,
        });
    }
    outcome
}
