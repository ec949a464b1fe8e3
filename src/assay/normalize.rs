use serde::Serialize;

use crate::data::{mean, sample_std, Status, WellRecord};
use crate::error::{Diagnostic, Outcome, ScreenError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedValue {
    pub well: String,
    pub status: Status,
    pub value: Option<f64>,
    /// `None` when the well has no value or the sample spread is degenerate
    pub normalized: Option<f64>,
}

/// A feature z-scored against the Sample population
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZNormalized {
    pub feature: String,
    /// Name of the added column, `<feature>_norm`
    pub column: String,
    pub sample_mean: Option<f64>,
    pub sample_std: Option<f64>,
    pub values: Vec<NormalizedValue>,
}

impl ZNormalized {
    /// Copies of the records with the normalized column added where defined
    pub fn apply(&self, records: &[WellRecord]) -> Vec<WellRecord> {
        records
            .iter()
            .zip(&self.values)
            .map(|(record, v)| {
                let mut record = record.clone();
                if let Some(z) = v.normalized {
                    record.features.insert(self.column.clone(), z);
                }
                record
            })
            .collect()
    }
}

/// Z-score `feature` for every row using the mean and standard deviation of
/// the Sample rows
pub fn normalize_z(
    records: &[WellRecord],
    feature: &str,
) -> Result<Outcome<ZNormalized>, ScreenError> {
    if !records.iter().any(|r| r.features.contains_key(feature)) {
        return Err(ScreenError::InputSchema {
            table: "well".to_string(),
            column: feature.to_string(),
        });
    }

    let samples: Vec<f64> = records
        .iter()
        .filter(|r| r.status == Status::Sample)
        .filter_map(|r| r.feature(feature))
        .collect();
    let sample_mean = mean(&samples);
    let sample_std = sample_std(&samples);

    let mut outcome = Outcome::new(());
    let scale = match (sample_mean, sample_std) {
        (Some(m), Some(sd)) if sd > 0.0 => Some((m, sd)),
        _ => {
            outcome.warn(Diagnostic::degenerate(
                feature,
                "z-score (sample standard deviation is zero or undefined)",
            ));
            None
        }
    };

    let values = records
        .iter()
        .map(|r| {
            let value = r.feature(feature);
            NormalizedValue {
                well: r.well.clone(),
                status: r.status,
                value,
                normalized: value.zip(scale).map(|(v, (m, sd))| (v - m) / sd),
            }
        })
        .collect();

    Ok(outcome.map(|_| ZNormalized {
        feature: feature.to_string(),
        column: format!("{feature}_norm"),
        sample_mean,
        sample_std,
        values,
    }))
}
