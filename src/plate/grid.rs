//! Plate-shaped view of one feature, as fed to heatmap renderers

use std::collections::BTreeMap;

use ndarray::Array2;
use serde::Serialize;

use super::format::{PlateFormat, PlateFormats};
use crate::data::{mean, sample_std, Status, WellRecord};
use crate::error::{Diagnostic, Outcome, ScreenError};

/// Feature values laid out on the plate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlateGrid {
    pub feature: String,
    pub format: PlateFormat,
    /// Wells without a measurement hold the sample mean; `None` only when
    /// there is no sample mean to fill with
    pub values: Array2<Option<f64>>,
    /// Sample mean, the colour scale center
    pub center: Option<f64>,
    /// Sample mean ± 3 sample standard deviations
    pub range: Option<(f64, f64)>,
}

impl PlateGrid {
    /// Build the grid from records covering every well of the layout
    ///
    /// Replicate rows of one well are averaged.
    pub fn from_records(
        records: &[WellRecord],
        feature: &str,
        formats: &PlateFormats,
    ) -> Result<Outcome<PlateGrid>, ScreenError> {
        if !records.iter().any(|r| r.features.contains_key(feature)) {
            return Err(ScreenError::InputSchema {
                table: "well".to_string(),
                column: feature.to_string(),
            });
        }

        let mut wells: BTreeMap<&str, (Status, Vec<f64>)> = BTreeMap::new();
        for record in records {
            let entry = wells
                .entry(record.well.as_str())
                .or_insert_with(|| (record.status, Vec::new()));
            if let Some(value) = record.feature(feature) {
                entry.1.push(value);
            }
        }

        let per_well: Vec<(String, Status, Option<f64>)> = wells
            .into_iter()
            .map(|(well, (status, values))| (well.to_string(), status, mean(&values)))
            .collect();

        let samples: Vec<f64> = per_well
            .iter()
            .filter(|(_, status, _)| *status == Status::Sample)
            .filter_map(|(_, _, value)| *value)
            .collect();

        let mut outcome = Outcome::new(());
        let center = mean(&samples);
        let range = match (center, sample_std(&samples)) {
            (Some(m), Some(sd)) => Some((m - 3.0 * sd, m + 3.0 * sd)),
            _ => {
                outcome.warn(Diagnostic::degenerate(feature, "sample standard deviation"));
                None
            }
        };

        let filled: Vec<(String, Option<f64>)> = per_well
            .into_iter()
            .map(|(well, _, value)| (well, value.or(center)))
            .collect();
        let format = formats.lookup(filled.len())?;
        let values = formats.reshape(&filled)?;

        Ok(outcome.map(|_| PlateGrid {
            feature: feature.to_string(),
            format,
            values,
            center,
            range,
        }))
    }
}
