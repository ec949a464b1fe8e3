//! Typed records consumed by the analysis pipeline
//!
//! Input arrives as a [`Table`] (headers plus string cells, e.g. the output of a
//! layout merge). The typed accessors on [`Table`] validate the required
//! columns and produce the record types defined here.

pub mod table;

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ScreenError;

pub use table::Table;

/// Role of a well in the plate layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Status {
    Sample,
    Positive,
    Negative,
    /// Excluded from every statistic and quality check
    Reference,
}

impl Status {
    pub fn is_control(&self) -> bool {
        matches!(self, Status::Positive | Status::Negative)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Sample => "Sample",
            Status::Positive => "Positive",
            Status::Negative => "Negative",
            Status::Reference => "Reference",
        };
        f.write_str(name)
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Sample" => Ok(Status::Sample),
            "Positive" => Ok(Status::Positive),
            "Negative" => Ok(Status::Negative),
            "Reference" => Ok(Status::Reference),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

/// One well with its layout status and measured features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellRecord {
    pub well: String,
    pub status: Status,
    /// Features with no measurement for this well are absent
    pub features: BTreeMap<String, f64>,
}

impl WellRecord {
    pub fn new(well: impl Into<String>, status: Status) -> Self {
        Self {
            well: well.into(),
            status,
            features: BTreeMap::new(),
        }
    }

    pub fn with_feature(mut self, name: impl Into<String>, value: f64) -> Self {
        self.features.insert(name.into(), value);
        self
    }

    pub fn feature(&self, name: &str) -> Option<f64> {
        self.features.get(name).copied()
    }
}

/// A single optical density reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub well: String,
    pub time: f64,
    pub od: f64,
}

impl TimeSeriesPoint {
    pub fn new(well: impl Into<String>, time: f64, od: f64) -> Self {
        Self {
            well: well.into(),
            time,
            od,
        }
    }
}

/// One replicate measurement of a compound at a dose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseResponseObservation {
    pub compound_id: String,
    pub dose: f64,
    pub response: f64,
}

impl DoseResponseObservation {
    pub fn new(compound_id: impl Into<String>, dose: f64, response: f64) -> Self {
        Self {
            compound_id: compound_id.into(),
            dose,
            response,
        }
    }
}

/// Serialize result rows as CSV with a header line
pub fn write_csv<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<(), ScreenError> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Arithmetic mean, `None` for an empty slice
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance with the N-1 denominator, `None` below two values
pub(crate) fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some(ss / (values.len() - 1) as f64)
}

pub(crate) fn sample_std(values: &[f64]) -> Option<f64> {
    sample_variance(values).map(f64::sqrt)
}
