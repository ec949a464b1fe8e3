//! Plate geometries and reshaping of per-well values

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::order::natural_cmp;
use crate::error::ScreenError;

/// Geometry of a microplate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlateFormat {
    pub wells: usize,
    pub rows: usize,
    pub columns: usize,
}

impl PlateFormat {
    pub const fn new(rows: usize, columns: usize) -> Self {
        Self {
            wells: rows * columns,
            rows,
            columns,
        }
    }

    /// Row labels A..Z, then AA, AB, ...
    pub fn row_labels(&self) -> Vec<String> {
        (0..self.rows).map(row_label).collect()
    }

    pub fn column_labels(&self) -> Vec<String> {
        (1..=self.columns).map(|c| c.to_string()).collect()
    }

    /// Well identifiers in row-major order
    pub fn wells(&self) -> Vec<String> {
        let columns = self.column_labels();
        self.row_labels()
            .iter()
            .flat_map(|r| columns.iter().map(move |c| format!("{r}{c}")))
            .collect()
    }
}

fn row_label(index: usize) -> String {
    let mut label = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        label.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    label.reverse();
    String::from_utf8(label).unwrap_or_default()
}

/// Registry of the plate formats a dataset may be reshaped into
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateFormats {
    formats: Vec<PlateFormat>,
}

impl Default for PlateFormats {
    fn default() -> Self {
        Self {
            formats: vec![PlateFormat::new(8, 12), PlateFormat::new(16, 24)],
        }
    }
}

impl PlateFormats {
    /// Common SBS formats from 6 to 1536 wells
    pub fn extended() -> Self {
        Self::default()
            .with_format(PlateFormat::new(2, 3))
            .with_format(PlateFormat::new(3, 4))
            .with_format(PlateFormat::new(4, 6))
            .with_format(PlateFormat::new(6, 8))
            .with_format(PlateFormat::new(32, 48))
    }

    /// Register a format, replacing any existing one with the same well count
    pub fn with_format(mut self, format: PlateFormat) -> Self {
        self.formats.retain(|f| f.wells != format.wells);
        self.formats.push(format);
        self
    }

    pub fn formats(&self) -> &[PlateFormat] {
        &self.formats
    }

    pub fn lookup(&self, wells: usize) -> Result<PlateFormat, ScreenError> {
        self.formats
            .iter()
            .find(|f| f.wells == wells)
            .copied()
            .ok_or(ScreenError::UnknownPlateFormat { wells })
    }

    /// Order values by well and lay them out row-major on the matching plate
    pub fn reshape<T: Clone>(&self, values: &[(String, T)]) -> Result<Array2<T>, ScreenError> {
        let format = self.lookup(values.len())?;
        let mut ordered: Vec<&(String, T)> = values.iter().collect();
        ordered.sort_by(|a, b| natural_cmp(&a.0, &b.0));
        let flat: Vec<T> = ordered.into_iter().map(|(_, v)| v.clone()).collect();
        Array2::from_shape_vec((format.rows, format.columns), flat).map_err(|_| {
            ScreenError::UnknownPlateFormat {
                wells: values.len(),
            }
        })
    }
}
