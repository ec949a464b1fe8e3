use std::collections::{BTreeMap, HashMap};
use std::io::Read;

use super::{DoseResponseObservation, Status, TimeSeriesPoint, WellRecord};
use crate::error::ScreenError;

pub const WELL: &str = "Well";
pub const STATUS: &str = "Status";
pub const TIME: &str = "Time";
pub const OD: &str = "OD";
pub const COMPOUND_ID: &str = "Compound_id";
pub const DOSE: &str = "Dose";
pub const RESPONSE: &str = "Response";

/// An untyped table of string cells with named columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Read a CSV table; lines starting with `#` are comments
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ScreenError> {
        let mut reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.iter().map(str::to_string).collect();
        let mut table = Table {
            headers,
            rows: Vec::new(),
        };
        for record in reader.records() {
            let record = record?;
            table.push_row(record.iter())?;
        }
        Ok(table)
    }

    pub fn push_row<I, S>(&mut self, cells: I) -> Result<(), ScreenError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let row: Vec<String> = cells.into_iter().map(Into::into).collect();
        if row.len() != self.headers.len() {
            return Err(ScreenError::RowLength {
                row: self.rows.len(),
                expected: self.headers.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column(&self, table: &str, name: &str) -> Result<usize, ScreenError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ScreenError::InputSchema {
                table: table.to_string(),
                column: name.to_string(),
            })
    }

    fn number(&self, row: usize, col: usize) -> Result<f64, ScreenError> {
        let cell = &self.rows[row][col];
        cell.parse::<f64>().map_err(|_| ScreenError::InvalidCell {
            column: self.headers[col].clone(),
            row,
            value: cell.clone(),
        })
    }

    /// An empty cell is a missing measurement
    fn optional_number(&self, row: usize, col: usize) -> Result<Option<f64>, ScreenError> {
        let cell = &self.rows[row][col];
        if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
            return Ok(None);
        }
        self.number(row, col).map(Some)
    }

    fn status(&self, row: usize, col: usize) -> Result<Status, ScreenError> {
        let cell = &self.rows[row][col];
        cell.parse::<Status>().map_err(|_| ScreenError::InvalidCell {
            column: self.headers[col].clone(),
            row,
            value: cell.clone(),
        })
    }

    /// Typed well records with the requested feature columns
    pub fn well_records(&self, features: &[&str]) -> Result<Vec<WellRecord>, ScreenError> {
        let well = self.column("well", WELL)?;
        let status = self.column("well", STATUS)?;
        let feature_cols = features
            .iter()
            .map(|f| self.column("well", f).map(|c| (f.to_string(), c)))
            .collect::<Result<Vec<_>, _>>()?;

        (0..self.rows.len())
            .map(|row| {
                let mut features = BTreeMap::new();
                for (name, col) in &feature_cols {
                    if let Some(value) = self.optional_number(row, *col)? {
                        features.insert(name.clone(), value);
                    }
                }
                Ok(WellRecord {
                    well: self.rows[row][well].clone(),
                    status: self.status(row, status)?,
                    features,
                })
            })
            .collect()
    }

    /// Layout status per well
    pub fn statuses(&self) -> Result<HashMap<String, Status>, ScreenError> {
        let well = self.column("layout", WELL)?;
        let status = self.column("layout", STATUS)?;
        (0..self.rows.len())
            .map(|row| Ok((self.rows[row][well].clone(), self.status(row, status)?)))
            .collect()
    }

    /// Long-format time series with `Well`, `Time` and `OD` columns
    pub fn time_series(&self) -> Result<Vec<TimeSeriesPoint>, ScreenError> {
        let well = self.column("time series", WELL)?;
        let time = self.column("time series", TIME)?;
        let od = self.column("time series", OD)?;
        (0..self.rows.len())
            .map(|row| {
                Ok(TimeSeriesPoint {
                    well: self.rows[row][well].clone(),
                    time: self.number(row, time)?,
                    od: self.number(row, od)?,
                })
            })
            .collect()
    }

    /// Plate-reader output with a `Time` column and one OD column per well
    ///
    /// Empty cells are skipped.
    pub fn time_series_wide(&self) -> Result<Vec<TimeSeriesPoint>, ScreenError> {
        let time = self.column("time series", TIME)?;
        let mut points = Vec::with_capacity(self.rows.len() * (self.headers.len() - 1));
        for (col, well) in self.headers.iter().enumerate() {
            if col == time {
                continue;
            }
            for row in 0..self.rows.len() {
                if let Some(od) = self.optional_number(row, col)? {
                    points.push(TimeSeriesPoint {
                        well: well.clone(),
                        time: self.number(row, time)?,
                        od,
                    });
                }
            }
        }
        Ok(points)
    }

    /// Dose-response observations with `Compound_id`, `Dose` and `Response` columns
    pub fn dose_response(&self) -> Result<Vec<DoseResponseObservation>, ScreenError> {
        let compound = self.column("dose-response", COMPOUND_ID)?;
        let dose = self.column("dose-response", DOSE)?;
        let response = self.column("dose-response", RESPONSE)?;
        (0..self.rows.len())
            .map(|row| {
                Ok(DoseResponseObservation {
                    compound_id: self.rows[row][compound].clone(),
                    dose: self.number(row, dose)?,
                    response: self.number(row, response)?,
                })
            })
            .collect()
    }
}
