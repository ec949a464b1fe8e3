//! Error taxonomy and per-operation diagnostics
//!
//! Fatal problems with a whole table are returned as [`ScreenError`]. Problems
//! local to one well, feature or compound never abort a batch: they are
//! recorded as a [`Diagnostic`] on the [`Outcome`] of the operation and the
//! affected value is left undefined (`None`).

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::data::Status;
use crate::growth::InvalidReason;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScreenError {
    /// A column required by the operation is not present
    #[error("Missing required column '{column}' in {table} table")]
    InputSchema { table: String, column: String },

    /// A cell in a required column could not be interpreted
    #[error("Invalid value '{value}' in column '{column}' at row {row}")]
    InvalidCell {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Row {row} has {found} cells, expected {expected}")]
    RowLength {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Division by zero or an undefined input to a derived quantity
    #[error("Numeric degeneracy for {entity}: {quantity} is undefined")]
    NumericDegenerate { entity: String, quantity: String },

    #[error("Dose-response fit failed for compound {compound}: {failure}")]
    FitConvergence {
        compound: String,
        #[source]
        failure: FitFailure,
    },

    /// The number of wells does not match any registered plate format
    #[error("Unknown plate format: {wells} wells")]
    UnknownPlateFormat { wells: usize },

    #[error("CSV error: {0}")]
    Csv(#[source] Shared<csv::Error>),

    #[error("Configuration error: {0}")]
    Config(#[source] Shared<serde_json::Error>),
}

impl From<csv::Error> for ScreenError {
    fn from(err: csv::Error) -> Self {
        ScreenError::Csv(Shared::new(err))
    }
}

impl From<serde_json::Error> for ScreenError {
    fn from(err: serde_json::Error) -> Self {
        ScreenError::Config(Shared::new(err))
    }
}

/// A library error behind an `Arc`, so [`ScreenError`] stays `Clone`
///
/// Two values compare equal when their messages do.
#[derive(Debug)]
pub struct Shared<E>(Arc<E>);

impl<E> Shared<E> {
    pub fn new(err: E) -> Self {
        Self(Arc::new(err))
    }

    pub fn get_ref(&self) -> &E {
        &self.0
    }
}

impl<E> Clone for Shared<E> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<E: fmt::Display> PartialEq for Shared<E> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.to_string() == other.0.to_string()
    }
}

impl<E: fmt::Display> fmt::Display for Shared<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<E: StdError> StdError for Shared<E> {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

/// Reasons a single dose-response fit is rejected
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum FitFailure {
    #[error("{groups} dose groups, need at least {required}")]
    InsufficientData { groups: usize, required: usize },

    #[error("solver did not converge after {iterations} iterations ({reason})")]
    NotConverged { iterations: u64, reason: String },

    #[error("fit exceeded its time limit of {limit:?}")]
    Timeout { limit: Duration },

    #[error("solver produced non-finite parameters")]
    NonFinite,

    #[error("solver error: {0}")]
    Solver(String),
}

/// A non-fatal problem attached to the result of an operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A derived value was left undefined because of a zero or missing denominator
    NumericDegenerate { entity: String, quantity: String },
    /// Z-factor and SB were not computed for a feature
    InsufficientControls { feature: String, missing: Vec<Status> },
    /// A compound was excluded from the fit output
    FitFailed { compound: String, failure: FitFailure },
    /// A growth curve was labelled invalid
    InvalidCurve { well: String, reason: InvalidReason },
    /// A well has a time series but no layout status
    MissingStatus { well: String },
    /// Input rows were discarded before processing
    DroppedRows { context: String, count: usize },
}

impl Diagnostic {
    pub fn degenerate(entity: impl Into<String>, quantity: impl Into<String>) -> Self {
        Diagnostic::NumericDegenerate {
            entity: entity.into(),
            quantity: quantity.into(),
        }
    }

    /// The error in the taxonomy this diagnostic stands for, if any
    pub fn as_error(&self) -> Option<ScreenError> {
        match self {
            Diagnostic::NumericDegenerate { entity, quantity } => {
                Some(ScreenError::NumericDegenerate {
                    entity: entity.clone(),
                    quantity: quantity.clone(),
                })
            }
            Diagnostic::FitFailed { compound, failure } => Some(ScreenError::FitConvergence {
                compound: compound.clone(),
                failure: failure.clone(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::NumericDegenerate { entity, quantity } => {
                write!(f, "{entity}: {quantity} is undefined (division by zero)")
            }
            Diagnostic::InsufficientControls { feature, missing } => {
                let names: Vec<String> = missing.iter().map(|s| s.to_string()).collect();
                write!(
                    f,
                    "{feature}: insufficient controls, missing {}",
                    names.join(", ")
                )
            }
            Diagnostic::FitFailed { compound, failure } => {
                write!(f, "{compound}: fit failed, {failure}")
            }
            Diagnostic::InvalidCurve { well, reason } => {
                write!(f, "{well}: invalid growth curve ({reason})")
            }
            Diagnostic::MissingStatus { well } => write!(f, "{well}: no status in layout"),
            Diagnostic::DroppedRows { context, count } => {
                write!(f, "{context}: dropped {count} rows")
            }
        }
    }
}

/// The value produced by an operation together with everything that went
/// wrong for individual entities along the way
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Outcome<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            diagnostics: Vec::new(),
        }
    }

    /// Record a diagnostic, logging it as a warning
    pub fn warn(&mut self, diagnostic: Diagnostic) {
        tracing::warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.warn(diagnostic);
        }
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            diagnostics: self.diagnostics,
        }
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}
