//! Analysis of high-throughput screening experiments.
//!
//! - [`growth`]: growth scores from optical density time series and curve quality control
//! - [`assay`]: per-status statistics, Z-factor, signal-to-background and z-normalization
//! - [`potency`]: dose-series pruning and four-parameter log-logistic fitting
//! - [`plate`]: natural well ordering and plate-shaped reshaping
//!
//! Every operation works on immutable input and returns new values. Failures
//! of a single well, feature or compound are reported as [`Diagnostic`]s on
//! the [`Outcome`] and never abort the batch.

pub mod assay;
pub mod config;
pub mod data;
pub mod error;
pub mod growth;
pub mod optimize;
pub mod plate;
mod pool;
pub mod potency;

pub use config::ScreenConfig;
pub use data::{DoseResponseObservation, Status, Table, TimeSeriesPoint, WellRecord};
pub use error::{Diagnostic, FitFailure, Outcome, ScreenError};

pub mod prelude {
    pub use crate::assay::{
        normalize_z, summarize, summarize_features, AssayOptions, AssaySummary,
    };
    pub use crate::config::ScreenConfig;
    pub use crate::data::{
        write_csv, DoseResponseObservation, Status, Table, TimeSeriesPoint, WellRecord,
    };
    pub use crate::error::{Diagnostic, FitFailure, Outcome, ScreenError};
    pub use crate::growth::{
        filter_curves, score_growth, CurveQcOptions, CurveVerdict, GrowthOptions,
    };
    pub use crate::plate::{order_wells, PlateFormats, PlateGrid};
    pub use crate::potency::{
        aggregate, fit_dose_response, fit_groups, fit_polynomials, prune_all, prune_groups,
        DoseResponseFit, FitOptions, PolyOptions, PolynomialFit, PruneOptions,
    };
}
