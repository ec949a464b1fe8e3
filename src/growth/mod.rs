//! Growth kinetics: per-well growth scores and curve quality control
//!
//! ```rust,ignore
//! use screensol::growth::{filter_curves, score_growth, CurveQcOptions, GrowthOptions};
//!
//! let points = table.time_series_wide()?;
//! let scored = score_growth(&points, &GrowthOptions::default());
//! let curves: Vec<_> = scored.value.iter().map(|s| s.curve.clone()).collect();
//! let qc = filter_curves(&curves, &layout.statuses()?, &CurveQcOptions::default());
//! ```

mod qc;
mod score;

pub use qc::{check_curve, filter_curves, CurveQcOptions, CurveQcResult, CurveVerdict, InvalidReason};
pub use score::{
    growth_rates, score_growth, GrowthCurve, GrowthOptions, GrowthPoint, GrowthScore, ScoredCurve,
};
