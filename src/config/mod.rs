//! Assay-level configuration
//!
//! All thresholds used by the pipeline live in one [`ScreenConfig`] so they can
//! be tuned per assay without code changes. Missing keys take their defaults.
//!
//! ```json
//! {
//!   "curve_qc": { "max_drop": -0.3, "drop_index": 6 },
//!   "fit": { "unit_factor": 1e-9, "solver": { "timeout": { "secs": 2, "nanos": 0 } } }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::assay::AssayOptions;
use crate::error::ScreenError;
use crate::growth::{CurveQcOptions, GrowthOptions};
use crate::plate::PlateFormats;
use crate::potency::{FitOptions, PolyOptions, PruneOptions};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub assay: AssayOptions,
    pub growth: GrowthOptions,
    pub curve_qc: CurveQcOptions,
    pub prune: PruneOptions,
    pub fit: FitOptions,
    pub poly: PolyOptions,
    pub plates: PlateFormats,
}

impl ScreenConfig {
    pub fn from_json(json: &str) -> Result<Self, ScreenError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ScreenError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
