//! Plate-level assay quality: per-status statistics, Z-factor, signal-to-background
//! and z-normalization against the sample population

mod normalize;
mod stats;

pub use normalize::{normalize_z, NormalizedValue, ZNormalized};
pub use stats::{
    signal_to_background, summarize, summarize_features, z_factor, AssayOptions, AssayStatsRow,
    AssaySummary, ControlQuality, GroupStats,
};
