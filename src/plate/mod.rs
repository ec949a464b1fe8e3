//! Plate geometry: well ordering, supported formats and plate-shaped views

mod format;
mod grid;
mod order;

pub use format::{PlateFormat, PlateFormats};
pub use grid::PlateGrid;
pub use order::{natural_cmp, order_wells};
