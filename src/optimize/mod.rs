//! Nonlinear least-squares binding for the dose-response model, on top of argmin

pub mod ll4;

pub use ll4::{minimize, Ll4Problem, Minimum, SolverSettings};
