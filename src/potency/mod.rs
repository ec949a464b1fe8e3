//! Compound potency: four-parameter log-logistic dose-response fitting
//!
//! Observations are filtered (zero dose or response rows are dropped),
//! replicates are averaged per dose and each compound is fitted on its own.
//! Compounds whose fit fails are reported in the diagnostics and left out of
//! the results; the batch itself never fails. Non-sigmoidal responses can be
//! described with a polynomial in log dose instead ([`fit_polynomials`]).
//!
//! ```rust,ignore
//! use screensol::potency::{aggregate, fit_groups, prune_groups, FitOptions, PruneOptions};
//!
//! let options = FitOptions::default();
//! let grouped = aggregate(&table.dose_response()?, options.unit_factor);
//! let pruned = grouped
//!     .value
//!     .iter()
//!     .map(|(id, groups)| (id.clone(), prune_groups(groups, &PruneOptions::default())))
//!     .collect();
//! let fits = fit_groups(&pruned, &options);
//! for fit in &fits.value {
//!     println!("{}: EC50 {:.2}", fit.compound_id, fit.ec50);
//! }
//! ```

mod aggregate;
mod fit;
pub mod model;
mod poly;
mod prune;

pub use aggregate::{aggregate, dose_groups, is_fittable, DoseGroup};
pub use fit::{
    fit_compound, fit_dose_response, fit_groups, initial_guess, r_squared, CurvePoint,
    DoseResponseFit, FitOptions,
};
pub use model::{inv_p_dose, ll4, p_dose, Ll4Params, MICROMOLAR};
pub use poly::{
    fit_polynomial, fit_polynomials, polyfit, polyval, PolyOptions, PolyPoint, PolynomialFit,
};
pub use prune::{kept_positions, prune_all, prune_compound, prune_groups, PruneOptions};
