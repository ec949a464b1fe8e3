//! Four-parameter log-logistic (LL.4) model and dose transforms

use serde::{Deserialize, Serialize};

/// Default conversion from micromolar doses to molar
pub const MICROMOLAR: f64 = 1e-6;

/// Parameters of the LL.4 model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ll4Params {
    /// Hill slope
    pub b: f64,
    /// Lower asymptote (min response)
    pub c: f64,
    /// Upper asymptote (max response)
    pub d: f64,
    /// EC50, in dose units
    pub e: f64,
}

impl Ll4Params {
    pub fn new(b: f64, c: f64, d: f64, e: f64) -> Self {
        Self { b, c, d, e }
    }

    /// Solver coordinates `[b, c, d, ln e]`
    pub fn to_theta(&self) -> Vec<f64> {
        vec![self.b, self.c, self.d, self.e.ln()]
    }

    pub fn from_theta(theta: &[f64]) -> Self {
        Self {
            b: theta[0],
            c: theta[1],
            d: theta[2],
            e: theta[3].exp(),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.b.is_finite() && self.c.is_finite() && self.d.is_finite() && self.e.is_finite()
    }

    /// Response at the EC50, the midpoint between the asymptotes
    pub fn midpoint(&self) -> f64 {
        self.c + (self.d - self.c) / 2.0
    }
}

/// `c + (d - c) / (1 + exp(b (ln x - ln e)))`
#[inline]
pub fn ll4(dose: f64, p: &Ll4Params) -> f64 {
    p.c + (p.d - p.c) / (1.0 + (p.b * (dose.ln() - p.e.ln())).exp())
}

/// Negative log10 of the dose converted with `unit_factor`
#[inline]
pub fn p_dose(dose: f64, unit_factor: f64) -> f64 {
    -(dose * unit_factor).log10()
}

/// Dose recovered from a [`p_dose`] value
#[inline]
pub fn inv_p_dose(p: f64, unit_factor: f64) -> f64 {
    10f64.powf(-p) / unit_factor
}
