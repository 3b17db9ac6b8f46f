//! Atmospheric stability regimes and similarity-theory corrections.
//!
//! The surface layer is partitioned by the dimensionless stability
//! parameter ζ = z/L (height over Obukhov length) into four regimes,
//! following Zeng et al. (1998):
//!
//! ```text
//! ζ < ζ_c        very unstable (free convection)
//! ζ_c ≤ ζ < 0    unstable
//! 0 ≤ ζ ≤ 1      stable
//! ζ > 1          very stable
//! ```
//!
//! The threshold ζ_c differs between the momentum profile (ζ_m = −1.574)
//! and the heat/humidity profiles (ζ_t = −0.465). Every sample falls into
//! exactly one regime per threshold family; the boundaries above are the
//! documented tie-breaks.
//!
//! The integrated stability correction ψ(ζ) is the Businger-Dyer form,
//! valid for ζ ≤ 0 where χ = (1 − 16ζ)^¼ stays real. Callers only
//! evaluate it inside the unstable regimes, where that precondition holds
//! by construction.

use std::f64::consts::PI;

use crate::constants::{ZETA_M, ZETA_T};

/// Stability regime of a single sample for one threshold family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StabilityRegime {
    /// ζ < ζ_c: free-convection regime.
    VeryUnstable,
    /// ζ_c ≤ ζ < 0.
    Unstable,
    /// 0 ≤ ζ ≤ 1.
    Stable,
    /// ζ > 1: strongly stratified.
    VeryStable,
}

impl StabilityRegime {
    /// Classify ζ against a regime threshold ζ_c.
    ///
    /// Total over all real ζ: exactly one regime matches.
    pub fn classify(zeta: f64, zeta_crit: f64) -> Self {
        if zeta < zeta_crit {
            Self::VeryUnstable
        } else if zeta < 0.0 {
            Self::Unstable
        } else if zeta <= 1.0 {
            Self::Stable
        } else {
            Self::VeryStable
        }
    }

    /// Classify ζ with the momentum threshold ζ_m.
    pub fn for_momentum(zeta: f64) -> Self {
        Self::classify(zeta, ZETA_M)
    }

    /// Classify ζ with the heat/humidity threshold ζ_t.
    pub fn for_scalar(zeta: f64) -> Self {
        Self::classify(zeta, ZETA_T)
    }

    /// True for the two unstable regimes (ζ < 0).
    pub fn is_unstable(self) -> bool {
        matches!(self, Self::VeryUnstable | Self::Unstable)
    }
}

/// Which profile a stability correction applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Profile {
    /// Wind profile.
    Momentum,
    /// Temperature and humidity profiles.
    Scalar,
}

impl Profile {
    /// Integrated stability correction ψ(ζ) for this profile.
    ///
    /// With χ = (1 − 16ζ)^¼:
    ///
    /// ```text
    /// ψ_m = 2·ln((1+χ)/2) + ln((1+χ²)/2) − 2·atan(χ) + π/2
    /// ψ_h = 2·ln((1+χ²)/2)
    /// ```
    ///
    /// Only defined for ζ ≤ 1/16; callers restrict evaluation to the
    /// unstable regimes where ζ ≤ 0.
    pub fn psi(self, zeta: f64) -> f64 {
        let chi = (1.0 - 16.0 * zeta).powf(0.25);
        match self {
            Profile::Momentum => {
                2.0 * ((1.0 + chi) / 2.0).ln() + ((1.0 + chi * chi) / 2.0).ln()
                    - 2.0 * chi.atan()
                    + PI / 2.0
            }
            Profile::Scalar => 2.0 * ((1.0 + chi * chi) / 2.0).ln(),
        }
    }
}

/// Signed fractional power: sign(x)·|x|^p.
///
/// The reference computation carries intermediates as complex numbers and
/// keeps only the real part, so fractional powers of negative quantities
/// never raise a domain error there. This helper reproduces that behavior
/// over the reals for the free-convection correction terms; a plain
/// `powf` would return NaN for a negative base.
pub fn signed_powf(x: f64, p: f64) -> f64 {
    x.signum() * x.abs().powf(p)
}
