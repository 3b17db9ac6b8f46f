//! Roughness lengths over a water surface.
//!
//! # Physics
//!
//! The momentum roughness length combines the Charnock wave-induced term
//! with a smooth-surface viscous term:
//!
//! ```text
//! zo = a·u*²/g + 0.11·ν/u*
//! ```
//!
//! Because zo and u* each depend on the other through the log wind
//! profile, the pair is resolved per sample by fixed-point iteration.
//! The reference implementation iterates without a bound; here the loop
//! carries an explicit cap and reports whether it converged.
//!
//! Scalar (heat/humidity) roughness follows the roughness-Reynolds-number
//! relation of Zeng et al. (1998):
//!
//! ```text
//! zot = zoq = zo / exp(2.67·Re^¼ − 2.57),   Re = u*·zo/ν
//! ```
//!
//! with the exponent clamped at zero so a tiny Re cannot inflate the
//! scalar roughness above zo.

use crate::constants::{Constants, VON_KARMAN};

/// Seed friction velocity (m/s) from wind speed alone.
///
/// Uses the empirical quadratic-logistic drag law of Amorocho & DeVries
/// (1980): u* = U·sqrt(0.00104 + 0.0015/(1 + exp((12.5 − U)/1.56))).
pub fn seed_friction_velocity(u: f64) -> f64 {
    u * (0.00104 + 0.0015 / (1.0 + ((12.5 - u) / 1.56).exp())).sqrt()
}

/// Momentum roughness length (m) from the Charnock relation plus the
/// smooth-surface viscous term.
pub fn charnock_roughness(ustar: f64, nu: f64, consts: &Constants) -> f64 {
    consts.charnock * ustar * ustar / consts.g + 0.11 * nu / ustar
}

/// Scalar (heat/humidity) roughness length (m) from the roughness
/// Reynolds number.
///
/// The exponent 2.67·Re^¼ − 2.57 is clamped to ≥ 0.
pub fn scalar_roughness(zo: f64, ustar: f64, nu: f64) -> f64 {
    let re = ustar * zo / nu;
    let x = (2.67 * re.powf(0.25) - 2.57).max(0.0);
    zo / x.exp()
}

/// Result of the per-sample roughness fixed-point iteration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RoughnessSolution {
    /// Relative change in zo dropped below tolerance.
    Converged {
        zo: f64,
        ustar: f64,
        iterations: usize,
    },
    /// Iteration cap reached; last iterate is carried forward.
    MaxIterations { zo: f64, ustar: f64 },
}

impl RoughnessSolution {
    /// Final roughness length, converged or not.
    pub fn zo(&self) -> f64 {
        match *self {
            Self::Converged { zo, .. } | Self::MaxIterations { zo, .. } => zo,
        }
    }

    /// Final friction velocity, converged or not.
    pub fn ustar(&self) -> f64 {
        match *self {
            Self::Converged { ustar, .. } | Self::MaxIterations { ustar, .. } => ustar,
        }
    }

    /// Whether the iteration met its tolerance.
    pub fn converged(&self) -> bool {
        matches!(self, Self::Converged { .. })
    }
}

/// Resolve the initial (zo, u*) pair for one sample.
///
/// Alternates the log-wind-profile law u* = κ·U/ln(hu/zo) with the
/// Charnock relation until the relative change in zo falls below `tol`,
/// or until `max_iterations` passes have run.
///
/// # Arguments
/// * `u` - Wind speed at `hu` (m/s), already floored by the caller
/// * `hu` - Wind measurement height (m)
/// * `nu` - Kinematic viscosity of air (m²/s)
pub fn fit_roughness(
    u: f64,
    hu: f64,
    nu: f64,
    consts: &Constants,
    tol: f64,
    max_iterations: usize,
) -> RoughnessSolution {
    let mut ustar = seed_friction_velocity(u);
    let mut zo = charnock_roughness(ustar, nu, consts);

    for iteration in 1..=max_iterations {
        ustar = VON_KARMAN * u / (hu / zo).ln();
        let zo_new = charnock_roughness(ustar, nu, consts);
        let delta = ((zo_new - zo) / zo).abs();
        zo = zo_new;
        if delta < tol {
            return RoughnessSolution::Converged {
                zo,
                ustar,
                iterations: iteration,
            };
        }
    }

    RoughnessSolution::MaxIterations { zo, ustar }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consts() -> Constants {
        Constants::for_site(45.0, 0.0)
    }

    const NU: f64 = 1.5e-5;

    #[test]
    fn seed_drag_low_wind() {
        // Below the logistic transition the drag coefficient is ~1.04e-3.
        let u = 5.0;
        let cd = (seed_friction_velocity(u) / u).powi(2);
        assert!((cd - 1.05e-3).abs() < 5e-5, "cd = {cd}");
    }

    #[test]
    fn seed_drag_high_wind() {
        // Well above the transition the logistic term saturates: ~2.54e-3.
        let u = 25.0;
        let cd = (seed_friction_velocity(u) / u).powi(2);
        assert!(cd > 2.0e-3 && cd < 2.6e-3, "cd = {cd}");
    }

    #[test]
    fn charnock_roughness_positive_and_small() {
        let zo = charnock_roughness(0.2, NU, &consts());
        assert!(zo > 0.0);
        assert!(zo < 1e-3, "zo = {zo}");
    }

    #[test]
    fn scalar_roughness_never_exceeds_zo_at_low_re() {
        // Tiny Re drives the exponent negative; the clamp keeps zot = zo.
        let zo = 1e-5;
        let zot = scalar_roughness(zo, 1e-4, NU);
        assert_eq!(zot, zo);
    }

    #[test]
    fn scalar_roughness_below_zo_at_moderate_re() {
        let zo = 3e-4;
        let zot = scalar_roughness(zo, 0.3, NU);
        assert!(zot < zo);
        assert!(zot > 0.0);
    }

    #[test]
    fn moderate_wind_converges_quickly() {
        let sol = fit_roughness(5.0, 10.0, NU, &consts(), 1e-5, 100);
        match sol {
            RoughnessSolution::Converged { iterations, zo, ustar } => {
                assert!(iterations <= 50, "took {iterations} passes");
                assert!(zo > 0.0 && zo < 1e-2);
                assert!(ustar > 0.05 && ustar < 0.5, "ustar = {ustar}");
            }
            RoughnessSolution::MaxIterations { .. } => panic!("did not converge"),
        }
    }

    #[test]
    fn calm_wind_converges() {
        // Floored calm wind still resolves to a finite positive pair.
        let sol = fit_roughness(0.2, 10.0, NU, &consts(), 1e-5, 100);
        assert!(sol.converged());
        assert!(sol.zo().is_finite() && sol.zo() > 0.0);
        assert!(sol.ustar().is_finite() && sol.ustar() > 0.0);
    }

    #[test]
    fn cap_returns_last_iterate() {
        // A cap of zero passes must still hand back the seed estimate.
        let sol = fit_roughness(5.0, 10.0, NU, &consts(), 1e-5, 0);
        assert!(!sol.converged());
        assert!(sol.zo() > 0.0);
    }
}
