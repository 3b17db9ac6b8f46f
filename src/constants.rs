//! Physical constants for the bulk flux algorithm.
//!
//! All constants follow Zeng et al. (1998) and the conventions of the
//! reference implementation. Gravity is corrected for latitude and
//! altitude once per run and carried in an immutable [`Constants`]
//! struct rather than as global state.

/// Von Kármán constant (dimensionless).
pub const VON_KARMAN: f64 = 0.41;

/// Gas constant for dry air (J/kg/K).
pub const R_DRY: f64 = 287.1;

/// Specific heat of air at constant pressure (J/kg/K).
pub const CP_AIR: f64 = 1006.0;

/// Charnock constant for wave-induced roughness (dimensionless).
pub const CHARNOCK: f64 = 0.013;

/// Standard sea-level pressure (Pa).
pub const P_STANDARD: f64 = 101325.0;

/// Offset between Celsius and Kelvin used by the reference formulas.
pub const CELSIUS_TO_KELVIN: f64 = 273.16;

/// Stability-regime threshold for momentum: ζ < ζ_m is very unstable.
pub const ZETA_M: f64 = -1.574;

/// Stability-regime threshold for heat/humidity: ζ < ζ_t is very unstable.
pub const ZETA_T: f64 = -0.465;

/// Gravitational acceleration corrected for latitude and altitude (m/s²).
///
/// ```text
/// g = 9.780310 · (1 + 0.0053024·sin²φ − 0.0000058·sin²(2φ)) − 3.086e-6·z
/// ```
///
/// The altitude term is kept literally as in the reference formulation;
/// its unit handling is dimensionally subtle and deliberately not
/// re-derived here.
///
/// # Arguments
/// * `latitude_deg` - Latitude in degrees
/// * `altitude` - Station altitude above sea level (m)
pub fn gravity(latitude_deg: f64, altitude: f64) -> f64 {
    let phi = latitude_deg.to_radians();
    let s = phi.sin();
    let s2 = (2.0 * phi).sin();
    9.780310 * (1.0 + 0.0053024 * s * s - 0.0000058 * s2 * s2) - 3.086e-6 * altitude
}

/// Immutable bundle of run-constant physics values.
///
/// Constructed once per solver call from the site latitude and altitude.
#[derive(Clone, Copy, Debug)]
pub struct Constants {
    /// Von Kármán constant.
    pub kv: f64,
    /// Dry-air gas constant (J/kg/K).
    pub r_dry: f64,
    /// Specific heat of air (J/kg/K).
    pub cp: f64,
    /// Charnock constant.
    pub charnock: f64,
    /// Latitude/altitude-corrected gravity (m/s²).
    pub g: f64,
}

impl Constants {
    /// Build constants for a site.
    ///
    /// # Arguments
    /// * `latitude_deg` - Latitude in degrees
    /// * `altitude` - Station altitude (m)
    pub fn for_site(latitude_deg: f64, altitude: f64) -> Self {
        Self {
            kv: VON_KARMAN,
            r_dry: R_DRY,
            cp: CP_AIR,
            charnock: CHARNOCK,
            g: gravity(latitude_deg, altitude),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gravity_at_equator_sea_level() {
        // Equatorial sea-level gravity is the leading coefficient.
        let g = gravity(0.0, 0.0);
        assert!((g - 9.780310).abs() < 1e-9);
    }

    #[test]
    fn gravity_increases_toward_pole() {
        let g_eq = gravity(0.0, 0.0);
        let g_45 = gravity(45.0, 0.0);
        let g_pole = gravity(90.0, 0.0);
        assert!(g_eq < g_45);
        assert!(g_45 < g_pole);
        // Polar gravity ≈ 9.832 m/s²
        assert!((g_pole - 9.832).abs() < 0.01);
    }

    #[test]
    fn gravity_decreases_with_altitude() {
        assert!(gravity(45.0, 1000.0) < gravity(45.0, 0.0));
    }

    #[test]
    fn constants_carry_site_gravity() {
        let c = Constants::for_site(45.0, 100.0);
        assert_eq!(c.g, gravity(45.0, 100.0));
        assert_eq!(c.kv, VON_KARMAN);
    }
}
