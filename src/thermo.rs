//! Thermodynamic derivations for the bulk flux algorithm.
//!
//! Pure scalar functions computing the derived quantities the solver needs
//! before and during iteration: station pressure, saturation vapor
//! pressure, specific humidity, moist-air properties, and the water
//! density / humidity back-conversions used in post-processing.
//!
//! # Conventions
//!
//! Temperatures are in °C, pressures in millibars (hPa) unless noted,
//! specific humidities in kg/kg. Pressure enters in Pa only at the
//! barometric formula and the ideal gas law.

use crate::constants::{CELSIUS_TO_KELVIN, CP_AIR, P_STANDARD, R_DRY};

/// Station pressure (mb) from altitude via the barometric formula.
///
/// ```text
/// p = 101325 · (1 − 2.25577e-5·z)^5.25588   [Pa]
/// ```
pub fn station_pressure_mb(altitude: f64) -> f64 {
    P_STANDARD * (1.0 - 2.25577e-5 * altitude).powf(5.25588) / 100.0
}

/// Saturation vapor pressure (mb) over water at temperature `t` (°C),
/// Tetens formula.
pub fn saturation_vapor_pressure_mb(t: f64) -> f64 {
    6.11 * (17.27 * t / (t + 237.3)).exp()
}

/// Specific humidity (kg/kg) from vapor pressure `e` and pressure `p`
/// (both mb).
pub fn specific_humidity(e: f64, p: f64) -> f64 {
    0.622 * e / (p - 0.378 * e)
}

/// Gas constant of moist air (J/kg/K) at specific humidity `q`.
pub fn moist_gas_constant(q: f64) -> f64 {
    R_DRY * (1.0 + 0.608 * q)
}

/// Latent heat of vaporization (J/kg), linear in surface temperature (°C).
pub fn latent_heat_vaporization(ts: f64) -> f64 {
    2.501e6 - 2370.0 * ts
}

/// Air density (kg/m³) from the ideal gas law.
///
/// `p` in mb, `r_moist` the moist-air gas constant, `ta` in °C.
pub fn air_density(p: f64, r_moist: f64, ta: f64) -> f64 {
    100.0 * p / (r_moist * (ta + CELSIUS_TO_KELVIN))
}

/// Kinematic viscosity of air (m²/s), empirical in temperature and density.
pub fn kinematic_viscosity(ta: f64, rho: f64) -> f64 {
    (1.7184e-5 + 4.94e-8 * ta) / rho
}

/// Virtual temperature (K) of moist air.
pub fn virtual_temperature(ta: f64, q: f64) -> f64 {
    (ta + CELSIUS_TO_KELVIN) * (1.0 + 0.61 * q)
}

/// Potential temperature (K) referenced to 1000 mb.
pub fn potential_temperature(ta: f64, p: f64) -> f64 {
    (ta + CELSIUS_TO_KELVIN) * (1000.0 / p).powf(R_DRY / CP_AIR)
}

/// Relative humidity (%) back-computed from specific humidity `q`,
/// pressure `p` (mb), and temperature `t` (°C), clamped to [0, 100].
pub fn relative_humidity_from_specific(q: f64, p: f64, t: f64) -> f64 {
    let e = q * p / (0.622 + 0.378 * q);
    (100.0 * e / saturation_vapor_pressure_mb(t)).clamp(0.0, 100.0)
}

/// Fresh-water density (kg/m³), Millero & Poisson (1981) polynomial in
/// surface temperature (°C).
pub fn water_density(ts: f64) -> f64 {
    999.842594 + 6.793952e-2 * ts - 9.095290e-3 * ts.powi(2) + 1.001685e-4 * ts.powi(3)
        - 1.120083e-6 * ts.powi(4)
        + 6.536332e-9 * ts.powi(5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sea_level_pressure() {
        assert_relative_eq!(station_pressure_mb(0.0), 1013.25, max_relative = 1e-10);
    }

    #[test]
    fn pressure_drops_with_altitude() {
        // Roughly 12 mb per 100 m near sea level.
        let p100 = station_pressure_mb(100.0);
        assert!(p100 < 1013.25);
        assert!((p100 - 1001.3).abs() < 0.5);
    }

    #[test]
    fn tetens_at_reference_points() {
        // 6.11 mb at 0 °C by construction, ~23.4 mb at 20 °C.
        assert_relative_eq!(saturation_vapor_pressure_mb(0.0), 6.11, max_relative = 1e-12);
        assert!((saturation_vapor_pressure_mb(20.0) - 23.4).abs() < 0.2);
    }

    #[test]
    fn specific_humidity_typical_magnitude() {
        // Saturated air at 20 °C and 1013 mb holds ~14.5 g/kg.
        let e = saturation_vapor_pressure_mb(20.0);
        let q = specific_humidity(e, 1013.25);
        assert!(q > 0.013 && q < 0.016, "q = {q}");
    }

    #[test]
    fn moist_air_is_lighter() {
        let r_dry = moist_gas_constant(0.0);
        let r_moist = moist_gas_constant(0.015);
        assert_eq!(r_dry, R_DRY);
        assert!(r_moist > r_dry);
        assert!(air_density(1013.25, r_moist, 20.0) < air_density(1013.25, r_dry, 20.0));
    }

    #[test]
    fn air_density_standard_conditions() {
        // Dry air at 1013.25 mb, 15 °C: ~1.225 kg/m³.
        let rho = air_density(1013.25, R_DRY, 15.0);
        assert!((rho - 1.225).abs() < 0.01, "rho = {rho}");
    }

    #[test]
    fn latent_heat_decreases_with_temperature() {
        assert_relative_eq!(latent_heat_vaporization(0.0), 2.501e6);
        assert!(latent_heat_vaporization(20.0) < latent_heat_vaporization(0.0));
    }

    #[test]
    fn viscosity_order_of_magnitude() {
        let rho = air_density(1013.25, R_DRY, 15.0);
        let nu = kinematic_viscosity(15.0, rho);
        // Air at 15 °C: ν ≈ 1.5e-5 m²/s
        assert!(nu > 1.0e-5 && nu < 2.0e-5, "nu = {nu}");
    }

    #[test]
    fn virtual_temperature_exceeds_dry() {
        assert!(virtual_temperature(20.0, 0.01) > virtual_temperature(20.0, 0.0));
        assert_relative_eq!(virtual_temperature(20.0, 0.0), 293.16);
    }

    #[test]
    fn potential_temperature_at_reference_pressure() {
        assert_relative_eq!(potential_temperature(20.0, 1000.0), 293.16, max_relative = 1e-12);
        // Below the reference level (higher pressure), θ < T.
        assert!(potential_temperature(20.0, 1013.25) < 293.16);
    }

    #[test]
    fn humidity_back_conversion_roundtrip() {
        let p = 1013.25;
        let t = 18.0;
        for rh in [0.0, 25.0, 70.0, 100.0] {
            let e = rh / 100.0 * saturation_vapor_pressure_mb(t);
            let q = specific_humidity(e, p);
            assert_relative_eq!(
                relative_humidity_from_specific(q, p, t),
                rh,
                max_relative = 1e-9,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn humidity_back_conversion_clamps() {
        // Supersaturated q must clamp to 100, not overshoot.
        let q = specific_humidity(saturation_vapor_pressure_mb(25.0), 1013.25);
        assert_eq!(relative_humidity_from_specific(q, 1013.25, 18.0), 100.0);
        assert_eq!(relative_humidity_from_specific(0.0, 1013.25, 18.0), 0.0);
    }

    #[test]
    fn water_density_peaks_near_four_degrees() {
        let rho4 = water_density(4.0);
        assert!((rho4 - 1000.0).abs() < 0.1);
        assert!(water_density(0.0) < rho4);
        assert!(water_density(20.0) < rho4);
        assert!((water_density(20.0) - 998.2).abs() < 0.1);
    }
}
