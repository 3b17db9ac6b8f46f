//! Iterative bulk-aerodynamic flux solver.
//!
//! Jointly resolves friction velocity, temperature and humidity scales,
//! and atmospheric-stability corrections from bulk near-surface
//! observations over a water body, following Zeng et al. (1998).
//!
//! # Physics
//!
//! The surface fluxes follow from the Monin-Obukhov scales:
//!
//! ```text
//! τ = ρ·u*²          H = −ρ·cp·u*·t*          E = −ρ·Lv·u*·q*
//! ```
//!
//! where u*, t*, q* are obtained from the log-profile laws with
//! regime-dependent stability corrections, and the Obukhov length
//!
//! ```text
//! L = −ρ·Tv·u*³ / (κ·g·(H/cp + 0.61·T·E/Lv))
//! ```
//!
//! closes the loop. The solver runs a per-sample fixed-point iteration
//! for the initial roughness length, then a fixed 20-pass outer loop
//! refining all scales, with a convective gustiness correction feeding an
//! effective wind speed back into unstable samples.
//!
//! Samples are independent; with the `parallel` feature the batch is
//! distributed across threads with identical numerical results.
//!
//! # Example
//!
//! ```
//! use lakeflux::{solve, Observations, Site, SolverConfig};
//!
//! let obs = Observations::new(&[20.0], &[5.0], &[18.0], &[70.0]);
//! let site = Site::new(10.0, 10.0, 10.0, 100.0, 45.0);
//! let records = solve(&obs, &site, &SolverConfig::default()).unwrap();
//!
//! // Warmer surface than air: upward sensible heat flux.
//! assert!(records[0].sensible_heat_flux > 0.0);
//! ```

use crate::constants::{Constants, CELSIUS_TO_KELVIN, ZETA_M, ZETA_T};
use crate::error::FluxError;
use crate::roughness::{charnock_roughness, fit_roughness, scalar_roughness};
use crate::stability::{signed_powf, Profile, StabilityRegime};
use crate::thermo;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Wind speed floor applied to every sample before any computation (m/s).
pub const WIND_FLOOR: f64 = 0.2;

/// Wind speed floor inside the unstable-branch gustiness correction (m/s).
pub const GUST_WIND_FLOOR: f64 = 0.1;

/// Magnitude bound on the stability parameter ζ.
pub const ZETA_CLAMP: f64 = 15.0;

/// Reference height for the 10 m-equivalent outputs (m).
const REFERENCE_HEIGHT: f64 = 10.0;

/// Free-convection correction coefficient, momentum profile.
const FREE_CONVECTION_M: f64 = 1.14;

/// Free-convection correction coefficient, scalar profiles.
const FREE_CONVECTION_T: f64 = 0.8;

/// One batch of bulk observations, one entry per time sample.
///
/// All four arrays must have equal length.
#[derive(Clone, Copy, Debug)]
pub struct Observations<'a> {
    /// Water surface temperature (°C).
    pub surface_temperature: &'a [f64],
    /// Wind speed at the wind measurement height (m/s).
    pub wind_speed: &'a [f64],
    /// Air temperature at the temperature measurement height (°C).
    pub air_temperature: &'a [f64],
    /// Relative humidity at the humidity measurement height (%).
    pub relative_humidity: &'a [f64],
}

impl<'a> Observations<'a> {
    /// Bundle observation slices.
    pub fn new(
        surface_temperature: &'a [f64],
        wind_speed: &'a [f64],
        air_temperature: &'a [f64],
        relative_humidity: &'a [f64],
    ) -> Self {
        Self {
            surface_temperature,
            wind_speed,
            air_temperature,
            relative_humidity,
        }
    }

    fn len(&self) -> usize {
        self.surface_temperature.len()
    }
}

/// Measurement height specification: one value for the whole run, or one
/// per sample.
#[derive(Clone, Debug)]
pub enum HeightField {
    /// Same height for every sample (m).
    Uniform(f64),
    /// Per-sample heights (m), length must match the observations.
    PerSample(Vec<f64>),
}

impl HeightField {
    fn get(&self, i: usize) -> f64 {
        match self {
            Self::Uniform(h) => *h,
            Self::PerSample(v) => v[i],
        }
    }

    fn validate(&self, name: &'static str, n: usize) -> Result<(), FluxError> {
        match self {
            Self::Uniform(h) => {
                if *h <= 0.0 {
                    return Err(FluxError::NonPositiveHeight { name, value: *h });
                }
            }
            Self::PerSample(v) => {
                if v.len() != n {
                    return Err(FluxError::LengthMismatch {
                        name,
                        expected: n,
                        actual: v.len(),
                    });
                }
                for &h in v {
                    if h <= 0.0 {
                        return Err(FluxError::NonPositiveHeight { name, value: h });
                    }
                }
            }
        }
        Ok(())
    }
}

impl From<f64> for HeightField {
    fn from(h: f64) -> Self {
        Self::Uniform(h)
    }
}

impl From<Vec<f64>> for HeightField {
    fn from(v: Vec<f64>) -> Self {
        Self::PerSample(v)
    }
}

/// Site metadata, constant for a run.
#[derive(Clone, Debug)]
pub struct Site {
    /// Wind measurement height (m).
    pub wind_height: HeightField,
    /// Air temperature measurement height (m).
    pub temperature_height: HeightField,
    /// Humidity measurement height (m).
    pub humidity_height: HeightField,
    /// Station altitude above sea level (m).
    pub altitude: f64,
    /// Latitude (degrees).
    pub latitude: f64,
}

impl Site {
    /// Create a site with uniform measurement heights.
    pub fn new(
        wind_height: f64,
        temperature_height: f64,
        humidity_height: f64,
        altitude: f64,
        latitude: f64,
    ) -> Self {
        Self {
            wind_height: wind_height.into(),
            temperature_height: temperature_height.into(),
            humidity_height: humidity_height.into(),
            altitude,
            latitude,
        }
    }

    /// Replace the wind height with per-sample values.
    pub fn with_wind_heights(mut self, heights: Vec<f64>) -> Self {
        self.wind_height = heights.into();
        self
    }

    /// Replace the temperature height with per-sample values.
    pub fn with_temperature_heights(mut self, heights: Vec<f64>) -> Self {
        self.temperature_height = heights.into();
        self
    }

    /// Replace the humidity height with per-sample values.
    pub fn with_humidity_heights(mut self, heights: Vec<f64>) -> Self {
        self.humidity_height = heights.into();
        self
    }
}

/// Solver configuration.
///
/// The defaults reproduce the reference algorithm: 20 outer passes with no
/// early exit, inner roughness tolerance 1e-5 with a 100-pass safety cap.
#[derive(Clone, Copy, Debug)]
pub struct SolverConfig {
    /// Number of outer correction passes.
    pub outer_iterations: usize,
    /// Relative-change tolerance for the inner roughness iteration.
    pub inner_tolerance: f64,
    /// Iteration cap for the inner roughness loop. The reference has no
    /// cap and risks non-termination; hitting this cap marks the sample
    /// as unconverged instead of aborting.
    pub inner_max_iterations: usize,
    /// Optional early stop for the outer loop: break once the relative
    /// change in u* between passes drops below this tolerance. `None`
    /// (the default) reproduces the fixed-iteration reference behavior.
    pub early_stop: Option<f64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            outer_iterations: 20,
            inner_tolerance: 1e-5,
            inner_max_iterations: 100,
            early_stop: None,
        }
    }
}

impl SolverConfig {
    /// Set the number of outer passes.
    pub fn with_outer_iterations(mut self, n: usize) -> Self {
        self.outer_iterations = n;
        self
    }

    /// Enable the convergence-based early stop for the outer loop.
    pub fn with_early_stop(mut self, tol: f64) -> Self {
        self.early_stop = Some(tol);
        self
    }
}

/// One output record per sample: fluxes, scales, 10 m equivalents,
/// transfer coefficients, and diagnostics.
///
/// Created once after iteration finishes; never mutated afterward.
#[derive(Clone, Copy, Debug)]
pub struct FluxRecord {
    /// Momentum flux τ = ρ·u*² (N/m²).
    pub momentum_flux: f64,
    /// Sensible heat flux H (W/m²), positive upward.
    pub sensible_heat_flux: f64,
    /// Latent heat flux E (W/m²), positive upward.
    pub latent_heat_flux: f64,
    /// Friction velocity u* (m/s).
    pub friction_velocity: f64,
    /// Temperature scale t* (K).
    pub temperature_scale: f64,
    /// Humidity scale q* (kg/kg).
    pub humidity_scale: f64,
    /// Obukhov length L (m).
    pub obukhov_length: f64,
    /// Final stability parameter ζ at the wind height, clamped to ±15.
    pub zeta: f64,
    /// 10 m-equivalent wind speed (m/s).
    pub u10: f64,
    /// 10 m-equivalent air temperature (°C).
    pub t10: f64,
    /// 10 m-equivalent specific humidity (kg/kg).
    pub q10: f64,
    /// 10 m-equivalent relative humidity (%), in [0, 100].
    pub rh10: f64,
    /// Momentum roughness length, stability-corrected (m).
    pub zo: f64,
    /// Heat roughness length, stability-corrected (m).
    pub zot: f64,
    /// Humidity roughness length, stability-corrected (m).
    pub zoq: f64,
    /// Momentum roughness length under neutral stratification (m).
    pub zo_neutral: f64,
    /// Heat roughness length under neutral stratification (m).
    pub zot_neutral: f64,
    /// Humidity roughness length under neutral stratification (m).
    pub zoq_neutral: f64,
    /// Drag coefficient at the wind measurement height.
    pub cd: f64,
    /// Sensible heat transfer coefficient at measurement height.
    pub ch: f64,
    /// Latent heat transfer coefficient at measurement height.
    pub ce: f64,
    /// Drag coefficient at 10 m.
    pub cd10: f64,
    /// Sensible heat transfer coefficient at 10 m.
    pub ch10: f64,
    /// Latent heat transfer coefficient at 10 m.
    pub ce10: f64,
    /// Neutral drag coefficient at 10 m.
    pub cd10_neutral: f64,
    /// Neutral sensible heat transfer coefficient at 10 m.
    pub ch10_neutral: f64,
    /// Neutral latent heat transfer coefficient at 10 m.
    pub ce10_neutral: f64,
    /// Air density (kg/m³).
    pub air_density: f64,
    /// Station pressure (Pa).
    pub station_pressure: f64,
    /// Saturation specific humidity at the water surface (kg/kg).
    pub q_sat_surface: f64,
    /// Specific humidity of the air (kg/kg).
    pub q_air: f64,
    /// Latent heat of vaporization (J/kg).
    pub latent_heat: f64,
    /// Evaporation rate (mm/day).
    pub evaporation: f64,
    /// Gustiness-adjusted effective wind speed from the final pass (m/s).
    pub effective_wind: f64,
    /// Whether the inner roughness iteration met its tolerance.
    pub inner_converged: bool,
}

/// Compute turbulent fluxes for a batch of observations.
///
/// Validates inputs (equal lengths, positive heights, non-negative
/// altitude, relative humidity in [0, 100]), then resolves every sample
/// independently. An empty batch yields an empty result.
///
/// # Errors
///
/// Returns [`FluxError`] if validation fails; validation errors abort the
/// whole batch before any computation.
pub fn solve(
    obs: &Observations<'_>,
    site: &Site,
    config: &SolverConfig,
) -> Result<Vec<FluxRecord>, FluxError> {
    let n = obs.len();
    validate(obs, site, n)?;

    let consts = Constants::for_site(site.latitude, site.altitude);
    let pressure_mb = thermo::station_pressure_mb(site.altitude);

    let sample = |i: usize| {
        solve_sample(
            obs.surface_temperature[i],
            obs.wind_speed[i],
            obs.air_temperature[i],
            obs.relative_humidity[i],
            site.wind_height.get(i),
            site.temperature_height.get(i),
            site.humidity_height.get(i),
            pressure_mb,
            &consts,
            config,
        )
    };

    #[cfg(feature = "parallel")]
    let records = (0..n).into_par_iter().map(sample).collect();
    #[cfg(not(feature = "parallel"))]
    let records = (0..n).map(sample).collect();

    Ok(records)
}

fn validate(obs: &Observations<'_>, site: &Site, n: usize) -> Result<(), FluxError> {
    let arrays: [(&'static str, usize); 3] = [
        ("wind_speed", obs.wind_speed.len()),
        ("air_temperature", obs.air_temperature.len()),
        ("relative_humidity", obs.relative_humidity.len()),
    ];
    for (name, len) in arrays {
        if len != n {
            return Err(FluxError::LengthMismatch {
                name,
                expected: n,
                actual: len,
            });
        }
    }

    site.wind_height.validate("wind", n)?;
    site.temperature_height.validate("temperature", n)?;
    site.humidity_height.validate("humidity", n)?;
    if site.altitude < 0.0 {
        return Err(FluxError::NegativeAltitude {
            value: site.altitude,
        });
    }

    for (index, &value) in obs.relative_humidity.iter().enumerate() {
        if !(0.0..=100.0).contains(&value) {
            return Err(FluxError::HumidityOutOfRange { index, value });
        }
    }

    Ok(())
}

/// Denominator of the log-profile solution for the wind profile.
///
/// Dispatches on the momentum stability regime of the (clamped) ζ at the
/// profile height `h`. In the free-convection regime the ψ correction is
/// evaluated at the threshold ζ_m and extended by the convective term.
fn momentum_denominator(zeta: f64, h: f64, zo: f64, obu: f64) -> f64 {
    let p = Profile::Momentum;
    match StabilityRegime::for_momentum(zeta) {
        StabilityRegime::VeryUnstable => {
            (ZETA_M * obu / zo).ln() - p.psi(ZETA_M) + p.psi(zo / obu)
                + FREE_CONVECTION_M
                    * (signed_powf(-zeta, 1.0 / 3.0) - signed_powf(-ZETA_M, 1.0 / 3.0))
        }
        StabilityRegime::Unstable => (h / zo).ln() - p.psi(zeta) + p.psi(zo / obu),
        StabilityRegime::Stable => (h / zo).ln() + 5.0 * zeta - 5.0 * zo / obu,
        StabilityRegime::VeryStable => (obu / zo).ln() + 5.0 + 5.0 * zeta.ln() + zeta - 1.0,
    }
}

/// Denominator of the log-profile solution for a scalar (heat or
/// humidity) profile with roughness length `zos`.
fn scalar_denominator(zeta: f64, h: f64, zos: f64, obu: f64) -> f64 {
    let p = Profile::Scalar;
    match StabilityRegime::for_scalar(zeta) {
        StabilityRegime::VeryUnstable => {
            (ZETA_T * obu / zos).ln() - p.psi(ZETA_T) + p.psi(zos / obu)
                + FREE_CONVECTION_T
                    * (signed_powf(-ZETA_T, -1.0 / 3.0) - signed_powf(-zeta, -1.0 / 3.0))
        }
        StabilityRegime::Unstable => (h / zos).ln() - p.psi(zeta) + p.psi(zos / obu),
        StabilityRegime::Stable => (h / zos).ln() + 5.0 * zeta - 5.0 * zos / obu,
        StabilityRegime::VeryStable => (obu / zos).ln() + 5.0 + 5.0 * zeta.ln() + zeta - 1.0,
    }
}

fn clamp_zeta(h: f64, obu: f64) -> f64 {
    (h / obu).clamp(-ZETA_CLAMP, ZETA_CLAMP)
}

/// Resolve one sample. Pure fixed-point computation, no cross-sample
/// coupling.
#[allow(clippy::too_many_arguments)]
fn solve_sample(
    ts: f64,
    wind_raw: f64,
    ta: f64,
    rh: f64,
    hu: f64,
    ht: f64,
    hq: f64,
    pressure_mb: f64,
    consts: &Constants,
    config: &SolverConfig,
) -> FluxRecord {
    let kv = consts.kv;
    let g = consts.g;

    // Stage 1: derived thermodynamics.
    let u = wind_raw.max(WIND_FLOOR);
    let e_air = rh / 100.0 * thermo::saturation_vapor_pressure_mb(ta);
    let q_air = thermo::specific_humidity(e_air, pressure_mb);
    let q_sat = thermo::specific_humidity(
        thermo::saturation_vapor_pressure_mb(ts),
        pressure_mb,
    );
    let r_moist = thermo::moist_gas_constant(q_air);
    let lv = thermo::latent_heat_vaporization(ts);
    let rho = thermo::air_density(pressure_mb, r_moist, ta);
    let nu = thermo::kinematic_viscosity(ta, rho);
    let tv = thermo::virtual_temperature(ta, q_air);
    let theta = thermo::potential_temperature(ta, pressure_mb);
    let ta_k = ta + CELSIUS_TO_KELVIN;

    // Stage 2: initial roughness length.
    let fit = fit_roughness(
        u,
        hu,
        nu,
        consts,
        config.inner_tolerance,
        config.inner_max_iterations,
    );
    let inner_converged = fit.converged();
    let mut zo = fit.zo();
    let mut ustar = fit.ustar();

    // Stage 3: neutral coefficients and initial Obukhov length.
    let mut zot = scalar_roughness(zo, ustar, nu);
    let mut zoq = zot;
    let zo_neutral = zo;
    let zot_neutral = zot;
    let zoq_neutral = zoq;

    let cd10_neutral = (kv / (REFERENCE_HEIGHT / zo).ln()).powi(2);
    let ch10_neutral = kv * cd10_neutral.sqrt() / (REFERENCE_HEIGHT / zot).ln();
    let ce10_neutral = kv * cd10_neutral.sqrt() / (REFERENCE_HEIGHT / zoq).ln();

    let cd_n = (kv / (hu / zo).ln()).powi(2);
    let ch_n = kv * cd_n.sqrt() / (ht / zot).ln();
    let ce_n = kv * cd_n.sqrt() / (hq / zoq).ln();

    // Neutral-stratification fluxes seed the Obukhov length.
    let mut tstar = -ch_n * u * (ts - ta) / ustar;
    let mut qstar = -ce_n * u * (q_sat - q_air) / ustar;
    let mut shf = -rho * consts.cp * ustar * tstar;
    let mut lhf = -rho * lv * ustar * qstar;
    let mut obu =
        -rho * tv * ustar.powi(3) / (kv * g * (shf / consts.cp + 0.61 * ta_k * lhf / lv));

    // Stage 4: outer correction loop.
    let mut u_eff = u;
    let mut tau = rho * ustar * ustar;
    let mut u10 = u;
    let mut t10 = ta;
    let mut q10 = q_air;
    let mut cd = cd_n;
    let mut ch = ch_n;
    let mut ce = ce_n;
    let mut cd10 = cd10_neutral;
    let mut ch10 = ch10_neutral;
    let mut ce10 = ce10_neutral;

    for _ in 0..config.outer_iterations {
        let ustar_prev = ustar;

        // (a) roughness update from the current friction velocity.
        zo = charnock_roughness(ustar, nu, consts);
        zoq = scalar_roughness(zo, ustar, nu);
        zot = zoq;

        // (b) profile solutions at each reference height.
        let zeta_u = clamp_zeta(hu, obu);
        let dm = momentum_denominator(zeta_u, hu, zo, obu);
        ustar = kv * u_eff / dm;

        let zeta_t = clamp_zeta(ht, obu);
        let dh = scalar_denominator(zeta_t, ht, zot, obu);
        tstar = kv * (ta - ts) / dh;

        let zeta_q = clamp_zeta(hq, obu);
        let dq = scalar_denominator(zeta_q, hq, zoq, obu);
        qstar = kv * (q_air - q_sat) / dq;

        let zeta_10 = clamp_zeta(REFERENCE_HEIGHT, obu);
        let dm10 = momentum_denominator(zeta_10, REFERENCE_HEIGHT, zo, obu);
        let dh10 = scalar_denominator(zeta_10, REFERENCE_HEIGHT, zot, obu);
        let dq10 = scalar_denominator(zeta_10, REFERENCE_HEIGHT, zoq, obu);
        u10 = ustar / kv * dm10;
        t10 = ts + tstar / kv * dh10;
        q10 = q_sat + qstar / kv * dq10;

        // (c) bulk transfer coefficients. Writing them as κ²/(D_a·D_b)
        // keeps them defined when the air-surface gradient vanishes.
        cd = (kv / dm).powi(2);
        ch = kv * kv / (dm * dh);
        ce = kv * kv / (dm * dq);
        cd10 = (kv / dm10).powi(2);
        ch10 = kv * kv / (dm10 * dh10);
        ce10 = kv * kv / (dm10 * dq10);

        // (d) fluxes from the updated scales.
        tau = rho * ustar * ustar;
        shf = -rho * consts.cp * ustar * tstar;
        lhf = -rho * lv * ustar * qstar;

        // (e) Obukhov length from the updated fluxes.
        obu = -rho * tv * ustar.powi(3)
            / (kv * g * (shf / consts.cp + 0.61 * ta_k * lhf / lv));

        // (f) convective gustiness: unstable samples gain a
        // free-convection velocity scale added in quadrature.
        if StabilityRegime::for_momentum(zeta_u).is_unstable() {
            let theta_v = theta * (1.0 + 0.61 * q_air);
            let theta_v_star = tstar * (1.0 + 0.61 * q_air) + 0.61 * theta * qstar;
            let wc = signed_powf(-g * ustar * theta_v_star / theta_v, 1.0 / 3.0);
            let u_base = u.max(GUST_WIND_FLOOR);
            u_eff = (u_base * u_base + wc * wc).sqrt();
        } else {
            u_eff = u;
        }

        if let Some(tol) = config.early_stop {
            if ((ustar - ustar_prev) / ustar_prev).abs() < tol {
                break;
            }
        }
    }

    // Stage 5: post-processing.
    if hu == REFERENCE_HEIGHT {
        u10 = u;
    }
    if ht == REFERENCE_HEIGHT {
        t10 = ta;
    }
    let rh10 = if hq == REFERENCE_HEIGHT {
        q10 = q_air;
        rh
    } else {
        thermo::relative_humidity_from_specific(q10, pressure_mb, t10)
    };

    let rho_water = thermo::water_density(ts);
    let evaporation = 8.64e7 * lhf / (rho_water * lv);

    FluxRecord {
        momentum_flux: tau,
        sensible_heat_flux: shf,
        latent_heat_flux: lhf,
        friction_velocity: ustar,
        temperature_scale: tstar,
        humidity_scale: qstar,
        obukhov_length: obu,
        zeta: clamp_zeta(hu, obu),
        u10,
        t10,
        q10,
        rh10,
        zo,
        zot,
        zoq,
        zo_neutral,
        zot_neutral,
        zoq_neutral,
        cd,
        ch,
        ce,
        cd10,
        ch10,
        ce10,
        cd10_neutral,
        ch10_neutral,
        ce10_neutral,
        air_density: rho,
        station_pressure: pressure_mb * 100.0,
        q_sat_surface: q_sat,
        q_air,
        latent_heat: lv,
        evaporation,
        effective_wind: u_eff,
        inner_converged,
    }
}
