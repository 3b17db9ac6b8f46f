//! # lakeflux
//!
//! Turbulent surface fluxes over a water body from bulk near-surface
//! observations, using the iterative bulk-aerodynamic similarity-theory
//! algorithm of Zeng et al. (1998).
//!
//! Given equal-length arrays of surface temperature, wind speed, air
//! temperature, and relative humidity (each possibly measured at a
//! different height), the solver jointly resolves friction velocity,
//! temperature/humidity scaling parameters, and stability corrections,
//! and returns per-sample records of momentum, sensible, and latent heat
//! fluxes plus 10 m equivalents, transfer coefficients, and an
//! evaporation rate.
//!
//! The batch is a pure transform: no I/O, no shared mutable state, and no
//! cross-sample coupling. With the `parallel` feature, samples are
//! distributed over threads via rayon with identical results.

pub mod constants;
pub mod error;
pub mod roughness;
pub mod solver;
pub mod stability;
pub mod thermo;

pub use constants::{gravity, Constants, CHARNOCK, CP_AIR, R_DRY, VON_KARMAN, ZETA_M, ZETA_T};
pub use error::FluxError;
pub use roughness::{
    charnock_roughness, fit_roughness, scalar_roughness, seed_friction_velocity,
    RoughnessSolution,
};
pub use solver::{
    solve, FluxRecord, HeightField, Observations, Site, SolverConfig, GUST_WIND_FLOOR,
    WIND_FLOOR, ZETA_CLAMP,
};
pub use stability::{signed_powf, Profile, StabilityRegime};
