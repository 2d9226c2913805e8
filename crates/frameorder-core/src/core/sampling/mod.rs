//! Deterministic low-discrepancy sampling of the angular motion space.

pub mod sobol;

pub use sobol::{AngleDim, SobolError, SobolSet};
