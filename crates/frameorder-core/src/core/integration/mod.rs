//! Deterministic numerical integration primitives.

pub mod quadrature;

pub use quadrature::{Integral, QuadratureSettings, integrate, quad};
