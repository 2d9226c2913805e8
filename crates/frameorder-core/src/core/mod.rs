//! # Core Module
//!
//! Stateless numerics of frame order analysis.
//!
//! ## Overview
//!
//! The core module holds everything that does not depend on a particular
//! optimisation run: rotation and tensor algebra, the physical constants of
//! the RDC and PCS, the frame order matrices of every motional model and the
//! integrators that average the PCS over a motional distribution.
//!
//! ## Architecture
//!
//! - **Physical Constants** ([`alignment`]) - PCS constants and single-state RDC and PCS
//! - **Frame Order Matrices** ([`frame_order`]) - Per-model first and second degree matrices
//! - **Numerical Integration** ([`integration`]) - Adaptive Gauss-Kronrod quadrature
//! - **Run Files** ([`io`]) - TOML descriptions of a run
//! - **Data Models** ([`models`]) - The motional model catalogue and experimental data
//! - **PCS Averaging** ([`pcs`]) - Quadrature and quasi-random PCS integrators
//! - **Sampling** ([`sampling`]) - Sobol low-discrepancy point sets
//! - **Utilities** ([`utils`]) - Rotations, Kronecker products and tensor conversions
//!
//! ## Scientific Foundation
//!
//! - **RDC averaging** is linear in the rotation products, so the second degree
//!   frame order matrix reduces an alignment tensor exactly
//! - **PCS averaging** depends on the atomic position as well, so it is
//!   integrated numerically over the motional support

pub mod alignment;
pub mod frame_order;
pub mod integration;
pub mod io;
pub mod models;
pub mod pcs;
pub mod sampling;
pub mod utils;
