//! # Frame Order Library
//!
//! Target functions for fitting models of inter-domain motion to residual
//! dipolar couplings (RDC) and pseudo-contact shifts (PCS).
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless numerics: rotation and tensor algebra,
//!   the frame order matrices of the motional models (`frame_order`), the PCS
//!   integrators (`pcs`), Sobol sampling and adaptive quadrature.
//!
//! - **[`engine`]: The Logic Core.** The stateful target function. A
//!   `FrameOrderTarget` validates its configuration once, then turns every
//!   parameter vector proposed by an external optimiser into a chi-squared value.
//!
//! - **[`workflows`]: The Public API.** User-facing procedures built on the engine,
//!   such as back-calculating the data of a run file.
//!
//! ## Motional Models
//!
//! Rigid, rotor, free rotor, isotropic cone (with torsion, torsionless or free
//! rotor), pseudo-ellipse and line, each in the same three torsion variants.
//!
//! ## Features
//!
//! - `parallel` (default): spreads the PCS integration over a rayon thread pool.
//!   Results are identical with and without it.

pub mod core;
pub mod engine;
pub mod workflows;
