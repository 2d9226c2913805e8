//! # Workflows Module
//!
//! High-level procedures built on the frame order target function.
//!
//! ## Overview
//!
//! The target function itself is driven by an external optimiser. Workflows
//! cover the surrounding tasks a user runs directly: reading a run file,
//! constructing the target and reporting the back-calculated data at a given
//! parameter vector.
//!
//! - **Back-calculation** ([`back_calc`]) - Run-file driven evaluation with a
//!   per-alignment chi-squared report.

pub mod back_calc;
