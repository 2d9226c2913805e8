//! # Engine Module
//!
//! The stateful frame order target function.
//!
//! ## Overview
//!
//! A [`FrameOrderTarget`](target::FrameOrderTarget) is constructed once per
//! optimisation run from a validated [`TargetConfig`](config::TargetConfig).
//! The optimiser then calls `evaluate` with candidate parameter vectors and
//! reads back a single chi-squared value.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Builder, integration mode and construction errors
//! - **Data Preparation** ([`data`]) - Missing-data flags and weighted errors
//! - **Model Registry** ([`registry`]) - Static strategy table of the motional models
//! - **Parameter Layout** ([`params`]) - Ordering, naming and unpacking of parameter vectors
//! - **Per-call Geometry** ([`geometry`]) - Pivot and paramagnetic centre vectors
//! - **Target Function** ([`target`]) - Evaluation and back-calculation
//! - **Error Handling** ([`error`]) - Evaluation-time errors
//!
//! ## Key Capabilities
//!
//! - **Eager validation** so that evaluation never fails on malformed input
//! - **Lazy Sobol point set** shared by every evaluation of a run
//! - **Deterministic results** independent of the worker thread count

pub mod config;
pub mod data;
pub mod error;
pub mod geometry;
pub mod params;
pub mod registry;
pub mod target;
