//! Core rust implementation of flowmodel, a crate for building small linear and
//! mixed-integer network flow and scheduling models and handing them to a solver.
//!
//! - [`optimize`] holds the generic model layer: variables, linear expressions,
//!   constraints, prioritized objectives, and the solver backends.
//! - [`formulations`] builds transportation, cable layout (fixed-charge network flow)
//!   and workforce scheduling models on top of it.
//! - [`geometry`] provides the segment crossing filter used by the cable layout.
//! - [`io`] reads instances from JSON and CSV files.
pub mod configuration;
pub mod formulations;
pub mod geometry;
pub mod io;
pub mod optimize;
