//! Instance formulations built on the [`optimize`](crate::optimize) layer
//!
//! Each formulation turns a problem instance into a [`Problem`](crate::optimize::problem::Problem),
//! solves it, and reads the solver's assignment back into a plain result struct.
pub mod cable_layout;
pub mod fixed_charge;
pub mod transportation;
pub mod var_map;
pub mod workforce;

use thiserror::Error;

use crate::optimize::problem::ProblemError;

pub use var_map::VarMap;

/// Errors raised while building or solving a formulation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulationError {
    /// Two nodes (sites, shifts, workers, ...) share a name
    #[error("Node {0} appears more than once")]
    DuplicateNode(String),
    /// A node was referenced that is not part of the instance
    #[error("Unknown node {0}")]
    UnknownNode(String),
    /// A supply/demand pair has no distance
    #[error("No distance given from {from} to {to}")]
    MissingDistance { from: String, to: String },
    /// Availability references an unknown worker
    #[error("Availability references unknown worker {0}")]
    UnknownWorker(String),
    /// Availability references an unknown shift
    #[error("Availability references unknown shift {0}")]
    UnknownShift(String),
    /// A numeric input is out of range (negative capacity, demand, ...)
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: f64 },
    /// Error raised while building or solving the model
    #[error(transparent)]
    Problem(#[from] ProblemError),
}
