//! Process wide defaults used when building and solving models
use std::path::Path;
use std::sync::{LazyLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::io::IoError;
use crate::optimize::solvers::SolverKind;

pub static CONFIGURATION: LazyLock<RwLock<Configuration>> =
    LazyLock::new(|| RwLock::new(Configuration::default()));

/// Defaults applied to new variables and to every solve
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Lower bound given to continuous variables when none is specified
    pub lower_bound: f64,
    /// Upper bound given to continuous variables when none is specified
    pub upper_bound: f64,
    /// Tolerance used by [`crate::optimize::problem::Problem::check`] after every solve
    pub tolerance: f64,
    /// Values of binary variables above this threshold are read back as 1
    pub integrality_threshold: f64,
    /// Absolute slack allowed on an earlier objective during lexicographic solves
    pub lexicographic_abs_gap: f64,
    /// Relative slack allowed on an earlier objective during lexicographic solves
    pub lexicographic_rel_gap: f64,
    /// Solver backend used by [`crate::optimize::problem::Problem::optimize`]
    pub solver: SolverKind,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            lower_bound: 0.,
            upper_bound: f64::INFINITY,
            tolerance: 1e-6,
            integrality_threshold: 0.5,
            lexicographic_abs_gap: 1e-6,
            lexicographic_rel_gap: 1e-9,
            solver: SolverKind::default(),
        }
    }
}

impl Configuration {
    /// Read a configuration from a JSON file, missing fields take their default value
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Configuration, IoError> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Replace the global configuration
    pub fn install(self) {
        *write_configuration() = self;
    }
}

/// Get read access to the global configuration, ignoring lock poisoning
pub fn read_configuration() -> RwLockReadGuard<'static, Configuration> {
    CONFIGURATION
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Get write access to the global configuration
pub fn write_configuration() -> RwLockWriteGuard<'static, Configuration> {
    CONFIGURATION
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
