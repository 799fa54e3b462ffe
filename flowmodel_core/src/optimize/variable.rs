//! Module providing representation of optimization problem variables
use std::fmt::{Display, Formatter};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::configuration::read_configuration;

/// A decision variable of an optimization problem
///
/// # Examples
/// ```rust
/// use flowmodel_core::optimize::variable::{VariableBuilder, VariableType};
/// let flow = VariableBuilder::default()
///     .id("flow[seattle,chicago]")
///     .lower_bound(0.0)
///     .upper_bound(350.)
///     .build()
///     .unwrap();
/// assert_eq!(flow.variable_type, VariableType::Continuous);
/// ```
#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct Variable {
    /// Used to identify the variable, must be unique within a problem
    #[builder(setter(into))]
    pub id: String,
    /// Human-readable name
    #[builder(default, setter(into, strip_option))]
    pub name: Option<String>,
    /// Domain of the variable
    #[builder(default = "VariableType::Continuous")]
    pub variable_type: VariableType,
    /// Lowest value the variable can take
    #[builder(default = "self.default_lower_bound()")]
    pub lower_bound: f64,
    /// Highest value the variable can take
    #[builder(default = "self.default_upper_bound()")]
    pub upper_bound: f64,
}

impl VariableBuilder {
    fn validate(&self) -> Result<(), String> {
        if let (Some(lb), Some(ub)) = (self.lower_bound, self.upper_bound) {
            if lb > ub {
                return Err(format!("lower bound {lb} is above upper bound {ub}"));
            }
        }
        Ok(())
    }

    fn default_lower_bound(&self) -> f64 {
        match self.variable_type {
            Some(VariableType::Binary) => 0.,
            _ => read_configuration().lower_bound,
        }
    }

    fn default_upper_bound(&self) -> f64 {
        match self.variable_type {
            Some(VariableType::Binary) => 1.,
            _ => read_configuration().upper_bound,
        }
    }
}

impl Variable {
    /// Create a new binary variable
    pub fn new_binary(id: &str) -> Variable {
        Variable {
            id: id.to_string(),
            name: None,
            variable_type: VariableType::Binary,
            lower_bound: 0.,
            upper_bound: 1.,
        }
    }

    /// Create a new continuous variable
    pub fn new_continuous(id: &str, lower_bound: f64, upper_bound: f64) -> Variable {
        Variable {
            id: id.to_string(),
            name: None,
            variable_type: VariableType::Continuous,
            lower_bound,
            upper_bound,
        }
    }

    /// Create a new integer variable
    pub fn new_integer(id: &str, lower_bound: f64, upper_bound: f64) -> Variable {
        Variable {
            id: id.to_string(),
            name: None,
            variable_type: VariableType::Integer,
            lower_bound,
            upper_bound,
        }
    }

    /// Whether the variable is restricted to integral values
    pub fn is_integral(&self) -> bool {
        matches!(
            self.variable_type,
            VariableType::Integer | VariableType::Binary
        )
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}:{}", name, self.variable_type),
            None => write!(f, "{}:{}", self.id, self.variable_type),
        }
    }
}

/// Handle to a variable that has been added to a [`crate::optimize::problem::Problem`]
///
/// Handles are cheap to copy and are only meaningful for the problem that issued
/// them.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct VarRef {
    pub(crate) index: usize,
    pub(crate) problem: u64,
}

impl VarRef {
    /// Position of the variable within its problem
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Represents the type of variable in an optimization problem
///
/// # Notes:
/// Not all variable types are supported for all solvers, currently Clarabel only supports
/// Continuous variables, while microlp and HiGHS support all types
#[derive(Debug, PartialEq, Clone, Copy, Hash, Eq, Serialize, Deserialize)]
pub enum VariableType {
    /// Continuous variable
    Continuous,
    /// Integer variable
    Integer,
    /// Binary Variable
    Binary,
}

impl Display for VariableType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            VariableType::Continuous => write!(f, "CONTINUOUS"),
            VariableType::Integer => write!(f, "INTEGER"),
            VariableType::Binary => write!(f, "BINARY"),
        }
    }
}
