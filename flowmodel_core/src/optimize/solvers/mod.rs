//! Interface between problems and the external solver engines
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::optimize::objective::ObjectiveSense;
use crate::optimize::variable::VariableType;
use crate::optimize::OptimizationStatus;

pub mod clarabel;
#[cfg(feature = "highs")]
pub mod highs;
#[cfg(feature = "minilp")]
pub mod microlp;

/// Solver backends that can be selected at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    /// Pure rust simplex with branch and bound, supports integer variables
    Microlp,
    /// Clarabel interior point solver, continuous problems only
    Clarabel,
    /// HiGHS, requires the highs feature to be enabled
    Highs,
}

cfg_if::cfg_if! {
    if #[cfg(feature = "minilp")] {
        impl Default for SolverKind {
            fn default() -> Self {
                SolverKind::Microlp
            }
        }
    } else if #[cfg(feature = "highs")] {
        impl Default for SolverKind {
            fn default() -> Self {
                SolverKind::Highs
            }
        }
    } else {
        impl Default for SolverKind {
            fn default() -> Self {
                SolverKind::Clarabel
            }
        }
    }
}

impl Display for SolverKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverKind::Microlp => write!(f, "microlp"),
            SolverKind::Clarabel => write!(f, "clarabel"),
            SolverKind::Highs => write!(f, "highs"),
        }
    }
}

impl FromStr for SolverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "microlp" | "minilp" => Ok(SolverKind::Microlp),
            "clarabel" => Ok(SolverKind::Clarabel),
            "highs" => Ok(SolverKind::Highs),
            other => Err(format!(
                "unknown solver '{other}', expected one of microlp, clarabel, highs"
            )),
        }
    }
}

/// Create a fresh solver of the given kind
pub fn new_solver(kind: SolverKind) -> Result<Box<dyn Solver>, SolverError> {
    match kind {
        SolverKind::Microlp => microlp_solver(),
        SolverKind::Clarabel => Ok(Box::new(clarabel::ClarabelSolver::new())),
        SolverKind::Highs => highs_solver(),
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "minilp")] {
        fn microlp_solver() -> Result<Box<dyn Solver>, SolverError> {
            Ok(Box::new(microlp::MicrolpSolver::new()))
        }
    } else {
        fn microlp_solver() -> Result<Box<dyn Solver>, SolverError> {
            Err(SolverError::SolverNotAvailable(SolverKind::Microlp))
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "highs")] {
        fn highs_solver() -> Result<Box<dyn Solver>, SolverError> {
            Ok(Box::new(highs::HighsSolver::new()))
        }
    } else {
        fn highs_solver() -> Result<Box<dyn Solver>, SolverError> {
            Err(SolverError::SolverNotAvailable(SolverKind::Highs))
        }
    }
}

/// A column of the lowered model
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub id: String,
    pub variable_type: VariableType,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// Objective coefficient
    pub objective: f64,
}

/// A sparse row of the lowered model, `lower_bound <= Σ coefficients[k] * x[indices[k]] <= upper_bound`
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: String,
    pub indices: Vec<usize>,
    pub coefficients: Vec<f64>,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl Row {
    pub fn is_equality(&self) -> bool {
        self.lower_bound == self.upper_bound
    }
}

/// The model in the form handed to a solver engine: columns with domains and
/// objective coefficients, and sparse rows with bounds
#[derive(Debug, Clone, PartialEq)]
pub struct StandardForm {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
    pub sense: ObjectiveSense,
    column_index: IndexMap<String, usize>,
}

impl Default for StandardForm {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            sense: ObjectiveSense::Minimize,
            column_index: IndexMap::new(),
        }
    }
}

impl StandardForm {
    fn add_column(
        &mut self,
        id: &str,
        variable_type: VariableType,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError> {
        if self.column_index.contains_key(id) {
            return Err(SolverError::DuplicateId(id.to_string()));
        }
        self.column_index.insert(id.to_string(), self.columns.len());
        self.columns.push(Column {
            id: id.to_string(),
            variable_type,
            lower_bound,
            upper_bound,
            objective: 0.,
        });
        Ok(())
    }

    fn add_row(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError> {
        if variables.len() != coefficients.len() {
            return Err(SolverError::MismatchedTerms(id.to_string()));
        }
        // Repeated columns are summed, engines expect each column once per row
        let mut merged: IndexMap<usize, f64> = IndexMap::new();
        for (variable, coefficient) in variables.iter().zip(coefficients) {
            *merged.entry(self.column(variable)?).or_insert(0.) += *coefficient;
        }
        let (indices, coefficients) = merged.into_iter().unzip();
        self.rows.push(Row {
            id: id.to_string(),
            indices,
            coefficients,
            lower_bound,
            upper_bound,
        });
        Ok(())
    }

    fn column(&self, id: &str) -> Result<usize, SolverError> {
        self.column_index
            .get(id)
            .copied()
            .ok_or_else(|| SolverError::UnknownVariable(id.to_string()))
    }
}

/// What a solver engine hands back
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutcome {
    pub status: OptimizationStatus,
    /// Objective value, as reported by the engine, when a solution exists
    pub objective_value: Option<f64>,
    /// Column values in column order, when a solution exists
    pub values: Option<Vec<f64>>,
}

impl SolverOutcome {
    /// An outcome carrying only a status
    pub fn without_solution(status: OptimizationStatus) -> Self {
        Self {
            status,
            objective_value: None,
            values: None,
        }
    }
}

/// Common interface for the solver engines
///
/// Variables and constraints are passed by id. Engines buffer the model in a
/// [`StandardForm`] and only hand it to the engine in [`Solver::solve`].
pub trait Solver {
    /// Name used in logs and errors
    fn name(&self) -> &'static str;

    /// Whether the engine can handle integer and binary variables
    fn integer_variable_capable(&self) -> bool;

    fn program(&self) -> &StandardForm;

    fn program_mut(&mut self) -> &mut StandardForm;

    /// Hand the buffered model to the engine
    fn solve(&mut self) -> Result<SolverOutcome, SolverError>;

    fn add_continuous_variable(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError> {
        self.program_mut()
            .add_column(id, VariableType::Continuous, lower_bound, upper_bound)
    }

    fn add_binary_variable(&mut self, id: &str) -> Result<(), SolverError> {
        if !self.integer_variable_capable() {
            return Err(SolverError::UnsupportedVariableType {
                solver: self.name(),
                variable_type: VariableType::Binary,
            });
        }
        self.program_mut()
            .add_column(id, VariableType::Binary, 0., 1.)
    }

    fn add_integer_variable(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError> {
        if !self.integer_variable_capable() {
            return Err(SolverError::UnsupportedVariableType {
                solver: self.name(),
                variable_type: VariableType::Integer,
            });
        }
        self.program_mut()
            .add_column(id, VariableType::Integer, lower_bound, upper_bound)
    }

    fn add_equality_constraint(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        equals: f64,
    ) -> Result<(), SolverError> {
        self.program_mut()
            .add_row(id, variables, coefficients, equals, equals)
    }

    fn add_inequality_constraint(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError> {
        self.program_mut()
            .add_row(id, variables, coefficients, lower_bound, upper_bound)
    }

    fn add_linear_objective_term(
        &mut self,
        variable_id: &str,
        coefficient: f64,
    ) -> Result<(), SolverError> {
        let program = self.program_mut();
        let column = program.column(variable_id)?;
        program.columns[column].objective += coefficient;
        Ok(())
    }

    fn set_objective_sense(&mut self, objective_sense: ObjectiveSense) {
        self.program_mut().sense = objective_sense;
    }

    fn clear_objective(&mut self) {
        self.program_mut()
            .columns
            .iter_mut()
            .for_each(|c| c.objective = 0.);
    }
}

/// Errors raised at the solver boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("The {0} solver was not enabled when this crate was compiled")]
    SolverNotAvailable(SolverKind),
    #[error("The {solver} solver does not support {variable_type} variables")]
    UnsupportedVariableType {
        solver: &'static str,
        variable_type: VariableType,
    },
    #[error("Variable or constraint id {0} was passed to the solver twice")]
    DuplicateId(String),
    #[error("Variable {0} is not known to the solver")]
    UnknownVariable(String),
    #[error("Constraint {0} has a different number of variables and coefficients")]
    MismatchedTerms(String),
    #[error("Invalid solver settings: {0}")]
    Settings(String),
    #[error("Solver failed internally: {0}")]
    Internal(String),
}
