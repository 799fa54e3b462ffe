//! Module for constructing and solving optimization problems

pub mod constraint;
pub mod expression;
pub mod objective;
pub mod problem;
pub mod solvers;
pub mod variable;

use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::optimize::variable::VarRef;

/// Struct representing the solution to an optimization problem
#[derive(Debug, Clone, PartialEq)]
pub struct ProblemSolution {
    /// The status of the optimization problem, representing if the optimization was
    /// completed successfully
    pub status: OptimizationStatus,
    /// Optimized value of the highest priority objective
    ///
    /// Some(f64) if the optimization was completed successfully, None otherwise
    pub objective_value: Option<f64>,
    /// Value of every objective at the final solution, keyed by objective id
    ///
    /// Empty if the problem could not be solved
    pub objective_values: IndexMap<String, f64>,
    /// Values of the variables at the optimum,
    ///
    /// Some(IndexMap), keyed by variable id, with values corresponding to variable
    /// values at optimum if the problem could be solved, None otherwise
    pub variable_values: Option<IndexMap<String, f64>>,
}

impl ProblemSolution {
    /// A solution carrying only a status
    pub fn without_solution(status: OptimizationStatus) -> Self {
        Self {
            status,
            objective_value: None,
            objective_values: IndexMap::new(),
            variable_values: None,
        }
    }

    /// Value of a variable, if the problem was solved and the variable exists
    pub fn value(&self, variable_id: &str) -> Option<f64> {
        self.variable_values
            .as_ref()
            .and_then(|values| values.get(variable_id).copied())
    }

    /// Value of a variable by handle
    ///
    /// The handle must come from the problem that produced this solution, since
    /// variable values are stored in the problem's variable order.
    pub fn var_value(&self, var: VarRef) -> Option<f64> {
        self.variable_values
            .as_ref()
            .and_then(|values| values.get_index(var.index).map(|(_, v)| *v))
    }

    /// Value of an objective, if the problem was solved and the objective exists
    pub fn objective(&self, objective_id: &str) -> Option<f64> {
        self.objective_values.get(objective_id).copied()
    }

    pub fn is_optimal(&self) -> bool {
        self.status == OptimizationStatus::Optimal
    }

    /// Whether the solver produced variable values, either optimal or approximately so
    pub fn has_solution(&self) -> bool {
        self.variable_values.is_some()
    }
}

/// Status of an optimization problem
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizationStatus {
    /// Problem has not yet attempted to be optimized
    Unoptimized,
    /// Problem has been optimized
    Optimal,
    /// Problem can't be optimized because objective value is not bounded
    Unbounded,
    /// Problem can't be solved because it is infeasible (conflicting constraints)
    Infeasible,
    /// The solver proved the problem is either infeasible or unbounded, but not which
    InfeasibleOrUnbounded,
    /// An approximate solution has been found
    AlmostOptimal,
    /// A numerical error occurred during solving
    NumericalError,
    /// The solver hit the maximum allowed iterations, or max time, or made insufficient progress
    SolverHalted,
}

impl Display for OptimizationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OptimizationStatus::Unoptimized => "unoptimized",
            OptimizationStatus::Optimal => "optimal",
            OptimizationStatus::Unbounded => "unbounded",
            OptimizationStatus::Infeasible => "infeasible",
            OptimizationStatus::InfeasibleOrUnbounded => "infeasible or unbounded",
            OptimizationStatus::AlmostOptimal => "almost optimal",
            OptimizationStatus::NumericalError => "numerical error",
            OptimizationStatus::SolverHalted => "solver halted",
        };
        write!(f, "{}", s)
    }
}
