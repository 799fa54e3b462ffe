//! The model container: variables, rows and objectives, plus the lexicographic solve loop
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::configuration::read_configuration;
use crate::optimize::constraint::Constraint;
use crate::optimize::expression::LinearExpr;
use crate::optimize::objective::{Objective, ObjectiveSense};
use crate::optimize::solvers::{new_solver, Solver, SolverError, SolverKind};
use crate::optimize::variable::{VarRef, Variable, VariableType};
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// Id given to the objective created by [`Problem::set_objective`]
pub const DEFAULT_OBJECTIVE_ID: &str = "objective";

static NEXT_PROBLEM_ID: AtomicU64 = AtomicU64::new(1);

/// An optimization problem
#[derive(Debug, Clone)]
pub struct Problem {
    /// Tag shared by every [`VarRef`] issued by this problem
    id: u64,
    /// Objectives to optimize, in insertion order
    objectives: IndexMap<String, Objective>,
    /// Sense used for objectives created through [`Problem::set_objective`]
    sense: ObjectiveSense,
    /// Variables of the optimization problem
    variables: IndexMap<String, Variable>,
    /// Constraints of the optimization problem
    constraints: IndexMap<String, Constraint>,
    /// Current status of the optimization problem
    status: OptimizationStatus,
    /// Type of problem
    problem_type: ProblemType,
}

impl Problem {
    // region Creation Functions
    /// Empty problem whose objectives use `objective_sense`
    pub fn new(objective_sense: ObjectiveSense) -> Self {
        Self {
            id: NEXT_PROBLEM_ID.fetch_add(1, Ordering::Relaxed),
            objectives: IndexMap::new(),
            sense: objective_sense,
            variables: IndexMap::new(),
            constraints: IndexMap::new(),
            status: OptimizationStatus::Unoptimized,
            problem_type: ProblemType::LinearContinuous,
        }
    }

    /// Create a new maximization problem
    pub fn new_maximization() -> Self {
        Self::new(ObjectiveSense::Maximize)
    }

    /// Create a new minimization problem
    pub fn new_minimization() -> Self {
        Self::new(ObjectiveSense::Minimize)
    }
    // endregion Creation Functions

    // region Accessors
    pub fn status(&self) -> OptimizationStatus {
        self.status
    }

    pub fn problem_type(&self) -> ProblemType {
        self.problem_type
    }

    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Look up a variable by id
    pub fn variable(&self, id: &str) -> Option<&Variable> {
        self.variables.get(id)
    }

    /// Get the handle of a variable by id
    pub fn variable_ref(&self, id: &str) -> Option<VarRef> {
        self.variables.get_index_of(id).map(|index| VarRef {
            index,
            problem: self.id,
        })
    }

    /// Look up a variable by handle
    pub fn variable_by_ref(&self, var: VarRef) -> Option<&Variable> {
        if var.problem != self.id {
            return None;
        }
        self.variables.get_index(var.index).map(|(_, v)| v)
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    /// Look up a constraint by id
    pub fn constraint(&self, id: &str) -> Option<&Constraint> {
        self.constraints.get(id)
    }

    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.values()
    }

    /// Look up an objective by id
    pub fn objective(&self, id: &str) -> Option<&Objective> {
        self.objectives.get(id)
    }

    pub fn objectives(&self) -> impl Iterator<Item = &Objective> {
        self.objectives.values()
    }
    // endregion Accessors

    // region Update Objective Sense
    /// Update the objective sense of the problem, and of every objective already added
    pub fn update_objective_sense(&mut self, sense: ObjectiveSense) {
        self.sense = sense;
        self.objectives
            .values_mut()
            .for_each(|objective| objective.set_sense(sense));
    }
    // endregion Update Objective Sense

    // region Adding Variables
    /// Add a variable to the optimization problem, returning its handle
    pub fn add_variable(&mut self, variable: Variable) -> Result<VarRef, ProblemError> {
        self.validate_variable(&variable)?;
        if variable.is_integral() {
            self.problem_type = ProblemType::LinearMixedInteger;
        }
        let (index, _) = self.variables.insert_full(variable.id.clone(), variable);
        Ok(VarRef {
            index,
            problem: self.id,
        })
    }

    /// Build a variable from its parts and add it
    pub fn add_new_variable(
        &mut self,
        id: &str,
        name: Option<&str>,
        variable_type: VariableType,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<VarRef, ProblemError> {
        self.add_variable(Variable {
            id: id.to_string(),
            name: name.map(|n| n.to_string()),
            variable_type,
            lower_bound,
            upper_bound,
        })
    }

    /// Add a new binary variable
    pub fn add_binary(&mut self, id: &str) -> Result<VarRef, ProblemError> {
        self.add_variable(Variable::new_binary(id))
    }

    /// Add a new continuous variable
    pub fn add_continuous(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<VarRef, ProblemError> {
        self.add_variable(Variable::new_continuous(id, lower_bound, upper_bound))
    }

    /// Add a new integer variable
    pub fn add_integer(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<VarRef, ProblemError> {
        self.add_variable(Variable::new_integer(id, lower_bound, upper_bound))
    }
    // endregion Adding Variables

    // region Adding Constraints
    /// Add a constraint to the problem
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<(), ProblemError> {
        self.validate_constraint(&constraint)?;
        self.constraints
            .insert(constraint.get_id().to_string(), constraint);
        Ok(())
    }

    /// Add the row `Σ coefficients[i] * variables[i] == equals`
    pub fn add_new_equality_constraint(
        &mut self,
        id: &str,
        variables: &[VarRef],
        coefficients: &[f64],
        equals: f64,
    ) -> Result<(), ProblemError> {
        Self::check_term_lengths(id, variables.len(), coefficients.len())?;
        self.add_constraint(Constraint::new_equality(
            id,
            variables,
            coefficients,
            equals,
        ))
    }

    /// Same as [`Problem::add_new_equality_constraint`], looking variables up by id
    pub fn add_new_equality_constraint_by_id(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        equals: f64,
    ) -> Result<(), ProblemError> {
        let variables = self.refs_by_id(variables, ProblemError::NonExistentVariablesInConstraint)?;
        self.add_new_equality_constraint(id, &variables, coefficients, equals)
    }

    /// Add the row `lower_bound <= Σ coefficients[i] * variables[i] <= upper_bound`
    pub fn add_new_inequality_constraint(
        &mut self,
        id: &str,
        variables: &[VarRef],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        Self::check_term_lengths(id, variables.len(), coefficients.len())?;
        self.add_constraint(Constraint::new_inequality(
            id,
            variables,
            coefficients,
            lower_bound,
            upper_bound,
        ))
    }

    /// Same as [`Problem::add_new_inequality_constraint`], looking variables up by id
    pub fn add_new_inequality_constraint_by_id(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        let variables = self.refs_by_id(variables, ProblemError::NonExistentVariablesInConstraint)?;
        self.add_new_inequality_constraint(id, &variables, coefficients, lower_bound, upper_bound)
    }

    /// Add the constraint `expr == rhs`
    pub fn add_eq<E: Into<LinearExpr>>(
        &mut self,
        id: &str,
        expr: E,
        rhs: f64,
    ) -> Result<(), ProblemError> {
        self.add_constraint(Constraint::eq(id, expr.into(), rhs))
    }

    /// Add the constraint `expr <= rhs`
    pub fn add_le<E: Into<LinearExpr>>(
        &mut self,
        id: &str,
        expr: E,
        rhs: f64,
    ) -> Result<(), ProblemError> {
        self.add_constraint(Constraint::le(id, expr.into(), rhs))
    }

    /// Add the constraint `expr >= rhs`
    pub fn add_ge<E: Into<LinearExpr>>(
        &mut self,
        id: &str,
        expr: E,
        rhs: f64,
    ) -> Result<(), ProblemError> {
        self.add_constraint(Constraint::ge(id, expr.into(), rhs))
    }
    // endregion Adding Constraints

    // region Adding Objectives
    /// Replace every objective with a single objective using the problem's sense
    pub fn set_objective<E: Into<LinearExpr>>(&mut self, expr: E) -> Result<(), ProblemError> {
        self.objectives.clear();
        self.add_objective(Objective::from_expr(
            DEFAULT_OBJECTIVE_ID,
            self.sense,
            expr.into(),
        ))
    }

    /// Add an objective, objectives are solved in descending priority order
    pub fn add_objective(&mut self, objective: Objective) -> Result<(), ProblemError> {
        self.validate_objective(&objective)?;
        self.objectives.insert(objective.id.clone(), objective);
        Ok(())
    }

    /// Add a new linear term to the default objective, creating it if needed
    pub fn add_new_linear_objective_term(
        &mut self,
        variable: VarRef,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        if !self.owns(variable) {
            return Err(ProblemError::NonExistentVariablesInObjective);
        }
        let sense = self.sense;
        self.objectives
            .entry(DEFAULT_OBJECTIVE_ID.to_string())
            .or_insert_with(|| Objective::new(DEFAULT_OBJECTIVE_ID, sense))
            .add_linear_term(variable, coefficient);
        Ok(())
    }

    /// Add a new linear term to the default objective using the variable id
    pub fn add_new_linear_objective_term_by_id(
        &mut self,
        variable_id: &str,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        let variable = self
            .variable_ref(variable_id)
            .ok_or(ProblemError::NonExistentVariablesInObjective)?;
        self.add_new_linear_objective_term(variable, coefficient)
    }
    // endregion Adding Objectives

    // region Update Variable Bounds
    /// Update the bounds of a variable
    pub fn update_variable_bounds(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        if lower_bound > upper_bound {
            return Err(ProblemError::InvalidVariableBounds(id.to_string()));
        }
        match self.variables.get_mut(id) {
            Some(var) => {
                var.lower_bound = lower_bound;
                var.upper_bound = upper_bound;
            }
            None => return Err(ProblemError::NonExistentVariable(id.to_string())),
        };
        Ok(())
    }
    // endregion Update Variable Bounds

    // region Remove Constraints
    /// Drop the row with this id, returning it if present
    pub fn remove_constraint(&mut self, constraint_id: &str) -> Option<Constraint> {
        self.constraints.shift_remove(constraint_id)
    }
    // endregion Remove Constraints

    // region Remove Objective Terms
    /// Remove all objectives
    pub fn remove_all_objective_terms(&mut self) {
        self.objectives.clear();
    }
    // endregion Remove Objective Terms

    // region Validation Functions
    /// Check that a variable handle was issued by this problem
    fn owns(&self, var: VarRef) -> bool {
        var.problem == self.id && var.index < self.variables.len()
    }

    /// Reject duplicate ids and empty domains
    fn validate_variable(&self, variable: &Variable) -> Result<(), ProblemError> {
        // Unique id
        if self.variables.contains_key(&variable.id) {
            return Err(ProblemError::VariableIdAlreadyExists(variable.id.clone()));
        };
        // Non-empty domain
        if variable.lower_bound > variable.upper_bound {
            return Err(ProblemError::InvalidVariableBounds(variable.id.clone()));
        }
        Ok(())
    }

    /// Reject duplicate ids, foreign handles and empty ranges
    fn validate_constraint(&self, constraint: &Constraint) -> Result<(), ProblemError> {
        // Check that a constraint with the same id doesn't already exist
        if self.constraints.contains_key(constraint.get_id()) {
            return Err(ProblemError::ConstraintAlreadyExists(
                constraint.get_id().to_string(),
            ));
        }
        // Non-empty range
        let (lower_bound, upper_bound) = constraint.bounds();
        if lower_bound > upper_bound {
            return Err(ProblemError::InvalidConstraintBounds(
                constraint.get_id().to_string(),
            ));
        }
        // Handles must come from this problem
        if !constraint.get_variables().all(|var| self.owns(var)) {
            return Err(ProblemError::NonExistentVariablesInConstraint);
        }
        Ok(())
    }

    /// Check that an objective to be added is valid to add to this Problem
    fn validate_objective(&self, objective: &Objective) -> Result<(), ProblemError> {
        if self.objectives.contains_key(&objective.id) {
            return Err(ProblemError::ObjectiveAlreadyExists(objective.id.clone()));
        }
        if !objective.terms.iter().all(|term| self.owns(term.var)) {
            return Err(ProblemError::NonExistentVariablesInObjective);
        }
        Ok(())
    }

    fn check_term_lengths(id: &str, variables: usize, coefficients: usize) -> Result<(), ProblemError> {
        if variables != coefficients {
            return Err(ProblemError::MismatchedTerms(id.to_string()));
        }
        Ok(())
    }

    fn refs_by_id(&self, ids: &[&str], missing: ProblemError) -> Result<Vec<VarRef>, ProblemError> {
        ids.iter()
            .map(|id| self.variable_ref(id).ok_or_else(|| missing.clone()))
            .collect()
    }
    // endregion Validation Functions

    // region Check Problem
    pub fn has_integer_variables(&self) -> bool {
        self.variables.values().any(|var| var.is_integral())
    }

    /// Ids of the constraints and variable bounds violated by a solution
    ///
    /// Returns an empty vec when the solution holds no variable values.
    pub fn violations(&self, solution: &ProblemSolution, tolerance: f64) -> Vec<String> {
        let Some(values) = self.solution_vector(solution) else {
            return Vec::new();
        };
        let mut violated: Vec<String> = self
            .constraints
            .values()
            .filter(|cons| !cons.is_satisfied(&values, tolerance))
            .map(|cons| cons.get_id().to_string())
            .collect();
        violated.extend(
            self.variables
                .values()
                .zip(&values)
                .filter(|(var, value)| {
                    **value < var.lower_bound - tolerance || **value > var.upper_bound + tolerance
                })
                .map(|(var, _)| var.id.clone()),
        );
        violated
    }

    /// [`Problem::violations`] using the configured tolerance
    pub fn check(&self, solution: &ProblemSolution) -> Vec<String> {
        let tolerance = read_configuration().tolerance;
        self.violations(solution, tolerance)
    }

    /// Evaluate an expression at a solution
    pub fn evaluate(&self, expr: &LinearExpr, solution: &ProblemSolution) -> Option<f64> {
        self.solution_vector(solution)
            .map(|values| expr.evaluate(&values))
    }

    /// Variable values of a solution, in variable order
    fn solution_vector(&self, solution: &ProblemSolution) -> Option<Vec<f64>> {
        let values = solution.variable_values.as_ref()?;
        self.variables
            .keys()
            .map(|id| values.get(id).copied())
            .collect()
    }
    // endregion Check Problem

    // region Optimize
    /// Solve the problem with the solver selected in the global configuration
    pub fn optimize(&mut self) -> Result<ProblemSolution, ProblemError> {
        let kind = read_configuration().solver;
        self.optimize_with(kind)
    }

    /// Solve the problem with the given solver
    ///
    /// Objectives are grouped by priority, and the groups are solved from the highest
    /// priority down. After each group is solved its value is constrained to stay
    /// within the configured gap of its optimum. A status other than optimal stops the
    /// sequence and is returned as is.
    pub fn optimize_with(&mut self, kind: SolverKind) -> Result<ProblemSolution, ProblemError> {
        let (abs_gap, rel_gap) = {
            let config = read_configuration();
            (config.lexicographic_abs_gap, config.lexicographic_rel_gap)
        };
        let stages = self.objective_stages();
        debug!(
            variables = self.variables.len(),
            constraints = self.constraints.len(),
            stages = stages.len(),
            solver = %kind,
            "optimizing problem"
        );
        let mut stage_bounds: Vec<Constraint> = Vec::new();
        let mut result: Option<(OptimizationStatus, Vec<f64>)> = None;
        for (position, stage) in stages.iter().enumerate() {
            let mut solver = new_solver(kind)?;
            self.load(solver.as_mut(), &stage_bounds)?;
            for (var, coefficient) in stage.expr.simplified().terms() {
                solver.add_linear_objective_term(&self.variables[var.index].id, *coefficient)?;
            }
            solver.set_objective_sense(stage.sense);
            let outcome = solver.solve()?;
            let values = match (outcome.status, outcome.values) {
                (OptimizationStatus::Optimal | OptimizationStatus::AlmostOptimal, Some(values)) => {
                    values
                }
                (status, _) => {
                    warn!(stage = %stage.label, %status, "solve did not reach an optimum");
                    self.status = status;
                    return Ok(ProblemSolution::without_solution(status));
                }
            };
            let optimum = stage.expr.evaluate(&values);
            debug!(stage = %stage.label, optimum, status = %outcome.status, "stage solved");
            if position + 1 < stages.len() {
                let slack = abs_gap.max(rel_gap * optimum.abs());
                let id = format!("objective_bound[{}]", stage.label);
                stage_bounds.push(match stage.sense {
                    ObjectiveSense::Minimize => Constraint::le(&id, stage.expr.clone(), optimum + slack),
                    ObjectiveSense::Maximize => Constraint::ge(&id, stage.expr.clone(), optimum - slack),
                });
            }
            result = Some((outcome.status, values));
        }
        let (status, values) = match result {
            Some(result) => result,
            None => return Err(ProblemError::NothingToSolve),
        };
        let solution = self.build_solution(status, &values);
        let violated = self.check(&solution);
        if !violated.is_empty() {
            warn!(?violated, "solution violates the model beyond the configured tolerance");
        }
        info!(
            %status,
            objective = ?solution.objective_value,
            "problem optimized"
        );
        self.status = status;
        Ok(solution)
    }

    /// Group the objectives into lexicographic stages, highest priority first
    fn objective_stages(&self) -> Vec<ObjectiveStage> {
        if self.objectives.is_empty() {
            // Feasibility problem
            if self.variables.is_empty() {
                return Vec::new();
            }
            return vec![ObjectiveStage {
                label: "feasibility".to_string(),
                sense: self.sense,
                expr: LinearExpr::new(),
            }];
        }
        let mut priorities: Vec<i32> = self.objectives.values().map(|o| o.priority).collect();
        priorities.sort_unstable_by(|a, b| b.cmp(a));
        priorities.dedup();
        priorities
            .into_iter()
            .map(|priority| {
                let group: Vec<&Objective> = self
                    .objectives
                    .values()
                    .filter(|o| o.priority == priority)
                    .collect();
                let sense = group[0].sense;
                let expr = group
                    .iter()
                    .map(|o| {
                        let sign = o.sense.minimization_sign() * sense.minimization_sign();
                        o.to_expr() * (o.weight * sign)
                    })
                    .sum();
                let label = group
                    .iter()
                    .map(|o| o.id.as_str())
                    .collect::<Vec<_>>()
                    .join("+");
                ObjectiveStage { label, sense, expr }
            })
            .collect()
    }

    /// Pass the variables and constraints (plus any extra constraints) to a solver
    fn load(&self, solver: &mut dyn Solver, extra: &[Constraint]) -> Result<(), SolverError> {
        for var in self.variables.values() {
            match var.variable_type {
                VariableType::Continuous => {
                    solver.add_continuous_variable(&var.id, var.lower_bound, var.upper_bound)?
                }
                VariableType::Binary if var.lower_bound <= 0. && var.upper_bound >= 1. => {
                    solver.add_binary_variable(&var.id)?
                }
                VariableType::Binary => solver.add_integer_variable(
                    &var.id,
                    var.lower_bound.max(0.),
                    var.upper_bound.min(1.),
                )?,
                VariableType::Integer => {
                    solver.add_integer_variable(&var.id, var.lower_bound, var.upper_bound)?
                }
            }
        }
        for cons in self.constraints.values().chain(extra) {
            let ids = cons
                .get_terms()
                .iter()
                .map(|t| self.variables[t.variable.index].id.as_str())
                .collect::<Vec<_>>();
            let coefficients = cons
                .get_terms()
                .iter()
                .map(|t| t.coefficient)
                .collect::<Vec<_>>();
            match cons {
                Constraint::Equality { id, equals, .. } => {
                    solver.add_equality_constraint(id, &ids, &coefficients, *equals)?
                }
                Constraint::Inequality {
                    id,
                    lower_bound,
                    upper_bound,
                    ..
                } => solver.add_inequality_constraint(
                    id,
                    &ids,
                    &coefficients,
                    *lower_bound,
                    *upper_bound,
                )?,
            }
        }
        Ok(())
    }

    fn build_solution(&self, status: OptimizationStatus, values: &[f64]) -> ProblemSolution {
        let objective_values: IndexMap<String, f64> = self
            .objectives
            .values()
            .map(|o| (o.id.clone(), o.evaluate(values)))
            .collect();
        let objective_value = self
            .objectives
            .values()
            .max_by_key(|o| o.priority)
            .map(|o| o.evaluate(values));
        ProblemSolution {
            status,
            objective_value,
            objective_values,
            variable_values: Some(
                self.variables
                    .keys()
                    .cloned()
                    .zip(values.iter().copied())
                    .collect(),
            ),
        }
    }
    // endregion Optimize
}

/// One lexicographic stage: a blend of the objectives sharing a priority
struct ObjectiveStage {
    label: String,
    sense: ObjectiveSense,
    expr: LinearExpr,
}

/// Kind of model, tracked as variables are added
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProblemType {
    /// Only continuous variables (an LP)
    LinearContinuous,
    /// At least one binary or integer variable (a MIP)
    LinearMixedInteger,
}

/// Model construction errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    /// Variable id already taken
    #[error("Tried to add variable {0} with the same id as an existing variable")]
    VariableIdAlreadyExists(String),
    /// Variable lower bound above its upper bound
    #[error("Tried to give variable {0} a lower_bound > upper_bound")]
    InvalidVariableBounds(String),
    /// Constraint id already taken
    #[error("Tried to add constraint {0} with the same id as an existing constraint")]
    ConstraintAlreadyExists(String),
    /// Ranged row with lower bound above upper bound
    #[error("Tried to add inequality constraint {0} with lower_bound > upper_bound")]
    InvalidConstraintBounds(String),
    /// Row refers to a variable this problem does not own
    #[error("Tried to add a constraint with variables not in the model")]
    NonExistentVariablesInConstraint,
    /// Error when variables and coefficients have different lengths
    #[error("Constraint {0} has a different number of variables and coefficients")]
    MismatchedTerms(String),
    /// Error when trying to add an objective with the same id as an existing objective
    #[error("Tried to add objective {0} with the same id as an existing objective")]
    ObjectiveAlreadyExists(String),
    /// Objective term refers to a variable this problem does not own
    #[error("Tried adding an objective term with variables not in the model")]
    NonExistentVariablesInObjective,
    /// Error when trying to perform an update on a variable that doesn't exist
    #[error("Tried to access variable {0} which doesn't exist")]
    NonExistentVariable(String),
    /// Error when optimizing a problem without variables or objectives
    #[error("The problem has no variables or objectives to optimize")]
    NothingToSolve,
    /// Error raised by the solver
    #[error(transparent)]
    Solver(#[from] SolverError),
}
