//! Implements a solver interface for microlp
use ::microlp::{ComparisonOp, LinearExpr, OptimizationDirection};
use tracing::debug;

use crate::optimize::objective::ObjectiveSense;
use crate::optimize::solvers::{Row, Solver, SolverError, SolverOutcome, StandardForm};
use crate::optimize::variable::VariableType;
use crate::optimize::OptimizationStatus;

/// Pure rust LP solver with branch and bound for integer variables
#[derive(Debug, Clone, Default)]
pub struct MicrolpSolver {
    program: StandardForm,
}

impl MicrolpSolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Solver for MicrolpSolver {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn integer_variable_capable(&self) -> bool {
        true
    }

    fn program(&self) -> &StandardForm {
        &self.program
    }

    fn program_mut(&mut self) -> &mut StandardForm {
        &mut self.program
    }

    fn solve(&mut self) -> Result<SolverOutcome, SolverError> {
        let direction = match self.program.sense {
            ObjectiveSense::Minimize => OptimizationDirection::Minimize,
            ObjectiveSense::Maximize => OptimizationDirection::Maximize,
        };
        let mut problem = ::microlp::Problem::new(direction);
        let vars = self
            .program
            .columns
            .iter()
            .map(|c| {
                Ok(match c.variable_type {
                    VariableType::Continuous => {
                        problem.add_var(c.objective, (c.lower_bound, c.upper_bound))
                    }
                    VariableType::Binary => problem.add_binary_var(c.objective),
                    VariableType::Integer => problem.add_integer_var(
                        c.objective,
                        (
                            integer_bound(&c.id, c.lower_bound.ceil())?,
                            integer_bound(&c.id, c.upper_bound.floor())?,
                        ),
                    ),
                })
            })
            .collect::<Result<Vec<_>, SolverError>>()?;
        for row in &self.program.rows {
            if row.is_equality() {
                problem.add_constraint(row_expr(row, &vars), ComparisonOp::Eq, row.lower_bound);
                continue;
            }
            if row.lower_bound.is_finite() {
                problem.add_constraint(row_expr(row, &vars), ComparisonOp::Ge, row.lower_bound);
            }
            if row.upper_bound.is_finite() {
                problem.add_constraint(row_expr(row, &vars), ComparisonOp::Le, row.upper_bound);
            }
        }
        debug!(
            columns = vars.len(),
            rows = self.program.rows.len(),
            "handing model to microlp"
        );
        match problem.solve() {
            Ok(solution) => Ok(SolverOutcome {
                status: OptimizationStatus::Optimal,
                objective_value: Some(solution.objective()),
                values: Some(vars.iter().map(|v| solution.var_value_rounded(*v)).collect()),
            }),
            Err(::microlp::Error::Infeasible) => Ok(SolverOutcome::without_solution(
                OptimizationStatus::Infeasible,
            )),
            Err(::microlp::Error::Unbounded) => Ok(SolverOutcome::without_solution(
                OptimizationStatus::Unbounded,
            )),
            Err(::microlp::Error::InternalError(msg)) => Err(SolverError::Internal(msg)),
        }
    }
}

/// microlp takes integer bounds as `i32`. Infinite bounds saturate to
/// `i32::MIN`/`i32::MAX`, finite bounds outside that range are rejected.
fn integer_bound(id: &str, bound: f64) -> Result<i32, SolverError> {
    if bound.is_infinite() {
        return Ok(if bound > 0. { i32::MAX } else { i32::MIN });
    }
    if bound < i32::MIN as f64 || bound > i32::MAX as f64 {
        return Err(SolverError::Settings(format!(
            "bound {bound} of integer variable {id} is outside the range microlp supports"
        )));
    }
    Ok(bound as i32)
}

fn row_expr(row: &Row, vars: &[::microlp::Variable]) -> LinearExpr {
    let mut expr = LinearExpr::empty();
    for (index, coefficient) in row.indices.iter().zip(&row.coefficients) {
        expr.add(vars[*index], *coefficient);
    }
    expr
}
