//! Implements a solver interface for HiGHS
use ::highs::{HighsModelStatus, RowProblem, Sense};
use tracing::debug;

use crate::optimize::objective::ObjectiveSense;
use crate::optimize::solvers::{Solver, SolverError, SolverOutcome, StandardForm};
use crate::optimize::variable::VariableType;
use crate::optimize::OptimizationStatus;

#[derive(Debug, Clone, Default)]
pub struct HighsSolver {
    program: StandardForm,
}

impl HighsSolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Solver for HighsSolver {
    fn name(&self) -> &'static str {
        "highs"
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
        let mut problem = RowProblem::default();
        let cols = self
            .program
            .columns
            .iter()
            .map(|c| match c.variable_type {
                VariableType::Continuous => {
                    problem.add_column(c.objective, c.lower_bound..=c.upper_bound)
                }
                VariableType::Integer | VariableType::Binary => {
                    problem.add_integer_column(c.objective, c.lower_bound..=c.upper_bound)
                }
            })
            .collect::<Vec<_>>();
        for row in &self.program.rows {
            let factors = row
                .indices
                .iter()
                .zip(&row.coefficients)
                .map(|(i, c)| (cols[*i], *c))
                .collect::<Vec<_>>();
            problem.add_row(row.lower_bound..=row.upper_bound, &factors);
        }
        let sense = match self.program.sense {
            ObjectiveSense::Minimize => Sense::Minimise,
            ObjectiveSense::Maximize => Sense::Maximise,
        };
        debug!(
            columns = cols.len(),
            rows = self.program.rows.len(),
            "handing model to highs"
        );
        let mut model = problem.optimise(sense);
        model.set_option("output_flag", false);
        let solved = model.solve();
        let status = match solved.status() {
            HighsModelStatus::Optimal => OptimizationStatus::Optimal,
            HighsModelStatus::Infeasible => OptimizationStatus::Infeasible,
            HighsModelStatus::Unbounded => OptimizationStatus::Unbounded,
            HighsModelStatus::UnboundedOrInfeasible => OptimizationStatus::InfeasibleOrUnbounded,
            _ => OptimizationStatus::SolverHalted,
        };
        if status != OptimizationStatus::Optimal {
            return Ok(SolverOutcome::without_solution(status));
        }
        let values = solved.get_solution().columns().to_vec();
        let objective = self
            .program
            .columns
            .iter()
            .zip(&values)
            .map(|(c, v)| c.objective * v)
            .sum();
        Ok(SolverOutcome {
            status,
            objective_value: Some(objective),
            values: Some(values),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_mip() {
        // maximize x + 2y, x + y <= 4, y integer in [0, 3], x in [0, 2.5]
        let mut solver = HighsSolver::new();
        solver.add_continuous_variable("x", 0., 2.5).unwrap();
        solver.add_integer_variable("y", 0., 3.).unwrap();
        solver
            .add_inequality_constraint("cap", &["x", "y"], &[1., 1.], f64::NEG_INFINITY, 4.)
            .unwrap();
        solver.add_linear_objective_term("x", 1.).unwrap();
        solver.add_linear_objective_term("y", 2.).unwrap();
        solver.set_objective_sense(ObjectiveSense::Maximize);
        let outcome = solver.solve().unwrap();
        assert_eq!(outcome.status, OptimizationStatus::Optimal);
        let values = outcome.values.unwrap();
        assert!((values[0] - 1.).abs() < 1e-6);
        assert!((values[1] - 3.).abs() < 1e-6);
        assert!((outcome.objective_value.unwrap() - 7.).abs() < 1e-6);
    }

    #[test]
    fn binary_columns_stay_binary() {
        let mut solver = HighsSolver::new();
        solver.add_binary_variable("b").unwrap();
        solver
            .add_equality_constraint("impossible", &["b"], &[2.], 1.)
            .unwrap();
        let outcome = solver.solve().unwrap();
        assert_eq!(outcome.status, OptimizationStatus::Infeasible);
        assert!(outcome.values.is_none());
    }
}
