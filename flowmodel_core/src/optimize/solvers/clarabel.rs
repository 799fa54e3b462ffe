//! Implements a solver interface for Clarabel
//!
//! The model is written in Clarabel's conic form `A x + s = b`, `s ∈ K`, with
//! equality rows in a zero cone followed by one-sided rows in a nonnegative cone.
//! Variable bounds become rows as well.
use std::collections::BTreeMap;

use ::clarabel::algebra::CscMatrix;
use ::clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};
use tracing::debug;

use crate::optimize::solvers::{Solver, SolverError, SolverOutcome, StandardForm};
use crate::optimize::OptimizationStatus;

/// Interior point solver for continuous problems
#[derive(Debug, Clone, Default)]
pub struct ClarabelSolver {
    program: StandardForm,
}

impl ClarabelSolver {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Rows of the conic constraint matrix, accumulated before conversion to CSC
#[derive(Default)]
struct ConicRows {
    /// (column, row) -> value
    entries: BTreeMap<(usize, usize), f64>,
    rhs: Vec<f64>,
}

impl ConicRows {
    fn push(&mut self, terms: impl Iterator<Item = (usize, f64)>, rhs: f64) {
        let row = self.rhs.len();
        for (column, value) in terms {
            *self.entries.entry((column, row)).or_insert(0.) += value;
        }
        self.rhs.push(rhs);
    }

    fn len(&self) -> usize {
        self.rhs.len()
    }
}

impl Solver for ClarabelSolver {
    fn name(&self) -> &'static str {
        "clarabel"
    }

    fn integer_variable_capable(&self) -> bool {
        false
    }

    fn program(&self) -> &StandardForm {
        &self.program
    }

    fn program_mut(&mut self) -> &mut StandardForm {
        &mut self.program
    }

    fn solve(&mut self) -> Result<SolverOutcome, SolverError> {
        let n = self.program.columns.len();
        let sign = self.program.sense.minimization_sign();
        let q: Vec<f64> = self
            .program
            .columns
            .iter()
            .map(|c| sign * c.objective)
            .collect();

        let mut zero = ConicRows::default();
        let mut nonneg = ConicRows::default();
        for row in &self.program.rows {
            let terms = || row.indices.iter().copied().zip(row.coefficients.iter().copied());
            if row.is_equality() {
                zero.push(terms(), row.upper_bound);
                continue;
            }
            if row.upper_bound.is_finite() {
                nonneg.push(terms(), row.upper_bound);
            }
            if row.lower_bound.is_finite() {
                nonneg.push(terms().map(|(i, c)| (i, -c)), -row.lower_bound);
            }
        }
        for (index, column) in self.program.columns.iter().enumerate() {
            if column.lower_bound == column.upper_bound {
                zero.push(std::iter::once((index, 1.)), column.upper_bound);
                continue;
            }
            if column.upper_bound.is_finite() {
                nonneg.push(std::iter::once((index, 1.)), column.upper_bound);
            }
            if column.lower_bound.is_finite() {
                nonneg.push(std::iter::once((index, -1.)), -column.lower_bound);
            }
        }

        let (a, b, cones) = assemble(n, zero, nonneg);
        let p = CscMatrix::new(n, n, vec![0; n + 1], Vec::new(), Vec::new());
        let settings = DefaultSettingsBuilder::default()
            .verbose(false)
            .build()
            .map_err(|e| SolverError::Settings(e.to_string()))?;
        debug!(columns = n, rows = b.len(), "handing model to clarabel");
        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings);
        solver.solve();

        let status = match solver.solution.status {
            SolverStatus::Solved => OptimizationStatus::Optimal,
            SolverStatus::AlmostSolved => OptimizationStatus::AlmostOptimal,
            SolverStatus::PrimalInfeasible => OptimizationStatus::Infeasible,
            SolverStatus::DualInfeasible => OptimizationStatus::Unbounded,
            SolverStatus::NumericalError => OptimizationStatus::NumericalError,
            _ => OptimizationStatus::SolverHalted,
        };
        match status {
            OptimizationStatus::Optimal | OptimizationStatus::AlmostOptimal => Ok(SolverOutcome {
                status,
                objective_value: Some(sign * solver.solution.obj_val),
                values: Some(solver.solution.x.clone()),
            }),
            _ => Ok(SolverOutcome::without_solution(status)),
        }
    }
}

/// Stack the zero cone rows above the nonnegative cone rows and convert to CSC
fn assemble(
    n: usize,
    zero: ConicRows,
    nonneg: ConicRows,
) -> (CscMatrix<f64>, Vec<f64>, Vec<SupportedConeT<f64>>) {
    let offset = zero.len();
    let m = zero.len() + nonneg.len();
    let mut entries = zero.entries;
    entries.extend(
        nonneg
            .entries
            .into_iter()
            .map(|((column, row), value)| ((column, row + offset), value)),
    );
    let mut colptr = vec![0usize; n + 1];
    let mut rowval = Vec::with_capacity(entries.len());
    let mut nzval = Vec::with_capacity(entries.len());
    // BTreeMap iterates in (column, row) order, which is CSC order
    for ((column, row), value) in entries {
        colptr[column + 1] += 1;
        rowval.push(row);
        nzval.push(value);
    }
    for column in 0..n {
        colptr[column + 1] += colptr[column];
    }
    let mut cones = Vec::new();
    if offset > 0 {
        cones.push(SupportedConeT::ZeroConeT(offset));
    }
    if m > offset {
        cones.push(SupportedConeT::NonnegativeConeT(m - offset));
    }
    let mut b = zero.rhs;
    b.extend(nonneg.rhs);
    (CscMatrix::new(m, n, colptr, rowval, nzval), b, cones)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::objective::ObjectiveSense;

    #[test]
    fn small_lp() {
        // maximize x + 2y, x + y <= 4, 2x + y >= 2, x >= 0, 0 <= y <= 3
        let mut solver = ClarabelSolver::new();
        solver
            .add_continuous_variable("x", 0., f64::INFINITY)
            .unwrap();
        solver.add_continuous_variable("y", 0., 3.).unwrap();
        solver
            .add_inequality_constraint("a", &["x", "y"], &[1., 1.], f64::NEG_INFINITY, 4.)
            .unwrap();
        solver
            .add_inequality_constraint("b", &["x", "y"], &[2., 1.], 2., f64::INFINITY)
            .unwrap();
        solver.add_linear_objective_term("x", 1.).unwrap();
        solver.add_linear_objective_term("y", 2.).unwrap();
        solver.set_objective_sense(ObjectiveSense::Maximize);
        let outcome = solver.solve().unwrap();
        assert_eq!(outcome.status, OptimizationStatus::Optimal);
        let values = outcome.values.unwrap();
        assert!((values[0] - 1.).abs() < 1e-5);
        assert!((values[1] - 3.).abs() < 1e-5);
        assert!((outcome.objective_value.unwrap() - 7.).abs() < 1e-5);
    }

    #[test]
    fn infeasible_lp() {
        let mut solver = ClarabelSolver::new();
        solver.add_continuous_variable("x", 0., 1.).unwrap();
        solver
            .add_inequality_constraint("too_much", &["x"], &[1.], 2., f64::INFINITY)
            .unwrap();
        solver.add_linear_objective_term("x", 1.).unwrap();
        let outcome = solver.solve().unwrap();
        assert_eq!(outcome.status, OptimizationStatus::Infeasible);
    }
}
