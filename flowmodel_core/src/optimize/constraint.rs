//! Linear rows of a model
use std::fmt::{Display, Formatter};

use crate::optimize::expression::LinearExpr;
use crate::optimize::variable::VarRef;

/// A named linear row, either fixed to a value or kept within a range
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// `Σ terms == equals`
    Equality {
        id: String,
        terms: Vec<ConstraintTerm>,
        equals: f64,
    },
    /// `lower_bound <= Σ terms <= upper_bound`, either side may be infinite
    Inequality {
        id: String,
        terms: Vec<ConstraintTerm>,
        lower_bound: f64,
        upper_bound: f64,
    },
}

impl Constraint {
    /// Row `Σ coefficients[i] * variables[i] == equals`
    ///
    /// Extra entries in the longer of the two slices are ignored.
    ///
    /// ```rust
    /// use flowmodel_core::optimize::constraint::Constraint;
    /// use flowmodel_core::optimize::problem::Problem;
    /// let mut problem = Problem::new_minimization();
    /// let x = problem.add_continuous("x", 0., 20.).unwrap();
    /// let y = problem.add_continuous("y", 3., 7.).unwrap();
    /// // 3x + 2y = 6
    /// problem
    ///     .add_constraint(Constraint::new_equality("c", &[x, y], &[3.0, 2.0], 6.))
    ///     .unwrap();
    /// ```
    pub fn new_equality(id: &str, variables: &[VarRef], coefficients: &[f64], equals: f64) -> Self {
        Constraint::Equality {
            id: id.to_string(),
            terms: Constraint::zip_into_terms(variables, coefficients),
            equals,
        }
    }

    /// Row `lower_bound <= Σ coefficients[i] * variables[i] <= upper_bound`
    pub fn new_inequality(
        id: &str,
        variables: &[VarRef],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Self {
        Constraint::Inequality {
            id: id.to_string(),
            terms: Constraint::zip_into_terms(variables, coefficients),
            lower_bound,
            upper_bound,
        }
    }

    /// Create the constraint `expr == rhs`, moving the constant of `expr` to the right hand side
    pub fn eq(id: &str, expr: LinearExpr, rhs: f64) -> Self {
        let expr = expr.simplified();
        Constraint::Equality {
            id: id.to_string(),
            equals: rhs - expr.constant,
            terms: Constraint::expr_into_terms(expr),
        }
    }

    /// Create the constraint `expr <= rhs`
    pub fn le(id: &str, expr: LinearExpr, rhs: f64) -> Self {
        let expr = expr.simplified();
        Constraint::Inequality {
            id: id.to_string(),
            lower_bound: f64::NEG_INFINITY,
            upper_bound: rhs - expr.constant,
            terms: Constraint::expr_into_terms(expr),
        }
    }

    /// Create the constraint `expr >= rhs`
    pub fn ge(id: &str, expr: LinearExpr, rhs: f64) -> Self {
        let expr = expr.simplified();
        Constraint::Inequality {
            id: id.to_string(),
            lower_bound: rhs - expr.constant,
            upper_bound: f64::INFINITY,
            terms: Constraint::expr_into_terms(expr),
        }
    }

    /// Get the id of the constraint
    pub fn get_id(&self) -> &str {
        match self {
            Constraint::Equality { id, .. } | Constraint::Inequality { id, .. } => id,
        }
    }

    /// Get the terms of the constraint
    pub fn get_terms(&self) -> &[ConstraintTerm] {
        match self {
            Constraint::Equality { terms, .. } | Constraint::Inequality { terms, .. } => terms,
        }
    }

    /// Get the variables referenced by this constraint
    pub fn get_variables(&self) -> impl Iterator<Item = VarRef> + '_ {
        self.get_terms().iter().map(|t| t.variable)
    }

    /// Range `(lower, upper)` the sum of the terms must lie in
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            Constraint::Equality { equals, .. } => (*equals, *equals),
            Constraint::Inequality {
                lower_bound,
                upper_bound,
                ..
            } => (*lower_bound, *upper_bound),
        }
    }

    /// Whether the constraint holds, within `tolerance`, for the given variable values
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let activity: f64 = self
            .get_terms()
            .iter()
            .map(|t| t.coefficient * values[t.variable.index])
            .sum();
        let (lower, upper) = self.bounds();
        activity >= lower - tolerance && activity <= upper + tolerance
    }

    fn zip_into_terms(variables: &[VarRef], coefficients: &[f64]) -> Vec<ConstraintTerm> {
        variables
            .iter()
            .zip(coefficients)
            .map(|(var, coef)| ConstraintTerm {
                variable: *var,
                coefficient: *coef,
            })
            .collect()
    }

    fn expr_into_terms(expr: LinearExpr) -> Vec<ConstraintTerm> {
        expr.terms
            .into_iter()
            .map(|(variable, coefficient)| ConstraintTerm {
                variable,
                coefficient,
            })
            .collect()
    }

    fn format_terms(terms: &[ConstraintTerm]) -> String {
        if terms.is_empty() {
            return "0".to_string();
        }
        terms
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

impl Display for Constraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Constraint::Equality { id, terms, equals } => {
                write!(f, "{id}: {} = {equals}", Self::format_terms(terms))
            }
            Constraint::Inequality {
                id,
                terms,
                lower_bound,
                upper_bound,
            } => write!(
                f,
                "{id}: {lower_bound} <= {} <= {upper_bound}",
                Self::format_terms(terms)
            ),
        }
    }
}

/// `coefficient * variable`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintTerm {
    pub variable: VarRef,
    pub coefficient: f64,
}

impl Display for ConstraintTerm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}*x{}", self.coefficient, self.variable.index)
    }
}
