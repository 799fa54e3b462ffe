//! Linear expressions over problem variables
use std::fmt::{Display, Formatter};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use indexmap::IndexMap;

use crate::optimize::variable::VarRef;

/// A linear expression `Σ coefficient * variable + constant`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    pub(crate) terms: Vec<(VarRef, f64)>,
    pub(crate) constant: f64,
}

impl LinearExpr {
    /// Create an empty expression, equal to zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an expression holding only a constant
    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// Create an expression from variables and matching coefficients
    pub fn from_terms(variables: &[VarRef], coefficients: &[f64]) -> Self {
        Self {
            terms: variables
                .iter()
                .copied()
                .zip(coefficients.iter().copied())
                .collect(),
            constant: 0.,
        }
    }

    /// Sum of variables, each with coefficient 1
    pub fn sum_of<I: IntoIterator<Item = VarRef>>(variables: I) -> Self {
        Self {
            terms: variables.into_iter().map(|v| (v, 1.)).collect(),
            constant: 0.,
        }
    }

    /// Add `coefficient * variable` to the expression
    pub fn add_term(&mut self, variable: VarRef, coefficient: f64) {
        self.terms.push((variable, coefficient));
    }

    /// Terms of the expression, a variable may appear more than once
    pub fn terms(&self) -> &[(VarRef, f64)] {
        &self.terms
    }

    /// Constant part of the expression
    pub fn constant_value(&self) -> f64 {
        self.constant
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Merge repeated variables and drop zero coefficients
    pub fn simplified(&self) -> LinearExpr {
        let mut merged: IndexMap<VarRef, f64> = IndexMap::new();
        for (var, coef) in &self.terms {
            *merged.entry(*var).or_insert(0.) += coef;
        }
        LinearExpr {
            terms: merged.into_iter().filter(|(_, c)| *c != 0.).collect(),
            constant: self.constant,
        }
    }

    /// Evaluate the expression given a value for every variable, indexed by
    /// [`VarRef::index`]
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coef)| coef * values[var.index])
            .sum::<f64>()
            + self.constant
    }
}

impl From<VarRef> for LinearExpr {
    fn from(var: VarRef) -> Self {
        LinearExpr {
            terms: vec![(var, 1.)],
            constant: 0.,
        }
    }
}

impl From<f64> for LinearExpr {
    fn from(value: f64) -> Self {
        LinearExpr::constant(value)
    }
}

impl<T: Into<LinearExpr>> Add<T> for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: T) -> Self::Output {
        self += rhs;
        self
    }
}

impl<T: Into<LinearExpr>> AddAssign<T> for LinearExpr {
    fn add_assign(&mut self, rhs: T) {
        let rhs = rhs.into();
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
    }
}

impl<T: Into<LinearExpr>> Sub<T> for LinearExpr {
    type Output = LinearExpr;

    fn sub(self, rhs: T) -> Self::Output {
        self + (-rhs.into())
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> Self::Output {
        self * -1.
    }
}

impl Mul<f64> for LinearExpr {
    type Output = LinearExpr;

    fn mul(self, rhs: f64) -> Self::Output {
        LinearExpr {
            terms: self.terms.into_iter().map(|(v, c)| (v, c * rhs)).collect(),
            constant: self.constant * rhs,
        }
    }
}

impl Mul<VarRef> for f64 {
    type Output = LinearExpr;

    fn mul(self, rhs: VarRef) -> Self::Output {
        LinearExpr {
            terms: vec![(rhs, self)],
            constant: 0.,
        }
    }
}

impl Mul<f64> for VarRef {
    type Output = LinearExpr;

    fn mul(self, rhs: f64) -> Self::Output {
        rhs * self
    }
}

impl Mul<LinearExpr> for f64 {
    type Output = LinearExpr;

    fn mul(self, rhs: LinearExpr) -> Self::Output {
        rhs * self
    }
}

impl<T: Into<LinearExpr>> Add<T> for VarRef {
    type Output = LinearExpr;

    fn add(self, rhs: T) -> Self::Output {
        LinearExpr::from(self) + rhs
    }
}

impl<T: Into<LinearExpr>> Sub<T> for VarRef {
    type Output = LinearExpr;

    fn sub(self, rhs: T) -> Self::Output {
        LinearExpr::from(self) - rhs
    }
}

impl Sum for LinearExpr {
    fn sum<I: Iterator<Item = LinearExpr>>(iter: I) -> Self {
        iter.fold(LinearExpr::new(), |acc, e| acc + e)
    }
}

impl Sum<VarRef> for LinearExpr {
    fn sum<I: Iterator<Item = VarRef>>(iter: I) -> Self {
        LinearExpr::sum_of(iter)
    }
}

impl Display for LinearExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut parts: Vec<String> = self
            .terms
            .iter()
            .map(|(v, c)| format!("{}*x{}", c, v.index))
            .collect();
        if self.constant != 0. || parts.is_empty() {
            parts.push(format!("{}", self.constant));
        }
        write!(f, "{}", parts.join(" + "))
    }
}
