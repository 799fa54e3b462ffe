//! Provides struct for representing an optimization problem's objectives
use serde::{Deserialize, Serialize};

use crate::optimize::expression::LinearExpr;
use crate::optimize::variable::VarRef;

/// Represents one objective of an optimization problem
///
/// A problem may hold several objectives. Objectives with a higher `priority`
/// are optimized first, objectives sharing a priority are blended using their
/// `weight`.
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    /// Identifier of the objective
    pub(crate) id: String,
    /// Terms included in the objective (See [`ObjectiveTerm`])
    pub(crate) terms: Vec<ObjectiveTerm>,
    /// Constant offset
    pub(crate) constant: f64,
    /// Sense of the objective (maximize, or minimize), see [`ObjectiveSense`]
    pub(crate) sense: ObjectiveSense,
    /// Lexicographic priority, higher is solved first
    pub(crate) priority: i32,
    /// Weight used when blending objectives of the same priority
    pub(crate) weight: f64,
}

impl Objective {
    /// Create a new empty objective, with a given sense
    pub fn new(id: &str, sense: ObjectiveSense) -> Self {
        Self {
            id: id.to_string(),
            terms: Vec::new(),
            constant: 0.,
            sense,
            priority: 0,
            weight: 1.,
        }
    }

    /// Create a new empty maximization objective
    pub fn new_maximize(id: &str) -> Self {
        Self::new(id, ObjectiveSense::Maximize)
    }

    /// Create a new empty minimization objective
    pub fn new_minimize(id: &str) -> Self {
        Self::new(id, ObjectiveSense::Minimize)
    }

    /// Create an objective from a linear expression
    pub fn from_expr(id: &str, sense: ObjectiveSense, expr: LinearExpr) -> Self {
        let mut objective = Self::new(id, sense);
        objective.add_expr(expr);
        objective
    }

    /// Set the lexicographic priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the blending weight
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn terms(&self) -> &[ObjectiveTerm] {
        &self.terms
    }

    /// Change the sense of the objective
    pub fn set_sense(&mut self, sense: ObjectiveSense) {
        self.sense = sense;
    }

    /// Add a new term to the objective
    pub fn add_term(&mut self, term: ObjectiveTerm) {
        self.terms.push(term);
    }

    /// Add a new Linear term to the objective
    pub fn add_linear_term(&mut self, variable: VarRef, coefficient: f64) {
        self.terms.push(ObjectiveTerm::new(variable, coefficient));
    }

    /// Add a series of linear terms to the objective function
    pub fn add_linear_terms(&mut self, variables: &[VarRef], coefficients: &[f64]) {
        self.terms.extend(
            variables
                .iter()
                .zip(coefficients)
                .map(|(var, coef)| ObjectiveTerm::new(*var, *coef)),
        );
    }

    /// Add every term of a linear expression, and its constant
    pub fn add_expr(&mut self, expr: LinearExpr) {
        self.constant += expr.constant;
        self.terms.extend(
            expr.terms
                .into_iter()
                .map(|(var, coef)| ObjectiveTerm::new(var, coef)),
        );
    }

    /// Remove all terms, and the constant, from the objective
    pub fn remove_all_terms(&mut self) {
        self.terms.clear();
        self.constant = 0.;
    }

    /// The objective as a linear expression
    pub fn to_expr(&self) -> LinearExpr {
        LinearExpr {
            terms: self.terms.iter().map(|t| (t.var, t.coef)).collect(),
            constant: self.constant,
        }
    }

    /// Value of the objective for the given variable values
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|t| t.coef * values[t.var.index])
            .sum::<f64>()
            + self.constant
    }
}

/// Represents the sense of the objective, whether it should be maximized or minimized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveSense {
    /// The objective should be minimized
    Minimize,
    /// The objective should be maximized
    Maximize,
}

impl ObjectiveSense {
    /// Sign which turns this sense into minimization
    pub(crate) fn minimization_sign(&self) -> f64 {
        match self {
            ObjectiveSense::Minimize => 1.,
            ObjectiveSense::Maximize => -1.,
        }
    }
}

/// A linear term in the objective
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectiveTerm {
    /// Variable in objective term
    pub var: VarRef,
    /// Coefficient for linear term
    pub coef: f64,
}

impl ObjectiveTerm {
    /// Create a new linear objective term
    pub fn new(var: VarRef, coef: f64) -> Self {
        ObjectiveTerm { var, coef }
    }
}
