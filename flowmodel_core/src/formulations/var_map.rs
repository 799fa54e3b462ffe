//! Collections of variables keyed by tuples of entity names
use std::hash::Hash;

use indexmap::IndexMap;

use crate::optimize::expression::LinearExpr;
use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::variable::{VarRef, Variable};
use crate::optimize::ProblemSolution;

/// Variables indexed by a key, in insertion order
///
/// Partial-key selection ("every flow leaving `i`") is done with a predicate over the key,
/// see [`VarMap::select`] and [`VarMap::sum_where`].
#[derive(Debug, Clone)]
pub struct VarMap<K> {
    vars: IndexMap<K, VarRef>,
}

impl<K> Default for VarMap<K> {
    fn default() -> Self {
        Self {
            vars: IndexMap::new(),
        }
    }
}

impl<K: Hash + Eq> VarMap<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `variable` to the problem and record its handle under `key`
    pub fn add(
        &mut self,
        problem: &mut Problem,
        key: K,
        variable: Variable,
    ) -> Result<VarRef, ProblemError> {
        let var = problem.add_variable(variable)?;
        self.vars.insert(key, var);
        Ok(var)
    }

    pub fn get(&self, key: &K) -> Option<VarRef> {
        self.vars.get(key).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.vars.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, VarRef)> {
        self.vars.iter().map(|(k, v)| (k, *v))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Entries whose key matches `predicate`
    pub fn select<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = (&'a K, VarRef)> + 'a
    where
        P: Fn(&K) -> bool + 'a,
    {
        self.vars
            .iter()
            .filter(move |(k, _)| predicate(k))
            .map(|(k, v)| (k, *v))
    }

    /// Sum of the variables whose key matches `predicate`
    pub fn sum_where<P: Fn(&K) -> bool>(&self, predicate: P) -> LinearExpr {
        self.vars
            .iter()
            .filter(|(k, _)| predicate(k))
            .map(|(_, v)| *v)
            .sum()
    }

    /// Sum of every variable
    pub fn sum(&self) -> LinearExpr {
        self.vars.values().copied().sum()
    }

    /// `Σ coefficient(key) * var[key]` over every entry
    pub fn prod<F: Fn(&K) -> f64>(&self, coefficient: F) -> LinearExpr {
        let mut expr = LinearExpr::new();
        for (key, var) in &self.vars {
            expr.add_term(*var, coefficient(key));
        }
        expr
    }

    /// Solution value of every entry, in insertion order
    ///
    /// Returns None when the solution holds no variable values.
    pub fn values<'a>(&'a self, solution: &ProblemSolution) -> Option<Vec<(&'a K, f64)>> {
        self.vars
            .iter()
            .map(|(k, v)| solution.var_value(*v).map(|value| (k, value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lanes() -> (Problem, VarMap<(String, String)>) {
        let mut problem = Problem::new_minimization();
        let mut flows = VarMap::new();
        for (o, d) in [("a", "x"), ("a", "y"), ("b", "x")] {
            let id = format!("flow[{},{}]", o, d);
            flows
                .add(
                    &mut problem,
                    (o.to_string(), d.to_string()),
                    Variable::new_continuous(&id, 0., 10.),
                )
                .unwrap();
        }
        (problem, flows)
    }

    #[test]
    fn select_partial_key() {
        let (_, flows) = lanes();
        let from_a: Vec<_> = flows.select(|(o, _)| o == "a").map(|(k, _)| k.1.clone()).collect();
        assert_eq!(from_a, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(flows.sum_where(|(_, d)| d == "x").terms().len(), 2);
        assert_eq!(flows.sum().terms().len(), 3);
    }

    #[test]
    fn prod_uses_key_coefficients() {
        let (_, flows) = lanes();
        let expr = flows.prod(|(o, _)| if o == "a" { 2. } else { 5. });
        assert!((expr.evaluate(&[1., 1., 1.]) - 9.).abs() < 1e-12);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let (mut problem, mut flows) = lanes();
        let res = flows.add(
            &mut problem,
            ("c".to_string(), "x".to_string()),
            Variable::new_continuous("flow[a,x]", 0., 1.),
        );
        assert_eq!(
            res,
            Err(ProblemError::VariableIdAlreadyExists("flow[a,x]".to_string()))
        );
        assert_eq!(flows.len(), 3);
    }
}
