//! Capacitated fixed-charge network flow
//!
//! Every non-sink node produces a fixed amount that must reach the sink. Using an edge costs
//! its fixed charge, and an edge may only carry flow (up to its capacity) if it is installed.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::configuration::read_configuration;
use crate::formulations::{FormulationError, VarMap};
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::SolverKind;
use crate::optimize::variable::Variable;
use crate::optimize::OptimizationStatus;

/// An edge that may be installed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEdge {
    pub from: String,
    pub to: String,
    /// Cost paid if the edge is installed
    pub fixed_cost: f64,
    /// Maximum flow over the edge once installed
    pub capacity: f64,
    /// Excluded edges can never be installed
    #[serde(default)]
    pub excluded: bool,
}

/// A fixed-charge network flow instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedChargeNetwork {
    /// Production of every node, the sink included (its production is ignored)
    pub nodes: IndexMap<String, f64>,
    /// Node collecting all production
    pub sink: String,
    pub edges: Vec<CandidateEdge>,
    /// Pairs of edges (by index into `edges`) that may not both be installed
    #[serde(default)]
    pub conflicts: Vec<(usize, usize)>,
    /// Require exactly one installed outgoing edge per non-sink node
    #[serde(default)]
    pub single_outlet: bool,
}

/// The optimization model of a network, before solving
#[derive(Debug, Clone)]
pub struct NetworkModel {
    pub problem: Problem,
    /// `install[from, to]`, binary
    pub install: VarMap<(String, String)>,
    /// `flow[from, to]`, continuous in `[0, capacity]`
    pub flow: VarMap<(String, String)>,
}

/// An installed edge of a solved network
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstalledEdge {
    pub from: String,
    pub to: String,
    pub flow: f64,
    pub fixed_cost: f64,
}

/// Result of solving a network
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkPlan {
    pub status: OptimizationStatus,
    pub installed: Vec<InstalledEdge>,
    pub total_cost: Option<f64>,
}

impl FixedChargeNetwork {
    fn check_nodes(&self) -> Result<(), FormulationError> {
        if !self.nodes.contains_key(&self.sink) {
            return Err(FormulationError::UnknownNode(self.sink.clone()));
        }
        for edge in &self.edges {
            for end in [&edge.from, &edge.to] {
                if !self.nodes.contains_key(end) {
                    return Err(FormulationError::UnknownNode(end.clone()));
                }
            }
            if edge.capacity < 0. {
                return Err(FormulationError::InvalidValue {
                    field: format!("capacity[{},{}]", edge.from, edge.to),
                    value: edge.capacity,
                });
            }
        }
        for (a, b) in &self.conflicts {
            for index in [a, b] {
                if *index >= self.edges.len() {
                    return Err(FormulationError::UnknownNode(format!("edge #{}", index)));
                }
            }
        }
        Ok(())
    }

    /// Build the optimization model
    pub fn build(&self) -> Result<NetworkModel, FormulationError> {
        self.check_nodes()?;
        let mut problem = Problem::new(ObjectiveSense::Minimize);
        let mut install = VarMap::new();
        let mut flow = VarMap::new();
        for edge in &self.edges {
            let key = (edge.from.clone(), edge.to.clone());
            install.add(
                &mut problem,
                key.clone(),
                Variable::new_binary(&format!("install[{},{}]", edge.from, edge.to)),
            )?;
            flow.add(
                &mut problem,
                key,
                Variable::new_continuous(
                    &format!("flow[{},{}]", edge.from, edge.to),
                    0.,
                    edge.capacity,
                ),
            )?;
        }

        let producers = self
            .nodes
            .iter()
            .filter(|(name, _)| **name != self.sink)
            .collect::<Vec<_>>();
        if self.single_outlet {
            for (name, _) in &producers {
                problem.add_eq(
                    &format!("connected[{}]", name),
                    install.sum_where(|(from, _)| from == *name),
                    1.,
                )?;
            }
        }
        for (name, production) in &producers {
            let outflow = flow.sum_where(|(from, _)| from == *name);
            let inflow = flow.sum_where(|(_, to)| to == *name);
            problem.add_eq(&format!("flow[{}]", name), outflow - inflow, **production)?;
        }

        for edge in &self.edges {
            let key = (edge.from.clone(), edge.to.clone());
            let (Some(x), Some(f)) = (install.get(&key), flow.get(&key)) else {
                continue;
            };
            problem.add_le(
                &format!("link[{},{}]", edge.from, edge.to),
                f - edge.capacity * x,
                0.,
            )?;
            if edge.excluded {
                problem.add_eq(&format!("length[{},{}]", edge.from, edge.to), x, 0.)?;
            }
        }

        for (a, b) in &self.conflicts {
            let (first, second) = (&self.edges[*a], &self.edges[*b]);
            let x_a = install.get(&(first.from.clone(), first.to.clone()));
            let x_b = install.get(&(second.from.clone(), second.to.clone()));
            if let (Some(x_a), Some(x_b)) = (x_a, x_b) {
                problem.add_le(
                    &format!(
                        "crossing[{},{}|{},{}]",
                        first.from, first.to, second.from, second.to
                    ),
                    x_a + x_b,
                    1.,
                )?;
            }
        }

        let costs: IndexMap<(String, String), f64> = self
            .edges
            .iter()
            .map(|e| ((e.from.clone(), e.to.clone()), e.fixed_cost))
            .collect();
        problem.set_objective(install.prod(|key| costs.get(key).copied().unwrap_or(0.)))?;
        debug!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            constraints = problem.num_constraints(),
            "built fixed-charge network model"
        );
        Ok(NetworkModel {
            problem,
            install,
            flow,
        })
    }

    /// Solve with the configured solver
    pub fn solve(&self) -> Result<NetworkPlan, FormulationError> {
        let kind = read_configuration().solver;
        self.solve_with(kind)
    }

    pub fn solve_with(&self, kind: SolverKind) -> Result<NetworkPlan, FormulationError> {
        let threshold = read_configuration().integrality_threshold;
        let NetworkModel {
            mut problem,
            install,
            flow,
        } = self.build()?;
        let solution = problem.optimize_with(kind)?;
        let mut installed = Vec::new();
        if solution.has_solution() {
            for edge in &self.edges {
                let key = (edge.from.clone(), edge.to.clone());
                let built = install
                    .get(&key)
                    .and_then(|x| solution.var_value(x))
                    .unwrap_or(0.);
                if built > threshold {
                    installed.push(InstalledEdge {
                        from: edge.from.clone(),
                        to: edge.to.clone(),
                        flow: flow
                            .get(&key)
                            .and_then(|f| solution.var_value(f))
                            .unwrap_or(0.),
                        fixed_cost: edge.fixed_cost,
                    });
                }
            }
        }
        Ok(NetworkPlan {
            status: solution.status,
            installed,
            total_cost: solution.objective_value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(from: &str, to: &str, fixed_cost: f64) -> CandidateEdge {
        CandidateEdge {
            from: from.to_string(),
            to: to.to_string(),
            fixed_cost,
            capacity: 10.,
            excluded: false,
        }
    }

    /// Two producers that can each reach the sink directly or through the other
    fn small_network() -> FixedChargeNetwork {
        FixedChargeNetwork {
            nodes: [("a", 3.), ("b", 2.), ("sink", 0.)]
                .into_iter()
                .map(|(n, p)| (n.to_string(), p))
                .collect(),
            sink: "sink".to_string(),
            edges: vec![
                edge("a", "sink", 5.),
                edge("a", "b", 1.),
                edge("b", "sink", 2.),
                edge("b", "a", 1.),
            ],
            conflicts: Vec::new(),
            single_outlet: true,
        }
    }

    #[test]
    fn cheapest_tree_is_chosen() {
        let plan = small_network().solve_with(SolverKind::Microlp).unwrap();
        assert_eq!(plan.status, OptimizationStatus::Optimal);
        assert!((plan.total_cost.unwrap() - 3.).abs() < 1e-6);
        assert_eq!(plan.installed.len(), 2);
        let flow_on = |from: &str, to: &str| {
            plan.installed
                .iter()
                .find(|e| e.from == from && e.to == to)
                .map(|e| e.flow)
        };
        assert!((flow_on("a", "b").unwrap() - 3.).abs() < 1e-6);
        assert!((flow_on("b", "sink").unwrap() - 5.).abs() < 1e-6);
    }

    #[test]
    fn excluded_edges_are_never_installed() {
        let mut network = small_network();
        network.edges[2].excluded = true;
        let plan = network.solve_with(SolverKind::Microlp).unwrap();
        assert_eq!(plan.status, OptimizationStatus::Optimal);
        assert!(plan.installed.iter().all(|e| !(e.from == "b" && e.to == "sink")));
        assert!((plan.total_cost.unwrap() - 6.).abs() < 1e-6);
    }

    #[test]
    fn conflicting_edges_are_not_both_installed() {
        let mut network = small_network();
        network.conflicts.push((1, 2));
        let model = network.build().unwrap();
        assert!(model.problem.constraint("crossing[a,b|b,sink]").is_some());
        let plan = network.solve_with(SolverKind::Microlp).unwrap();
        // b -> a -> sink is now the cheapest layout
        assert!((plan.total_cost.unwrap() - 6.).abs() < 1e-6);
    }

    #[test]
    fn capacity_limits_flow() {
        let mut network = small_network();
        for e in network.edges.iter_mut() {
            e.capacity = 4.;
        }
        // Chaining would put 5 units on one edge, so both producers go direct
        let plan = network.solve_with(SolverKind::Microlp).unwrap();
        assert!((plan.total_cost.unwrap() - 7.).abs() < 1e-6);
        assert!(plan.installed.iter().all(|e| e.flow <= 4. + 1e-6));
    }

    #[test]
    fn flow_needs_an_installed_edge() {
        let network = small_network();
        let NetworkModel {
            mut problem,
            install,
            flow,
        } = network.build().unwrap();
        let solution = problem.optimize_with(SolverKind::Microlp).unwrap();
        assert!(solution.is_optimal());
        let mut uninstalled = 0;
        for (key, x) in install.iter() {
            let built = solution.var_value(x).unwrap();
            let carried = solution.var_value(flow.get(key).unwrap()).unwrap();
            if built < 0.5 {
                uninstalled += 1;
                assert!(carried.abs() < 1e-6, "{key:?} carries {carried} without a cable");
            }
        }
        // Two of the four candidate edges stay unused
        assert_eq!(uninstalled, 2);
    }

    #[test]
    fn unknown_sink_is_an_error() {
        let mut network = small_network();
        network.sink = "shore".to_string();
        assert_eq!(
            network.build().unwrap_err(),
            FormulationError::UnknownNode("shore".to_string())
        );
    }
}
