//! Transportation flow from supply nodes to demand nodes
use derive_builder::Builder;
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

fn default_price() -> f64 {
    90.
}

/// Distance between a supply node and a demand node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    pub source: String,
    pub destination: String,
    pub distance: f64,
}

impl Lane {
    pub fn new(source: &str, destination: &str, distance: f64) -> Self {
        Self {
            source: source.to_string(),
            destination: destination.to_string(),
            distance,
        }
    }
}

/// A transportation instance
///
/// # Examples
/// ```rust
/// use flowmodel_core::formulations::transportation::{Lane, TransportationProblemBuilder};
/// let instance = TransportationProblemBuilder::default()
///     .supplies([("mill".to_string(), 10.)])
///     .demands([("shop".to_string(), 4.)])
///     .distances(vec![Lane::new("mill", "shop", 1.5)])
///     .build()
///     .unwrap();
/// assert_eq!(instance.price, 90.);
/// ```
#[derive(Builder, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct TransportationProblem {
    /// Capacity of each supply node
    #[builder(setter(custom))]
    pub supplies: IndexMap<String, f64>,
    /// Demand of each demand node
    #[builder(setter(custom))]
    pub demands: IndexMap<String, f64>,
    /// Distance for every (supply, demand) pair
    #[builder(default)]
    pub distances: Vec<Lane>,
    /// Price per unit of flow per unit of distance
    #[builder(default = "default_price()")]
    #[serde(default = "default_price")]
    pub price: f64,
}

impl TransportationProblemBuilder {
    pub fn supplies<I: IntoIterator<Item = (String, f64)>>(&mut self, supplies: I) -> &mut Self {
        self.supplies = Some(supplies.into_iter().collect());
        self
    }

    pub fn demands<I: IntoIterator<Item = (String, f64)>>(&mut self, demands: I) -> &mut Self {
        self.demands = Some(demands.into_iter().collect());
        self
    }

    fn validate(&self) -> Result<(), String> {
        let nodes = self.supplies.iter().flatten().chain(self.demands.iter().flatten());
        for (name, amount) in nodes {
            if *amount < 0. {
                return Err(format!("{name} has a negative amount {amount}"));
            }
        }
        Ok(())
    }
}

/// Amount shipped on one lane
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shipment {
    pub source: String,
    pub destination: String,
    pub amount: f64,
}

/// Result of solving a transportation instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransportationPlan {
    pub status: OptimizationStatus,
    /// Flow on every lane, empty if the instance could not be solved
    pub shipments: Vec<Shipment>,
    pub total_cost: Option<f64>,
}

/// The optimization model of a transportation instance, before solving
#[derive(Debug, Clone)]
pub struct TransportationModel {
    pub problem: Problem,
    /// `flow[supply, demand]`
    pub flows: VarMap<(String, String)>,
}

impl TransportationProblem {
    /// The four-node textbook instance: two plants shipping to three markets
    pub fn default_instance() -> Self {
        let lanes = [
            ("seattle", "new-york", 2.5),
            ("seattle", "chicago", 1.7),
            ("seattle", "topeka", 1.8),
            ("san-diego", "new-york", 2.5),
            ("san-diego", "chicago", 1.8),
            ("san-diego", "topeka", 1.4),
        ];
        Self {
            supplies: [("seattle", 350.), ("san-diego", 600.)]
                .into_iter()
                .map(|(n, c)| (n.to_string(), c))
                .collect(),
            demands: [("new-york", 325.), ("chicago", 300.), ("topeka", 275.)]
                .into_iter()
                .map(|(n, d)| (n.to_string(), d))
                .collect(),
            distances: lanes
                .into_iter()
                .map(|(s, d, dist)| Lane::new(s, d, dist))
                .collect(),
            price: default_price(),
        }
    }

    fn distance(&self, source: &str, destination: &str) -> Result<f64, FormulationError> {
        self.distances
            .iter()
            .find(|lane| lane.source == source && lane.destination == destination)
            .map(|lane| lane.distance)
            .ok_or_else(|| FormulationError::MissingDistance {
                from: source.to_string(),
                to: destination.to_string(),
            })
    }

    /// Check amounts and lanes of an instance that did not go through the builder
    pub fn validate(&self) -> Result<(), FormulationError> {
        for (name, amount) in self.supplies.iter().chain(&self.demands) {
            if *amount < 0. {
                return Err(FormulationError::InvalidValue {
                    field: name.clone(),
                    value: *amount,
                });
            }
        }
        for lane in &self.distances {
            if !self.supplies.contains_key(&lane.source) {
                return Err(FormulationError::UnknownNode(lane.source.clone()));
            }
            if !self.demands.contains_key(&lane.destination) {
                return Err(FormulationError::UnknownNode(lane.destination.clone()));
            }
        }
        Ok(())
    }

    /// Build the optimization model
    pub fn build(&self) -> Result<TransportationModel, FormulationError> {
        self.validate()?;
        let mut problem = Problem::new(ObjectiveSense::Minimize);
        let mut flows = VarMap::new();
        let mut unit_costs: IndexMap<(String, String), f64> = IndexMap::new();
        for source in self.supplies.keys() {
            for destination in self.demands.keys() {
                let distance = self.distance(source, destination)?;
                flows.add(
                    &mut problem,
                    (source.clone(), destination.clone()),
                    Variable::new_continuous(
                        &format!("flow[{},{}]", source, destination),
                        0.,
                        f64::INFINITY,
                    ),
                )?;
                unit_costs.insert((source.clone(), destination.clone()), self.price * distance);
            }
        }
        for (source, capacity) in &self.supplies {
            problem.add_le(
                &format!("capacity[{}]", source),
                flows.sum_where(|(s, _)| s == source),
                *capacity,
            )?;
        }
        for (destination, demand) in &self.demands {
            problem.add_ge(
                &format!("demand[{}]", destination),
                flows.sum_where(|(_, d)| d == destination),
                *demand,
            )?;
        }
        problem.set_objective(flows.prod(|lane| unit_costs.get(lane).copied().unwrap_or(0.)))?;
        debug!(
            lanes = flows.len(),
            constraints = problem.num_constraints(),
            "built transportation model"
        );
        Ok(TransportationModel { problem, flows })
    }

    /// Solve with the configured solver
    pub fn solve(&self) -> Result<TransportationPlan, FormulationError> {
        let kind = read_configuration().solver;
        self.solve_with(kind)
    }

    pub fn solve_with(&self, kind: SolverKind) -> Result<TransportationPlan, FormulationError> {
        let TransportationModel { mut problem, flows } = self.build()?;
        let solution = problem.optimize_with(kind)?;
        let shipments = flows
            .values(&solution)
            .unwrap_or_default()
            .into_iter()
            .map(|((source, destination), amount)| Shipment {
                source: source.clone(),
                destination: destination.clone(),
                amount,
            })
            .collect();
        Ok(TransportationPlan {
            status: solution.status,
            shipments,
            total_cost: solution.objective_value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_instance_optimum() {
        let instance = TransportationProblem::default_instance();
        let plan = instance.solve_with(SolverKind::Microlp).unwrap();
        assert_eq!(plan.status, OptimizationStatus::Optimal);
        assert!((plan.total_cost.unwrap() - 153_675.).abs() < 1e-4);
        assert_eq!(plan.shipments.len(), 6);

        // Capacity and demand hold, and the cost is the sum of flow times unit cost
        for (source, capacity) in &instance.supplies {
            let shipped: f64 = plan
                .shipments
                .iter()
                .filter(|s| &s.source == source)
                .map(|s| s.amount)
                .sum();
            assert!(shipped <= capacity + 1e-6);
        }
        for (destination, demand) in &instance.demands {
            let received: f64 = plan
                .shipments
                .iter()
                .filter(|s| &s.destination == destination)
                .map(|s| s.amount)
                .sum();
            assert!(received >= demand - 1e-6);
        }
        let cost: f64 = plan
            .shipments
            .iter()
            .map(|s| s.amount * instance.price * instance.distance(&s.source, &s.destination).unwrap())
            .sum();
        assert!((cost - plan.total_cost.unwrap()).abs() < 1e-4);
    }

    #[test]
    fn model_names_constraints() {
        let model = TransportationProblem::default_instance().build().unwrap();
        assert!(model.problem.constraint("capacity[seattle]").is_some());
        assert!(model.problem.constraint("demand[topeka]").is_some());
        assert!(model.problem.variable("flow[san-diego,chicago]").is_some());
        assert_eq!(model.flows.len(), 6);
    }

    #[test]
    fn excess_demand_is_infeasible() {
        let mut instance = TransportationProblem::default_instance();
        instance.demands.insert("new-york".to_string(), 1_000.);
        let plan = instance.solve_with(SolverKind::Microlp).unwrap();
        assert_eq!(plan.status, OptimizationStatus::Infeasible);
        assert!(plan.shipments.is_empty());
        assert!(plan.total_cost.is_none());
    }

    #[test]
    fn missing_distance_is_an_error() {
        let mut instance = TransportationProblem::default_instance();
        instance.distances.pop();
        match instance.build() {
            Err(FormulationError::MissingDistance { from, to }) => {
                assert_eq!(from, "san-diego");
                assert_eq!(to, "topeka");
            }
            other => panic!("Expected a missing distance error, got {:?}", other),
        }
    }

    #[test]
    fn builder_rejects_negative_capacity() {
        let res = TransportationProblemBuilder::default()
            .supplies([("mill".to_string(), -1.)])
            .demands([("shop".to_string(), 4.)])
            .build();
        assert!(res.is_err());
    }

    #[test]
    fn solves_on_clarabel() {
        let plan = TransportationProblem::default_instance()
            .solve_with(SolverKind::Clarabel)
            .unwrap();
        assert!(matches!(
            plan.status,
            OptimizationStatus::Optimal | OptimizationStatus::AlmostOptimal
        ));
        assert!((plan.total_cost.unwrap() - 153_675.).abs() < 1.);
    }
}
