//! Workforce shift scheduling with lexicographic objectives
//!
//! Workers are assigned to the shifts they are available for. Shifts that cannot be
//! covered by employed workers are filled with temporary hires. The number of temps is
//! minimized first, then the difference between the busiest and the least busy worker.
use derive_builder::Builder;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::configuration::read_configuration;
use crate::formulations::{FormulationError, VarMap};
use crate::optimize::expression::LinearExpr;
use crate::optimize::objective::{Objective, ObjectiveSense};
use crate::optimize::problem::Problem;
use crate::optimize::solvers::SolverKind;
use crate::optimize::variable::{VarRef, Variable};
use crate::optimize::OptimizationStatus;

/// Id of the objective minimizing temporary hires
pub const TEMPS_OBJECTIVE: &str = "temps";
/// Id of the objective minimizing the workload gap
pub const FAIRNESS_OBJECTIVE: &str = "fairness";

/// A workforce scheduling instance
#[derive(Builder, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkforceProblem {
    /// Required headcount of every shift
    #[builder(setter(into))]
    pub shifts: IndexMap<String, f64>,
    /// Pay rate of every worker
    #[builder(setter(into))]
    pub workers: IndexMap<String, f64>,
    /// `(worker, shift)` pairs the worker can be scheduled on
    #[builder(setter(into))]
    pub availability: Vec<(String, String)>,
}

/// Result of solving a workforce instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkforceSchedule {
    pub status: OptimizationStatus,
    /// Workers assigned to every shift
    pub assignments: IndexMap<String, Vec<String>>,
    /// Temporary hires per shift
    pub temps: IndexMap<String, f64>,
    /// Shifts worked by every worker
    pub workloads: IndexMap<String, f64>,
    pub total_temps: Option<f64>,
    /// Difference between the largest and smallest workload
    pub fairness_gap: Option<f64>,
    /// Pay of the employed workers over all their assignments
    pub total_pay: f64,
}

/// The optimization model of a workforce instance, before solving
#[derive(Debug, Clone)]
pub struct WorkforceModel {
    pub problem: Problem,
    /// `assign[worker, shift]`
    pub assign: VarMap<(String, String)>,
    /// `temp[shift]`
    pub temps: VarMap<String>,
    /// `workload[worker]`
    pub workloads: VarMap<String>,
    pub total_temps: VarRef,
    pub min_workload: VarRef,
    pub max_workload: VarRef,
}

impl WorkforceProblem {
    /// The two week, seven worker instance
    pub fn default_instance() -> Self {
        let shifts = [
            ("Mon1", 3.),
            ("Tue2", 2.),
            ("Wed3", 4.),
            ("Thu4", 4.),
            ("Fri5", 5.),
            ("Sat6", 5.),
            ("Sun7", 3.),
            ("Mon8", 2.),
            ("Tue9", 2.),
            ("Wed10", 3.),
            ("Thu11", 4.),
            ("Fri12", 5.),
            ("Sat13", 7.),
            ("Sun14", 5.),
        ];
        let workers = [
            ("Amy", 10.),
            ("Bob", 12.),
            ("Cathy", 10.),
            ("Dan", 8.),
            ("Ed", 8.),
            ("Fred", 9.),
            ("Gu", 11.),
        ];
        let availability: [(&str, &[&str]); 7] = [
            (
                "Amy",
                &["Tue2", "Wed3", "Fri5", "Sun7", "Tue9", "Wed10", "Thu11", "Fri12", "Sat13", "Sun14"],
            ),
            ("Bob", &["Mon1", "Tue2", "Fri5", "Sat6", "Mon8", "Thu11", "Sat13"]),
            (
                "Cathy",
                &["Wed3", "Thu4", "Fri5", "Sun7", "Mon8", "Tue9", "Wed10", "Thu11", "Fri12", "Sat13", "Sun14"],
            ),
            (
                "Dan",
                &["Tue2", "Wed3", "Fri5", "Sat6", "Mon8", "Tue9", "Wed10", "Thu11", "Fri12", "Sat13", "Sun14"],
            ),
            (
                "Ed",
                &["Mon1", "Tue2", "Wed3", "Thu4", "Fri5", "Sun7", "Mon8", "Tue9", "Thu11", "Sat13", "Sun14"],
            ),
            (
                "Fred",
                &["Mon1", "Tue2", "Wed3", "Sat6", "Mon8", "Tue9", "Fri12", "Sat13", "Sun14"],
            ),
            (
                "Gu",
                &[
                    "Mon1", "Tue2", "Wed3", "Fri5", "Sat6", "Sun7", "Mon8", "Tue9", "Wed10", "Thu11",
                    "Fri12", "Sat13", "Sun14",
                ],
            ),
        ];
        Self {
            shifts: shifts.iter().map(|(s, r)| (s.to_string(), *r)).collect(),
            workers: workers.iter().map(|(w, p)| (w.to_string(), *p)).collect(),
            availability: availability
                .iter()
                .flat_map(|(worker, shifts)| {
                    shifts
                        .iter()
                        .map(move |shift| (worker.to_string(), shift.to_string()))
                })
                .collect(),
        }
    }

    /// Check requirements and availability
    pub fn validate(&self) -> Result<(), FormulationError> {
        for (shift, required) in &self.shifts {
            if *required < 0. {
                return Err(FormulationError::InvalidValue {
                    field: format!("requirement[{}]", shift),
                    value: *required,
                });
            }
        }
        for (worker, shift) in &self.availability {
            if !self.workers.contains_key(worker) {
                return Err(FormulationError::UnknownWorker(worker.clone()));
            }
            if !self.shifts.contains_key(shift) {
                return Err(FormulationError::UnknownShift(shift.clone()));
            }
        }
        Ok(())
    }

    /// Build the optimization model
    pub fn build(&self) -> Result<WorkforceModel, FormulationError> {
        self.validate()?;
        let horizon = self.shifts.len() as f64;
        let mut problem = Problem::new_minimization();

        // Repeated availability pairs would give repeated variable ids
        let pairs: IndexSet<&(String, String)> = self.availability.iter().collect();
        let mut assign = VarMap::new();
        for (worker, shift) in pairs {
            assign.add(
                &mut problem,
                (worker.clone(), shift.clone()),
                Variable::new_binary(&format!("assign[{},{}]", worker, shift)),
            )?;
        }
        let mut temps = VarMap::new();
        for shift in self.shifts.keys() {
            temps.add(
                &mut problem,
                shift.clone(),
                Variable::new_continuous(&format!("temp[{}]", shift), 0., f64::INFINITY),
            )?;
        }
        let total_temps = problem.add_continuous("total_temp", 0., f64::INFINITY)?;
        let mut workloads = VarMap::new();
        for worker in self.workers.keys() {
            workloads.add(
                &mut problem,
                worker.clone(),
                Variable::new_integer(&format!("workload[{}]", worker), 0., horizon),
            )?;
        }
        let min_workload = problem.add_integer("min_workload", 0., horizon)?;
        let max_workload = problem.add_integer("max_workload", 0., horizon)?;

        for (shift, required) in &self.shifts {
            let covered = assign.sum_where(|(_, s)| s == shift) + temps.sum_where(|s| s == shift);
            problem.add_eq(&format!("coverage[{}]", shift), covered, *required)?;
        }
        problem.add_eq("total_temp", total_temps - temps.sum(), 0.)?;
        for (worker, workload) in workloads.iter() {
            problem.add_eq(
                &format!("workload[{}]", worker),
                workload - assign.sum_where(|(w, _)| w == worker),
                0.,
            )?;
            problem.add_le(&format!("min_workload[{}]", worker), min_workload - workload, 0.)?;
            problem.add_ge(&format!("max_workload[{}]", worker), max_workload - workload, 0.)?;
        }

        problem.add_objective(
            Objective::from_expr(TEMPS_OBJECTIVE, ObjectiveSense::Minimize, total_temps.into())
                .with_priority(2),
        )?;
        problem.add_objective(
            Objective::from_expr(
                FAIRNESS_OBJECTIVE,
                ObjectiveSense::Minimize,
                LinearExpr::from(max_workload) - min_workload,
            )
            .with_priority(1),
        )?;
        debug!(
            assignments = assign.len(),
            constraints = problem.num_constraints(),
            "built workforce model"
        );
        Ok(WorkforceModel {
            problem,
            assign,
            temps,
            workloads,
            total_temps,
            min_workload,
            max_workload,
        })
    }

    /// Solve with the configured solver
    pub fn solve(&self) -> Result<WorkforceSchedule, FormulationError> {
        let kind = read_configuration().solver;
        self.solve_with(kind)
    }

    pub fn solve_with(&self, kind: SolverKind) -> Result<WorkforceSchedule, FormulationError> {
        let threshold = read_configuration().integrality_threshold;
        let WorkforceModel {
            mut problem,
            assign,
            temps,
            workloads,
            ..
        } = self.build()?;
        let solution = problem.optimize_with(kind)?;

        let mut assignments: IndexMap<String, Vec<String>> = IndexMap::new();
        let mut total_pay = 0.;
        for ((worker, shift), value) in assign.values(&solution).unwrap_or_default() {
            if value > threshold {
                assignments
                    .entry(shift.clone())
                    .or_default()
                    .push(worker.clone());
                total_pay += self.workers.get(worker).copied().unwrap_or(0.);
            }
        }
        let values_of = |vars: &VarMap<String>| -> IndexMap<String, f64> {
            vars.values(&solution)
                .unwrap_or_default()
                .into_iter()
                .map(|(k, v)| (k.clone(), v))
                .collect()
        };
        Ok(WorkforceSchedule {
            status: solution.status,
            temps: values_of(&temps),
            workloads: values_of(&workloads),
            assignments,
            total_temps: solution.objective(TEMPS_OBJECTIVE),
            fairness_gap: solution.objective(FAIRNESS_OBJECTIVE),
            total_pay,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Five shifts and three workers. Nobody can take Fri, and on Thu Cathy
    /// has to work for the workloads to stay within one shift of each other.
    fn small_instance() -> WorkforceProblem {
        let pair = |w: &str, s: &str| (w.to_string(), s.to_string());
        WorkforceProblem {
            shifts: [("Mon", 2.), ("Tue", 2.), ("Wed", 1.), ("Thu", 2.), ("Fri", 1.)]
                .into_iter()
                .map(|(s, r)| (s.to_string(), r))
                .collect(),
            workers: [("Amy", 10.), ("Bob", 12.), ("Cathy", 8.)]
                .into_iter()
                .map(|(w, p)| (w.to_string(), p))
                .collect(),
            availability: vec![
                pair("Amy", "Mon"),
                pair("Amy", "Tue"),
                pair("Amy", "Thu"),
                pair("Bob", "Mon"),
                pair("Bob", "Wed"),
                pair("Bob", "Thu"),
                pair("Cathy", "Tue"),
                pair("Cathy", "Thu"),
            ],
        }
    }

    /// Temps needed when every available worker is scheduled
    fn unavoidable_temps(instance: &WorkforceProblem) -> f64 {
        instance
            .shifts
            .iter()
            .map(|(shift, required)| {
                let available = instance.availability.iter().filter(|(_, s)| s == shift).count();
                (required - available as f64).max(0.)
            })
            .sum()
    }

    fn check_schedule(instance: &WorkforceProblem, schedule: &WorkforceSchedule) {
        // Every shift is covered by workers plus temps
        for (shift, required) in &instance.shifts {
            let workers = schedule.assignments.get(shift).map_or(0, |w| w.len()) as f64;
            assert!((workers + schedule.temps[shift] - required).abs() < 1e-5);
        }
        // Workloads match the assignments
        for worker in instance.workers.keys() {
            let shifts = schedule
                .assignments
                .values()
                .filter(|workers| workers.contains(worker))
                .count() as f64;
            assert!((schedule.workloads[worker] - shifts).abs() < 1e-5);
        }
        // The fairness objective is the spread of the workloads
        let max = schedule.workloads.values().cloned().fold(f64::MIN, f64::max);
        let min = schedule.workloads.values().cloned().fold(f64::MAX, f64::min);
        assert!((max - min - schedule.fairness_gap.unwrap()).abs() < 1e-5);

        let pay: f64 = schedule
            .assignments
            .values()
            .flatten()
            .map(|w| instance.workers[w])
            .sum();
        assert!((schedule.total_pay - pay).abs() < 1e-9);
    }

    #[test]
    fn small_instance_schedule() {
        let instance = small_instance();
        let schedule = instance.solve_with(SolverKind::Microlp).unwrap();
        assert_eq!(schedule.status, OptimizationStatus::Optimal);
        assert!((unavoidable_temps(&instance) - 1.).abs() < 1e-9);
        assert!((schedule.total_temps.unwrap() - 1.).abs() < 1e-5);
        assert!((schedule.temps["Fri"] - 1.).abs() < 1e-5);
        assert!((schedule.fairness_gap.unwrap() - 1.).abs() < 1e-5);
        assert!(schedule.assignments["Thu"].contains(&"Cathy".to_string()));
        assert!((schedule.workloads["Cathy"] - 2.).abs() < 1e-5);
        check_schedule(&instance, &schedule);
    }

    #[test]
    #[ignore = "the two week instance takes minutes with microlp"]
    fn default_instance_schedule() {
        let instance = WorkforceProblem::default_instance();
        let schedule = instance.solve_with(SolverKind::Microlp).unwrap();
        assert_eq!(schedule.status, OptimizationStatus::Optimal);
        assert!((unavoidable_temps(&instance) - 3.).abs() < 1e-9);
        assert!((schedule.total_temps.unwrap() - 3.).abs() < 1e-5);
        // 51 assigned shifts over 7 workers can't be split evenly, a gap of 1 can be reached
        assert!((schedule.fairness_gap.unwrap() - 1.).abs() < 1e-5);
        check_schedule(&instance, &schedule);
    }

    #[cfg(feature = "highs")]
    #[test]
    fn default_instance_schedule_on_highs() {
        let instance = WorkforceProblem::default_instance();
        let schedule = instance.solve_with(SolverKind::Highs).unwrap();
        assert_eq!(schedule.status, OptimizationStatus::Optimal);
        assert!((schedule.total_temps.unwrap() - 3.).abs() < 1e-5);
        assert!((schedule.fairness_gap.unwrap() - 1.).abs() < 1e-5);
        check_schedule(&instance, &schedule);
    }

    #[test]
    fn model_structure() {
        let model = WorkforceProblem::default_instance().build().unwrap();
        assert_eq!(model.assign.len(), 72);
        assert_eq!(model.temps.len(), 14);
        assert!(model.problem.constraint("coverage[Sat13]").is_some());
        assert!(model.problem.constraint("max_workload[Gu]").is_some());
        let objective = model.problem.objective(TEMPS_OBJECTIVE).unwrap();
        assert_eq!(objective.priority(), 2);
    }

    #[test]
    fn unknown_worker_is_an_error() {
        let mut instance = WorkforceProblem::default_instance();
        instance
            .availability
            .push(("Zed".to_string(), "Mon1".to_string()));
        assert_eq!(
            instance.build().unwrap_err(),
            FormulationError::UnknownWorker("Zed".to_string())
        );
    }

    #[test]
    fn unknown_shift_is_an_error() {
        let mut instance = WorkforceProblem::default_instance();
        instance
            .availability
            .push(("Amy".to_string(), "Mon15".to_string()));
        assert_eq!(
            instance.validate().unwrap_err(),
            FormulationError::UnknownShift("Mon15".to_string())
        );
    }

    #[test]
    fn builder() {
        let instance = WorkforceProblemBuilder::default()
            .shifts([("Mon".to_string(), 2.)])
            .workers([("Amy".to_string(), 10.), ("Bob".to_string(), 12.)])
            .availability(vec![
                ("Amy".to_string(), "Mon".to_string()),
                ("Bob".to_string(), "Mon".to_string()),
            ])
            .build()
            .unwrap();
        let schedule = instance.solve_with(SolverKind::Microlp).unwrap();
        assert!(schedule.total_temps.unwrap().abs() < 1e-6);
        assert!((schedule.total_pay - 22.).abs() < 1e-9);
        assert!(schedule.fairness_gap.unwrap().abs() < 1e-6);
    }
}
