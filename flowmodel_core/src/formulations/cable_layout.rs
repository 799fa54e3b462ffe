//! Offshore wind farm cable layout
//!
//! Every turbine sends its production over exactly one outgoing cable, either to the
//! collection platform or to another turbine. Cables have a capacity, cost a price per km
//! of length, and routes longer than a maximum length are not allowed. The layout is a
//! [`FixedChargeNetwork`] whose sink is the platform.
use derive_builder::Builder;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::configuration::read_configuration;
use crate::formulations::fixed_charge::{
    CandidateEdge, FixedChargeNetwork, NetworkModel, NetworkPlan,
};
use crate::formulations::FormulationError;
use crate::geometry::{crossing_pairs, Point, Segment};
use crate::optimize::solvers::SolverKind;
use crate::optimize::OptimizationStatus;

fn default_platform() -> String {
    "Plat".to_string()
}

fn default_price_per_km() -> f64 {
    1e6
}

fn default_cable_capacity() -> f64 {
    65.
}

fn default_production() -> f64 {
    8.
}

fn default_max_length_km() -> f64 {
    10.
}

/// A turbine or platform location, coordinates in metres
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Easting")]
    pub easting: f64,
    #[serde(alias = "Northing")]
    pub northing: f64,
}

impl Site {
    pub fn new(name: &str, easting: f64, northing: f64) -> Self {
        Self {
            name: name.to_string(),
            easting,
            northing,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.easting, self.northing)
    }
}

/// A cable layout instance
#[derive(Builder, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct CableLayout {
    pub sites: Vec<Site>,
    /// Name of the collection platform
    #[builder(setter(into), default = "default_platform()")]
    #[serde(default = "default_platform")]
    pub platform: String,
    #[builder(default = "default_price_per_km()")]
    #[serde(default = "default_price_per_km")]
    pub price_per_km: f64,
    /// MW a single cable can carry
    #[builder(default = "default_cable_capacity()")]
    #[serde(default = "default_cable_capacity")]
    pub cable_capacity: f64,
    /// MW produced by each turbine
    #[builder(default = "default_production()")]
    #[serde(default = "default_production")]
    pub production: f64,
    /// Routes this long or longer cannot be installed
    #[builder(default = "default_max_length_km()")]
    #[serde(default = "default_max_length_km")]
    pub max_length_km: f64,
    /// Forbid installing two routes that cross each other
    #[builder(default)]
    #[serde(default)]
    pub forbid_crossings: bool,
}

impl CableLayoutBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(sites) = &self.sites {
            let platform = self.platform.clone().unwrap_or_else(default_platform);
            if !sites.iter().any(|s| s.name == platform) {
                return Err(format!("platform {platform} is not among the sites"));
            }
        }
        match (self.cable_capacity, self.production) {
            (Some(capacity), _) if capacity < 0. => Err("cable capacity is negative".to_string()),
            (_, Some(production)) if production < 0. => Err("production is negative".to_string()),
            _ => Ok(()),
        }
    }
}

/// An installed cable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CableRoute {
    pub from: String,
    pub to: String,
    pub length_km: f64,
    /// MW carried by the cable
    pub flow: f64,
    pub cost: f64,
}

/// Result of solving a cable layout
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CableLayoutPlan {
    pub status: OptimizationStatus,
    pub routes: Vec<CableRoute>,
    pub total_length_km: f64,
    pub total_cost: Option<f64>,
}

impl CableLayout {
    /// Layout with default parameters for the given sites
    pub fn new(sites: Vec<Site>) -> Self {
        Self {
            sites,
            platform: default_platform(),
            price_per_km: default_price_per_km(),
            cable_capacity: default_cable_capacity(),
            production: default_production(),
            max_length_km: default_max_length_km(),
            forbid_crossings: false,
        }
    }

    fn positions(&self) -> Result<IndexMap<&str, Point>, FormulationError> {
        let mut positions = IndexMap::new();
        for site in &self.sites {
            if positions.insert(site.name.as_str(), site.position()).is_some() {
                return Err(FormulationError::DuplicateNode(site.name.clone()));
            }
        }
        if !positions.contains_key(self.platform.as_str()) {
            return Err(FormulationError::UnknownNode(self.platform.clone()));
        }
        Ok(positions)
    }

    /// Check that site names are unique and that the platform is one of the sites
    pub fn validate(&self) -> Result<(), FormulationError> {
        self.positions().map(|_| ())
    }

    /// Candidate routes: every ordered pair of distinct sites not leaving the platform,
    /// with their length in km
    pub fn routes(&self) -> Result<Vec<(&str, &str, f64)>, FormulationError> {
        let positions = self.positions()?;
        let mut routes = Vec::new();
        for (origin, from) in &positions {
            if *origin == self.platform {
                continue;
            }
            for (destination, to) in &positions {
                if origin == destination {
                    continue;
                }
                routes.push((*origin, *destination, from.distance(to) / 1000.));
            }
        }
        Ok(routes)
    }

    /// The fixed-charge network of this layout
    pub fn to_network(&self) -> Result<FixedChargeNetwork, FormulationError> {
        let positions = self.positions()?;
        let routes = self.routes()?;
        let edges: Vec<CandidateEdge> = routes
            .iter()
            .map(|(from, to, length)| CandidateEdge {
                from: from.to_string(),
                to: to.to_string(),
                fixed_cost: self.price_per_km * length,
                capacity: self.cable_capacity,
                excluded: *length >= self.max_length_km,
            })
            .collect();
        let conflicts = if self.forbid_crossings {
            let segments: Vec<Segment<'_>> = routes
                .iter()
                .map(|(from, to, _)| Segment::new(from, positions[from], to, positions[to]))
                .collect();
            crossing_pairs(&segments)
        } else {
            Vec::new()
        };
        debug!(
            sites = positions.len(),
            routes = edges.len(),
            crossings = conflicts.len(),
            "derived cable network"
        );
        Ok(FixedChargeNetwork {
            nodes: positions
                .keys()
                .map(|name| {
                    let production = if *name == self.platform {
                        0.
                    } else {
                        self.production
                    };
                    (name.to_string(), production)
                })
                .collect(),
            sink: self.platform.clone(),
            edges,
            conflicts,
            single_outlet: true,
        })
    }

    /// Build the optimization model
    pub fn build(&self) -> Result<NetworkModel, FormulationError> {
        self.to_network()?.build()
    }

    /// Solve with the configured solver
    pub fn solve(&self) -> Result<CableLayoutPlan, FormulationError> {
        let kind = read_configuration().solver;
        self.solve_with(kind)
    }

    pub fn solve_with(&self, kind: SolverKind) -> Result<CableLayoutPlan, FormulationError> {
        let NetworkPlan {
            status,
            installed,
            total_cost,
        } = self.to_network()?.solve_with(kind)?;
        let lengths: IndexMap<(String, String), f64> = self
            .routes()?
            .into_iter()
            .map(|(from, to, length)| ((from.to_string(), to.to_string()), length))
            .collect();
        let routes: Vec<CableRoute> = installed
            .into_iter()
            .map(|edge| CableRoute {
                length_km: lengths
                    .get(&(edge.from.clone(), edge.to.clone()))
                    .copied()
                    .unwrap_or(0.),
                from: edge.from,
                to: edge.to,
                flow: edge.flow,
                cost: edge.fixed_cost,
            })
            .collect();
        Ok(CableLayoutPlan {
            status,
            total_length_km: routes.iter().map(|r| r.length_km).sum(),
            routes,
            total_cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three radial strings of turbines around the platform
    fn radial_sites() -> Vec<Site> {
        vec![
            Site::new("Plat", 0., 0.),
            Site::new("T1", 1400., 0.),
            Site::new("T2", 3000., 0.),
            Site::new("T3", 4700., 0.),
            Site::new("T4", 0., 1300.),
            Site::new("T5", 0., 2800.),
            Site::new("T6", 0., 4400.),
            Site::new("T7", -1000., -1000.),
            Site::new("T8", -2100., -2100.),
        ]
    }

    fn expected_length() -> f64 {
        1.4 + 1.6 + 1.7 + 1.3 + 1.5 + 1.6 + 2f64.sqrt() + 1.1 * 2f64.sqrt()
    }

    #[test]
    fn candidate_routes() {
        let layout = CableLayout::new(radial_sites());
        let routes = layout.routes().unwrap();
        // 8 turbines, each with a route to the 8 other sites
        assert_eq!(routes.len(), 64);
        assert!(routes.iter().all(|(from, _, _)| *from != "Plat"));
        let (_, _, length) = routes
            .iter()
            .find(|(from, to, _)| *from == "T1" && *to == "Plat")
            .unwrap();
        assert!((length - 1.4).abs() < 1e-12);
    }

    #[test]
    fn radial_layout() {
        let layout = CableLayout::new(radial_sites());
        let plan = layout.solve_with(SolverKind::Microlp).unwrap();
        assert_eq!(plan.status, OptimizationStatus::Optimal);
        assert!((plan.total_length_km - expected_length()).abs() < 1e-6);

        // Every turbine has exactly one outgoing cable
        for site in layout.sites.iter().filter(|s| s.name != "Plat") {
            assert_eq!(plan.routes.iter().filter(|r| r.from == site.name).count(), 1);
        }
        // Flow is conserved, and stays within capacity
        for site in layout.sites.iter().filter(|s| s.name != "Plat") {
            let outflow: f64 = plan.routes.iter().filter(|r| r.from == site.name).map(|r| r.flow).sum();
            let inflow: f64 = plan.routes.iter().filter(|r| r.to == site.name).map(|r| r.flow).sum();
            assert!((outflow - inflow - layout.production).abs() < 1e-6);
        }
        assert!(plan.routes.iter().all(|r| r.flow <= layout.cable_capacity + 1e-6));
        let into_platform: f64 = plan.routes.iter().filter(|r| r.to == "Plat").map(|r| r.flow).sum();
        assert!((into_platform - 64.).abs() < 1e-6);

        // The objective is the cost of the installed cables
        let cost: f64 = plan.routes.iter().map(|r| r.cost).sum();
        assert!((cost - plan.total_cost.unwrap()).abs() < 1e-3);
    }

    #[test]
    fn long_routes_are_excluded() {
        let mut layout = CableLayout::new(radial_sites());
        layout.max_length_km = 1.45;
        let model = layout.build().unwrap();
        assert!(model.problem.constraint("length[T1,T2]").is_some());
        assert!(model.problem.constraint("length[T1,Plat]").is_none());
        // T3 can't reach anything within 1.45 km
        let plan = layout.solve_with(SolverKind::Microlp).unwrap();
        assert_eq!(plan.status, OptimizationStatus::Infeasible);
        assert!(plan.routes.is_empty());
    }

    #[test]
    fn crossing_constraints_are_opt_in() {
        let mut layout = CableLayout::new(radial_sites());
        let network = layout.to_network().unwrap();
        assert!(network.conflicts.is_empty());

        layout.forbid_crossings = true;
        let network = layout.to_network().unwrap();
        assert!(!network.conflicts.is_empty());
        // The radial layout has no crossing cables, so the optimum is unchanged
        let plan = layout.solve_with(SolverKind::Microlp).unwrap();
        assert_eq!(plan.status, OptimizationStatus::Optimal);
        assert!((plan.total_length_km - expected_length()).abs() < 1e-6);
    }

    #[test]
    fn builder_checks_platform() {
        let res = CableLayoutBuilder::default()
            .sites(radial_sites())
            .platform("Shore")
            .build();
        assert!(res.is_err());
        let layout = CableLayoutBuilder::default()
            .sites(radial_sites())
            .forbid_crossings(true)
            .build()
            .unwrap();
        assert_eq!(layout.platform, "Plat");
        assert!((layout.cable_capacity - 65.).abs() < 1e-25);
    }

    #[test]
    fn free_cables_keep_their_length() {
        let mut layout = CableLayout::new(vec![
            Site::new("Plat", 0., 0.),
            Site::new("T1", 1000., 0.),
            Site::new("T2", 0., 2000.),
        ]);
        layout.price_per_km = 0.;
        let plan = layout.solve_with(SolverKind::Microlp).unwrap();
        assert_eq!(plan.status, OptimizationStatus::Optimal);
        assert_eq!(plan.routes.len(), 2);
        let positions = layout.positions().unwrap();
        for route in &plan.routes {
            let distance = positions[route.from.as_str()].distance(&positions[route.to.as_str()]);
            assert!((route.length_km - distance / 1000.).abs() < 1e-12);
        }
        assert!(plan.total_length_km.is_finite());
        assert!(plan.total_length_km >= 3. - 1e-9);
    }

    #[test]
    fn duplicate_sites_are_rejected() {
        let mut sites = radial_sites();
        sites.push(Site::new("T1", 10., 10.));
        assert_eq!(
            CableLayout::new(sites).routes().unwrap_err(),
            FormulationError::DuplicateNode("T1".to_string())
        );
    }
}
