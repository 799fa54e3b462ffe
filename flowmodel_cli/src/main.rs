use anyhow::{bail, Context};
use clap::Parser;
use flowmodel_core::configuration::{read_configuration, Configuration};
use flowmodel_core::formulations::cable_layout::{CableLayout, CableLayoutPlan};
use flowmodel_core::formulations::transportation::{TransportationPlan, TransportationProblem};
use flowmodel_core::formulations::workforce::{WorkforceProblem, WorkforceSchedule};
use flowmodel_core::io::csv::{read_sites, write_routes};
use flowmodel_core::optimize::OptimizationStatus;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

mod cli;

use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let mut config = match &cli.config {
        Some(path) => Configuration::read_json(path)
            .with_context(|| format!("reading configuration {}", path.display()))?,
        None => Configuration::default(),
    };
    if let Some(solver) = cli.solver {
        config.solver = solver;
    }
    config.install();
    info!(solver = %read_configuration().solver, "configuration loaded");

    let status = match &cli.command {
        Commands::Transport { instance } => {
            let problem = match instance {
                Some(path) => TransportationProblem::read_json(path)
                    .with_context(|| format!("reading instance {}", path.display()))?,
                None => TransportationProblem::default_instance(),
            };
            let plan = problem.solve()?;
            report(&plan, cli.json, print_transportation)?;
            plan.status
        }
        Commands::CableLayout {
            instance,
            sites,
            platform,
            max_length_km,
            forbid_crossings,
            routes_csv,
        } => {
            let mut layout = match (instance, sites) {
                (Some(path), _) => CableLayout::read_json(path)
                    .with_context(|| format!("reading instance {}", path.display()))?,
                (None, Some(path)) => CableLayout::new(
                    read_sites(path).with_context(|| format!("reading sites {}", path.display()))?,
                ),
                (None, None) => bail!("cable-layout needs either --instance or --sites"),
            };
            if let Some(platform) = platform {
                layout.platform = platform.clone();
            }
            layout.validate()?;
            if let Some(max_length_km) = max_length_km {
                layout.max_length_km = *max_length_km;
            }
            layout.forbid_crossings |= *forbid_crossings;
            let plan = layout.solve()?;
            if let Some(path) = routes_csv {
                write_routes(&plan, path)
                    .with_context(|| format!("writing routes {}", path.display()))?;
            }
            report(&plan, cli.json, print_cable_layout)?;
            plan.status
        }
        Commands::Workforce { instance } => {
            let problem = match instance {
                Some(path) => WorkforceProblem::read_json(path)
                    .with_context(|| format!("reading instance {}", path.display()))?,
                None => WorkforceProblem::default_instance(),
            };
            let schedule = problem.solve()?;
            report(&schedule, cli.json, print_workforce)?;
            schedule.status
        }
    };

    if status != OptimizationStatus::Optimal {
        warn!(%status, "no optimal solution");
        bail!("solver finished with status: {status}");
    }
    Ok(())
}

fn report<T: Serialize>(result: &T, json: bool, print: fn(&T)) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        print(result);
    }
    Ok(())
}

fn print_transportation(plan: &TransportationPlan) {
    println!("status: {}", plan.status);
    for shipment in &plan.shipments {
        println!(
            "flow[{},{}] = {}",
            shipment.source, shipment.destination, shipment.amount
        );
    }
    if let Some(cost) = plan.total_cost {
        println!("total cost: {:.2}", cost);
    }
}

fn print_cable_layout(plan: &CableLayoutPlan) {
    println!("status: {}", plan.status);
    for route in &plan.routes {
        println!(
            "{} -> {}: {:.3} km, {} MW",
            route.from, route.to, route.length_km, route.flow
        );
    }
    println!("total length: {:.3} km", plan.total_length_km);
    if let Some(cost) = plan.total_cost {
        println!("total cost: {:.2}", cost);
    }
}

fn print_workforce(schedule: &WorkforceSchedule) {
    println!("status: {}", schedule.status);
    for (shift, temps) in &schedule.temps {
        let workers = schedule
            .assignments
            .get(shift)
            .map(|w| w.join(", "))
            .unwrap_or_default();
        println!("{}: [{}] temps: {}", shift, workers, temps);
    }
    for (worker, workload) in &schedule.workloads {
        println!("workload[{}] = {}", worker, workload);
    }
    if let Some(temps) = schedule.total_temps {
        println!("total temps: {:.2}", temps);
    }
    if let Some(gap) = schedule.fairness_gap {
        println!("fairness gap: {:.2}", gap);
    }
    println!("total pay: {:.2}", schedule.total_pay);
}
