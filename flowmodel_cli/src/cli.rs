use std::path::PathBuf;

use clap::{Parser, Subcommand};
use flowmodel_core::optimize::solvers::SolverKind;

#[derive(Parser, Debug)]
#[command(author, version, about = "Build and solve network flow and scheduling models", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    /// Solver backend (microlp, clarabel, highs), overrides the configuration file
    #[arg(long)]
    pub solver: Option<SolverKind>,

    /// JSON file overriding the default configuration
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the result as JSON instead of text
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ship goods from supply nodes to demand nodes at minimum cost
    Transport {
        /// JSON instance, the built-in textbook instance is used if omitted
        #[arg(long)]
        instance: Option<PathBuf>,
    },
    /// Lay out the cables of an offshore wind farm at minimum cost
    CableLayout {
        /// JSON layout instance
        #[arg(long, conflicts_with = "sites")]
        instance: Option<PathBuf>,
        /// CSV site table with Name,Easting,Northing columns
        #[arg(long)]
        sites: Option<PathBuf>,
        /// Name of the collection platform
        #[arg(long)]
        platform: Option<String>,
        /// Routes at least this long (km) are not allowed
        #[arg(long)]
        max_length_km: Option<f64>,
        /// Forbid installing cables that cross each other
        #[arg(long)]
        forbid_crossings: bool,
        /// Write the installed cables to a CSV file
        #[arg(long)]
        routes_csv: Option<PathBuf>,
    },
    /// Schedule workers on shifts, minimizing temps then workload imbalance
    Workforce {
        /// JSON instance, the built-in two week instance is used if omitted
        #[arg(long)]
        instance: Option<PathBuf>,
    },
}
