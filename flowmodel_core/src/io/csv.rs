//! CSV site tables and route exports
use std::fs::File;
use std::path::Path;

use crate::formulations::cable_layout::{CableLayout, CableLayoutPlan, Site};
use crate::io::IoError;

/// Read a `Name,Easting,Northing` site table
pub fn read_sites<P: AsRef<Path>>(path: P) -> Result<Vec<Site>, IoError> {
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);
    let mut sites = Vec::new();
    for result in reader.deserialize() {
        let site: Site = result?;
        sites.push(site);
    }
    Ok(sites)
}

/// Write the installed cables of a plan as `from,to,length_km,flow,cost` rows
pub fn write_routes<P: AsRef<Path>>(plan: &CableLayoutPlan, path: P) -> Result<(), IoError> {
    let mut writer = csv::Writer::from_path(path)?;
    for route in &plan.routes {
        writer.serialize(route)?;
    }
    writer.flush()?;
    Ok(())
}

impl CableLayout {
    /// Layout with default parameters over the sites of a CSV table
    pub fn from_sites_csv<P: AsRef<Path>>(path: P) -> Result<Self, IoError> {
        let layout = CableLayout::new(read_sites(path)?);
        layout.validate()?;
        Ok(layout)
    }
}
