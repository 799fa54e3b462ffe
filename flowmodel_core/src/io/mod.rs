//! Module for reading instances and writing results
pub mod csv;
pub mod json;

use thiserror::Error;

use crate::formulations::FormulationError;

/// Errors raised while reading or writing files
#[derive(Error, Debug)]
pub enum IoError {
    /// Error when a file can't be read or written
    #[error("Unable to access file: {0}")]
    File(#[from] std::io::Error),
    /// Error when a JSON document can't be parsed or produced
    #[error("Unable to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Error when a CSV table can't be parsed
    #[error("Unable to parse CSV: {0}")]
    Csv(#[from] ::csv::Error),
    /// Error when the file parsed but describes an invalid instance
    #[error("Invalid instance: {0}")]
    Instance(#[from] FormulationError),
}
