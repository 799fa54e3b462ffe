//! JSON instance files and result documents
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::formulations::cable_layout::CableLayout;
use crate::formulations::transportation::TransportationProblem;
use crate::formulations::workforce::WorkforceProblem;
use crate::io::IoError;

/// Read any deserializable value from a JSON file
pub fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, IoError> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// Write a value to a JSON file, pretty printed
pub fn write_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<(), IoError> {
    let data = serde_json::to_string_pretty(value)?;
    fs::write(path, data)?;
    Ok(())
}

impl TransportationProblem {
    /// Read and validate a transportation instance
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Self, IoError> {
        let instance: Self = read_json(path)?;
        instance.validate()?;
        Ok(instance)
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), IoError> {
        write_json(self, path)
    }
}

impl WorkforceProblem {
    /// Read and validate a workforce instance
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Self, IoError> {
        let instance: Self = read_json(path)?;
        instance.validate()?;
        Ok(instance)
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), IoError> {
        write_json(self, path)
    }
}

impl CableLayout {
    /// Read and validate a cable layout instance
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Self, IoError> {
        let instance: Self = read_json(path)?;
        instance.validate()?;
        Ok(instance)
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), IoError> {
        write_json(self, path)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::formulations::FormulationError;

    fn instance_path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("test_data")
            .join("instances")
            .join(name)
    }

    #[test]
    fn read_transportation() {
        let instance = TransportationProblem::read_json(instance_path("transportation.json")).unwrap();
        assert_eq!(instance, TransportationProblem::default_instance());
    }

    #[test]
    fn read_workforce() {
        let instance = WorkforceProblem::read_json(instance_path("workforce.json")).unwrap();
        assert_eq!(instance, WorkforceProblem::default_instance());
    }

    #[test]
    fn read_cable_layout() {
        let layout = CableLayout::read_json(instance_path("cable_layout.json")).unwrap();
        assert_eq!(layout.platform, "Plat");
        assert_eq!(layout.sites.len(), 9);
        // Omitted parameters take their defaults
        assert!((layout.cable_capacity - 65.).abs() < 1e-25);
        assert!((layout.max_length_km - 10.).abs() < 1e-25);
        assert!(!layout.forbid_crossings);
    }

    #[test]
    fn round_trip_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workforce.json");
        let instance = WorkforceProblem::default_instance();
        instance.write_json(&path).unwrap();
        assert_eq!(WorkforceProblem::read_json(&path).unwrap(), instance);
    }

    #[test]
    fn invalid_instance_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workforce.json");
        let mut instance = WorkforceProblem::default_instance();
        instance
            .availability
            .push(("Zed".to_string(), "Mon1".to_string()));
        write_json(&instance, &path).unwrap();
        match WorkforceProblem::read_json(&path) {
            Err(IoError::Instance(FormulationError::UnknownWorker(worker))) => {
                assert_eq!(worker, "Zed")
            }
            other => panic!("Expected an unknown worker error, got {:?}", other),
        }
    }

    #[test]
    fn missing_file() {
        match TransportationProblem::read_json(instance_path("missing.json")) {
            Err(IoError::File(_)) => {}
            other => panic!("Expected a file error, got {:?}", other),
        }
    }
}
