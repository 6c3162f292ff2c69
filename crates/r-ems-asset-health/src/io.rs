//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Asset health analytics for simulated equipment timelines."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::{fs, io::BufRead, path::Path};

use tracing::debug;

use crate::{
    errors::{AnalyticsError, Result},
    model::SimulationRecord,
};

fn parse_record(data: &str) -> Result<SimulationRecord> {
    let record: SimulationRecord = if data.trim_start().starts_with('{') {
        serde_json::from_str(data)?
    } else {
        serde_yaml::from_str(data).map_err(AnalyticsError::YamlSerializationFailed)?
    };
    record.validate()?;
    Ok(record)
}

/// Load a single simulation record from a JSON or YAML file.
pub fn load_record_from_file(path: impl AsRef<Path>) -> Result<SimulationRecord> {
    let path = path.as_ref();
    debug!(record_path = %path.display(), "loading simulation record");
    parse_record(&fs::read_to_string(path)?)
}

/// Load one record per non-empty line.
pub fn load_records_from_jsonl(path: impl AsRef<Path>) -> Result<Vec<SimulationRecord>> {
    let file = fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: SimulationRecord = serde_json::from_str(&line)?;
        record.validate()?;
        records.push(record);
    }
    Ok(records)
}
