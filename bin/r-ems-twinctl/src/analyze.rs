//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Operator CLI for asset health analysis and timeline playback."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use r_ems_asset_health::io::{load_record_from_file, load_records_from_jsonl};
use r_ems_asset_health::model::{AssetClass, ParamValue};
use r_ems_asset_health::thresholds::ThresholdEvaluator;
use r_ems_asset_health::{analyze_record, AssetCatalog};
use r_ems_common::AppConfig;
use serde_json::json;
use tracing::{info, warn};

#[derive(Debug, Args)]
pub struct AnalyzeCommand {
    /// Simulation record file (JSON or YAML).
    #[arg(value_name = "FILE")]
    record: PathBuf,

    /// Read the file as JSON Lines, one record per line.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    jsonl: bool,

    /// Pretty-print each summary instead of one JSON object per line.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pretty: bool,
}

#[derive(Debug, Args)]
pub struct EvaluateCommand {
    /// Asset class, e.g. transformer or circuitBreaker.
    #[arg(long = "class", value_name = "CLASS")]
    class: AssetClass,

    /// Parameter key as it appears in simulation states.
    #[arg(value_name = "PARAMETER")]
    parameter: String,

    /// Raw reading.
    #[arg(value_name = "VALUE", allow_hyphen_values = true)]
    value: String,
}

/// Built-in catalog, merged with the configured override file when present.
pub fn load_catalog(config: &AppConfig) -> Result<AssetCatalog> {
    let overrides = config.analytics.catalog_path.as_deref();
    AssetCatalog::load(overrides).with_context(|| match overrides {
        Some(path) => format!("unable to load asset catalog overrides {}", path.display()),
        None => "built-in asset catalog is invalid".to_string(),
    })
}

impl AnalyzeCommand {
    pub fn execute(self, config: &AppConfig) -> Result<()> {
        let catalog = load_catalog(config)?;
        let records = if self.jsonl {
            load_records_from_jsonl(&self.record)
        } else {
            load_record_from_file(&self.record).map(|record| vec![record])
        }
        .with_context(|| format!("unable to load records from {}", self.record.display()))?;
        info!(path = %self.record.display(), records = records.len(), "analyzing records");

        let stdout = io::stdout();
        let mut out = stdout.lock();
        for (index, record) in records.iter().enumerate() {
            let summary = analyze_record(&catalog, &config.analytics, record).with_context(|| {
                format!(
                    "record {} ({}) could not be analyzed",
                    index,
                    record.id.as_deref().unwrap_or("unnamed")
                )
            })?;
            if self.pretty {
                serde_json::to_writer_pretty(&mut out, &summary)?;
            } else {
                serde_json::to_writer(&mut out, &summary)?;
            }
            writeln!(out)?;
        }
        out.flush()?;
        Ok(())
    }
}

impl EvaluateCommand {
    pub fn execute(self, config: &AppConfig) -> Result<()> {
        let catalog = load_catalog(config)?;
        let raw = ParamValue::from(self.value.as_str());
        let Some(value) = raw.as_number() else {
            bail!("value {:?} is not numeric", self.value);
        };
        let threshold = catalog.threshold(self.class, &self.parameter);
        if threshold.is_none() {
            warn!(class = %self.class, parameter = %self.parameter, "no threshold configured; reporting normal");
        }
        let severity = ThresholdEvaluator::new(&catalog).evaluate(self.class, &self.parameter, &raw, value);

        let output = json!({
            "assetClass": self.class,
            "parameter": self.parameter,
            "value": value,
            "severity": severity,
            "threshold": threshold,
        });
        println!("{}", serde_json::to_string(&output)?);
        Ok(())
    }
}
