//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Operator CLI for asset health analysis and timeline playback."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

const TRANSFORMER_JSON: &str = r#"{
    "id": "tx-12",
    "componentType": "transformer",
    "timeline": [
        {"time": 0, "state": {"oilTemperature": 62, "loading": 70, "windingTemperature": 75}},
        {"time": 1, "state": {"oilTemperature": 71, "loading": 82, "windingTemperature": 88}},
        {"time": 2, "state": {"oilTemperature": 80, "loading": 95, "windingTemperature": 99}},
        {"time": 3, "state": {"oilTemperature": 88, "loading": 104, "windingTemperature": 110}}
    ]
}"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("twin.toml"),
            "[logging]\nfile = false\n\n[playback]\nframe_interval_ms = 20\n",
        )
        .unwrap();
        fs::write(dir.path().join("tx.json"), TRANSFORMER_JSON).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("r-ems-twinctl").unwrap();
        cmd.current_dir(self.dir.path())
            .env_remove("R_EMS_CONFIG")
            .arg("--config")
            .arg(self.path("twin.toml"));
        cmd
    }
}

fn stdout_lines(output: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(output)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn read_json(path: &Path) -> Value {
    serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
}

#[test]
fn evaluate_prints_the_severity() {
    let ws = Workspace::new();
    let output = ws
        .command()
        .args(["evaluate", "--class", "transformer", "oilTemperature", "96"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["severity"], "critical");
    assert_eq!(lines[0]["assetClass"], "transformer");
}

#[test]
fn evaluate_rejects_non_numeric_values() {
    let ws = Workspace::new();
    ws.command()
        .args(["evaluate", "--class", "transformer", "oilTemperature", "hot"])
        .assert()
        .failure();
}

#[test]
fn analyze_prints_one_summary_per_record() {
    let ws = Workspace::new();
    let output = ws
        .command()
        .arg("analyze")
        .arg(ws.path("tx.json"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["recordId"], "tx-12");
    assert_eq!(lines[0]["assetClass"], "transformer");
    assert_eq!(lines[0]["severities"]["oilTemperature"], "high");
    assert_eq!(lines[0]["faults"][0]["faultType"], "Winding Hotspot");
    assert_eq!(lines[0]["faults"][0]["severity"], "high");
    assert_eq!(lines[0]["impactFactors"][0]["parameter"], "oilTemperature");
}

#[test]
fn simulated_playback_streams_events_until_completion() {
    let ws = Workspace::new();
    let report = ws.path("report.json");
    let output = ws
        .command()
        .arg("playback")
        .arg(ws.path("tx.json"))
        .args(["--simulated", "--duration-ms", "400", "--report"])
        .arg(&report)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let events = stdout_lines(&output);
    assert!(events.len() >= 3);
    assert_eq!(events.last().unwrap()["event"], "completed");
    assert!(events
        .iter()
        .filter(|event| event["event"] == "progress")
        .all(|event| event["progress"].as_f64().is_some_and(|p| (0.0..=1.0).contains(&p))));

    let report = read_json(&report);
    assert_eq!(report["playback"]["state"], "completed");
    assert_eq!(report["playback"]["events"].as_u64(), Some(events.len() as u64));
    assert!(report["capture"].is_null());
}

#[test]
fn playback_with_unavailable_capture_still_completes() {
    let ws = Workspace::new();
    let report = ws.path("report.json");
    ws.command()
        .arg("playback")
        .arg(ws.path("tx.json"))
        .args(["--simulated", "--capture", "--duration-ms", "100", "--report"])
        .arg(&report)
        .assert()
        .success();

    let report = read_json(&report);
    assert_eq!(report["playback"]["state"], "completed");
    assert_eq!(report["capture"]["outcome"], "fallback");
    assert_eq!(report["capture"]["backend"], "none");
}
