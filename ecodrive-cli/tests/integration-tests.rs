use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::{CommandCargoExt, OutputAssertExt};
use predicates::prelude::predicate;

fn asset(name: &str) -> PathBuf {
    let mut path = project_root::get_project_root().unwrap();
    path.push(Path::new("ecodrive-core/tests/assets"));
    path.push(name);
    let path = path.canonicalize().unwrap();
    assert!(path.exists());
    path
}

#[test]
fn test_that_cli_app_produces_summary() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("ecodrive-cli")?;
    let scenario_file = asset("uphill_mid_sweep.yaml");
    cmd.args(["--scenario-file", scenario_file.to_str().unwrap()]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("current speed: 15 m/s"))
        .stdout(predicate::str::contains("acceleration limit exceeded"))
        .stdout(predicate::str::contains("best next speed:"));
    Ok(())
}

#[test]
fn test_that_cli_app_produces_json() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("ecodrive-cli")?;
    let scenario_file = asset("cruise_final_stage.yaml");
    cmd.args([
        "--scenario-file",
        scenario_file.to_str().unwrap(),
        "--res-fmt",
        "json",
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"infeasible\":\"accel_limit\""))
        .stdout(predicate::str::contains("\"regen_mode\":\"rear\""));
    Ok(())
}

#[test]
fn test_that_cli_app_requires_scenario() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("ecodrive-cli")?;
    cmd.assert().failure();
    let mut cmd = Command::cargo_bin("ecodrive-cli")?;
    cmd.args(["--scenario-file", "does-not-exist.yaml"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
    Ok(())
}
