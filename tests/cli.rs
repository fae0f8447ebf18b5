use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use assert_cmd::Command;
use serde_json::Value;
use tempfile::tempdir;

const OWNERS_CSV: &str = "\
First Name,Last Name,Email,Pet Name
Jane,Doe,jane@x.com,Rex
Sam,,sam@x.com,
";

fn write_input(dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, contents)?;
    Ok(path)
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

#[test]
fn catalog_json_lists_entity_types() -> Result<()> {
    let output = Command::cargo_bin("kennel-import")?
        .args(["catalog", "--json"])
        .output()?;
    assert!(output.status.success());
    let types: Vec<Value> = serde_json::from_slice(&output.stdout)?;
    assert!(types.iter().any(|entry| entry["id"] == "owners"));
    assert!(types.iter().any(|entry| entry["id"] == "pets"));
    Ok(())
}

#[test]
fn map_reports_a_complete_mapping() -> Result<()> {
    let tmp = tempdir()?;
    let input = write_input(tmp.path(), "owners.csv", OWNERS_CSV)?;

    let output = Command::cargo_bin("kennel-import")?
        .args(["map", &path_arg(&input), "--type", "owners", "--type", "pets", "--json"])
        .output()?;
    assert!(
        output.status.success(),
        "stdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    let payload: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(payload["validation"]["isValid"], true);
    assert_eq!(payload["stats"]["propertyCount"], 3);
    assert_eq!(payload["stats"]["associationCount"], 1);
    Ok(())
}

#[test]
fn map_exits_two_when_required_fields_are_missing() -> Result<()> {
    let tmp = tempdir()?;
    let input = write_input(tmp.path(), "owners.csv", "Email,Phone\njo@x.ie,555\n")?;

    let output = Command::cargo_bin("kennel-import")?
        .args(["map", &path_arg(&input), "--type", "owners"])
        .output()?;
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Required field not mapped"));
    assert!(stderr.contains("(firstName)"));
    Ok(())
}

#[test]
fn transform_prints_the_import_request() -> Result<()> {
    let tmp = tempdir()?;
    let input = write_input(tmp.path(), "owners.csv", OWNERS_CSV)?;

    let output = Command::cargo_bin("kennel-import")?
        .args([
            "transform",
            &path_arg(&input),
            "--type",
            "owners",
            "--type",
            "pets",
            "--mode",
            "create-only",
            "--batch-size",
            "1",
        ])
        .output()?;
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let request: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(request["primaryType"], "owners");
    assert_eq!(request["importModes"]["owners"], "create_only");

    let rows = request["rows"].as_array().cloned().unwrap_or_default();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["record"]["firstName"], "Jane");
    assert_eq!(rows[0]["associations"][0]["matchValue"], "Rex");
    assert!(rows[1]["record"].get("lastName").is_none());
    Ok(())
}

#[test]
fn transform_writes_a_report_into_out_dir() -> Result<()> {
    let tmp = tempdir()?;
    let input = write_input(tmp.path(), "owners.csv", OWNERS_CSV)?;
    let reports = tmp.path().join("reports");

    let output = Command::cargo_bin("kennel-import")?
        .args([
            "transform",
            &path_arg(&input),
            "--type",
            "owners",
            "--out",
            &path_arg(&reports),
        ])
        .output()?;
    assert!(output.status.success());

    let written = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
    assert!(written.starts_with(&reports));
    let report: Value = serde_json::from_str(&fs::read_to_string(&written)?)?;
    assert_eq!(report["rowCount"], 2);
    assert_eq!(report["primaryType"], "owners");
    Ok(())
}

#[test]
fn unknown_type_is_an_error() -> Result<()> {
    let tmp = tempdir()?;
    let input = write_input(tmp.path(), "owners.csv", OWNERS_CSV)?;

    let output = Command::cargo_bin("kennel-import")?
        .args(["map", &path_arg(&input), "--type", "unicorns"])
        .output()?;
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error: "));
    Ok(())
}

#[test]
fn failures_are_logged_with_their_error_code() -> Result<()> {
    let tmp = tempdir()?;
    let input = write_input(tmp.path(), "owners.csv", OWNERS_CSV)?;

    let output = Command::cargo_bin("kennel-import")?
        .env("KENNEL_IMPORT_LOG", "kennel_import=info")
        .args(["map", &path_arg(&input), "--type", "unicorns"])
        .output()?;
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains(r#""event":"command_failed""#), "stderr: {stderr}");
    assert!(stderr.contains(r#""code":"IMPORT/UNKNOWN_ENTITY_TYPE""#), "stderr: {stderr}");
    Ok(())
}

#[test]
fn missing_input_is_logged_as_a_dataset_error() -> Result<()> {
    let tmp = tempdir()?;
    let missing = tmp.path().join("nowhere.csv");

    let output = Command::cargo_bin("kennel-import")?
        .env("KENNEL_IMPORT_LOG", "kennel_import=info")
        .args(["map", &path_arg(&missing), "--type", "owners"])
        .output()?;
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains(r#""code":"DATASET/IO""#), "stderr: {stderr}");
    Ok(())
}
