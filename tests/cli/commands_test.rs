//! Binary-level tests for commands that fail or finish before any warehouse
//! call.

use std::fs;

use serde_json::Value;
use tempfile::TempDir;

use super::common::run;

fn config(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_classify_prints_inspection() {
    let dir = TempDir::new().unwrap();
    let path = config(&dir, "[exclusions]\npatterns = [\"^HR\\\\.\"]\n");

    let (code, stdout, _) = run(&path, &["classify", "SELECT * FROM HR.PAYROLL.SALARIES"]);
    assert_eq!(code, 0);

    let json: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["classification"]["type"], "data");
    assert_eq!(json["objects"][0], "HR.PAYROLL.SALARIES");
    assert_eq!(json["exclusions"][0]["isExcluded"], true);
}

#[test]
fn test_excluded_query_prints_envelope() {
    let dir = TempDir::new().unwrap();
    let path = config(&dir, "[exclusions]\npatterns = [\"^HR\\\\.\"]\n");

    let (code, stdout, _) = run(&path, &["query", "SELECT * FROM HR.PAYROLL.SALARIES"]);
    assert_eq!(code, 1);

    let json: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["code"], "EXCLUDED_OBJECT");
}

#[test]
fn test_missing_cli_binary_is_cli_error() {
    let dir = TempDir::new().unwrap();
    let path = config(&dir, "[cli]\nbinary = \"/nonexistent/snow\"\n");

    let (code, stdout, _) = run(&path, &["query", "SELECT 1"]);
    assert_eq!(code, 1);

    let json: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["code"], "CLI_ERROR");
}

#[test]
fn test_invalid_config_is_invalid_input() {
    let dir = TempDir::new().unwrap();
    let path = config(&dir, "[exclusions]\npatterns = [\"([unclosed\"]\n");

    let (code, stdout, _) = run(&path, &["classify", "SELECT 1"]);
    assert_eq!(code, 1);

    let json: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["code"], "INVALID_INPUT");
}
