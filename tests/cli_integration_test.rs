use assert_cmd::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn qualitymap(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_qualitymap"));
    cmd.current_dir(dir).env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

fn write_project(dir: &Path) {
    fs::create_dir_all(dir.join("src/app")).unwrap();
    fs::write(dir.join("src/app/__init__.py"), "").unwrap();
    fs::write(dir.join("src/app/main.py"), "from app import models\n").unwrap();
    fs::write(dir.join("src/app/models.py"), "import dataclasses\n").unwrap();
    fs::create_dir_all(dir.join("signals")).unwrap();
}

#[test]
fn test_report_command_prints_summary_table() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path());
    fs::write(
        dir.path().join("signals/type_safety.txt"),
        "Success: no issues found in 3 source files\n",
    )
    .unwrap();

    let output = qualitymap(dir.path())
        .args(["report", "src", "--project", "Demo", "--no-charts", "-j", "2"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Type Safety"));
    assert!(stdout.contains("Dependency Graph"));
    assert!(stdout.contains("Overall: Pass"));

    let summary = fs::read_to_string(dir.path().join("quality-report/summary.md")).unwrap();
    assert!(summary.contains("Demo"));
    assert!(dir.path().join("quality-report/assets/data/summary.json").is_file());
}

#[test]
fn test_fail_on_error_sets_exit_code() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path());
    fs::write(
        dir.path().join("signals/type_safety.txt"),
        "src/app/main.py:4: error: Name \"x\" is not defined  [name-defined]\n",
    )
    .unwrap();

    qualitymap(dir.path())
        .args(["report", "src", "--categories", "type_safety"])
        .assert()
        .success();

    qualitymap(dir.path())
        .args(["report", "src", "--categories", "type_safety", "--fail-on-error"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_unknown_category_is_usage_error() {
    let dir = TempDir::new().unwrap();
    qualitymap(dir.path())
        .args(["report", "--categories", "coverage"])
        .assert()
        .failure();
}

#[test]
fn test_init_creates_config_once() {
    let dir = TempDir::new().unwrap();

    qualitymap(dir.path()).arg("init").assert().success();
    assert!(dir.path().join(".qualitymap.toml").is_file());

    qualitymap(dir.path()).arg("init").assert().failure();
    qualitymap(dir.path()).args(["init", "--force"]).assert().success();
}

#[test]
fn test_config_file_overrides_signal_names() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path());
    fs::write(
        dir.path().join(".qualitymap.toml"),
        "[signals]\ncomplexity = \"flake8.log\"\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("signals/flake8.log"),
        "src/app/main.py:1:1: C901 'run' is too complex (18)\n",
    )
    .unwrap();

    qualitymap(dir.path())
        .args(["report", "src", "--categories", "complexity", "--no-charts"])
        .assert()
        .success();

    let data =
        fs::read_to_string(dir.path().join("quality-report/assets/data/complexity.json")).unwrap();
    assert!(data.contains("\"total_violations\": 1"));
}
