//! End-to-end tests for the `gf` binary.
//!
//! Each test runs the real binary against files in a temporary directory,
//! with `GRIDFILTER_CONFIG` pointing at a config that keeps presets and the
//! result cache inside that directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{json, Value};
use tempfile::TempDir;

struct CliEnv {
    dir: TempDir,
}

impl CliEnv {
    fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let config = format!(
            "[persistent]\nenabled = true\npath = {:?}\n\n[presets]\npath = {:?}\n",
            dir.path().join("results.json"),
            dir.path().join("presets.json"),
        );
        fs::write(dir.path().join("config.toml"), config).unwrap();

        let env = Self { dir };
        env.write(
            "people.json",
            &json!([
                { "name": "Jon", "age": 30, "city": "Oslo" },
                { "name": "Jane", "age": 25, "city": "Bergen" },
                { "name": "Jo", "age": 30, "city": "Oslo" },
                { "name": "Bob", "age": 12, "city": "Oslo" }
            ]),
        );
        env
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, value: &Value) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
        path
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_gf"))
            .args(args)
            .env("GRIDFILTER_CONFIG", self.path("config.toml"))
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .current_dir(self.dir.path())
            .output()
            .expect("failed to run gf")
    }

    fn run_json(&self, args: &[&str]) -> Value {
        let mut full = vec!["--json"];
        full.extend_from_slice(args);
        let output = self.run(&full);
        assert!(
            output.status.success(),
            "gf {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("stdout is JSON")
    }
}

fn names(output: &Value) -> Vec<&str> {
    output["rows"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["name"].as_str())
        .collect()
}

fn as_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_filter_with_inline_model() {
    let env = CliEnv::new();
    let output = env.run_json(&[
        "filter",
        "people.json",
        "--filter",
        r#"{"age": {"condition1": {"type": "number", "operator": "equals", "filter": 30}}}"#,
    ]);

    assert_eq!(names(&output), vec!["Jon", "Jo"]);
    assert_eq!(output["matched"], 2);
    assert_eq!(output["total"], 4);
}

#[test]
fn test_filter_quick_and_limit() {
    let env = CliEnv::new();
    let output = env.run_json(&["filter", "people.json", "--quick", "oslo", "--limit", "2"]);

    assert_eq!(names(&output), vec!["Jon", "Jo"]);
    assert_eq!(output["matched"], 3);
}

#[test]
fn test_filter_table_output() {
    let env = CliEnv::new();
    let output = env.run(&["filter", "people.json", "--quick", "jane", "--columns", "name,city"]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "name  city");
    assert_eq!(lines[1], "Jane  Bergen");
    assert!(stdout.contains("1 of 4 rows match"));
}

#[test]
fn test_filter_reads_exported_envelope() {
    let env = CliEnv::new();
    let envelope = env.write(
        "export.json",
        &json!({
            "filterModel": {
                "name": { "condition1": { "type": "text", "operator": "startsWith", "filter": "j" } }
            },
            "quickFilter": "bergen",
            "timestamp": "2025-01-01T00:00:00Z",
            "version": "1.0"
        }),
    );

    let output = env.run_json(&["filter", "people.json", "--model", as_str(&envelope)]);
    assert_eq!(names(&output), vec!["Jane"]);
}

#[test]
fn test_preset_lifecycle() {
    let env = CliEnv::new();
    let model = env.write(
        "adults.json",
        &json!({
            "age": { "condition1": { "type": "number", "operator": "greaterThanOrEqual", "filter": 18 } }
        }),
    );

    let saved = env.run_json(&[
        "presets",
        "save",
        "adults",
        "--model",
        as_str(&model),
        "--tag",
        "people",
    ]);
    assert_eq!(saved["status"], "saved");

    let listed = env.run_json(&["presets", "list"]);
    assert_eq!(listed["presets"][0]["name"], "adults");
    assert_eq!(listed["presets"][0]["tags"][0], "people");

    let applied = env.run_json(&["presets", "apply", "adults", "people.json"]);
    assert_eq!(names(&applied), vec!["Jon", "Jane", "Jo"]);

    let deleted = env.run_json(&["presets", "delete", "adults"]);
    assert_eq!(deleted["status"], "deleted");
    let deleted = env.run_json(&["presets", "delete", "adults"]);
    assert_eq!(deleted["status"], "not_found");
}

#[test]
fn test_missing_preset_suggests_name() {
    let env = CliEnv::new();
    let model = env.write("empty.json", &json!({}));
    env.run_json(&["presets", "save", "adults", "--model", as_str(&model)]);

    let output = env.run(&["--json", "presets", "apply", "adlts", "people.json"]);
    assert_eq!(output.status.code(), Some(4));

    let error: Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(error["error"]["code"], "PRESET_NOT_FOUND");
    assert!(error["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Did you mean 'adults'?"));
}

#[test]
fn test_malformed_filter_exit_code() {
    let env = CliEnv::new();
    let output = env.run(&[
        "filter",
        "people.json",
        "--filter",
        r#"{"age": {"condition1": {"type": "number", "operator": "equals", "filter": 1}, "condition2": {"type": "number", "operator": "equals", "filter": 2}}}"#,
    ]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.starts_with("Error: malformed filter on column 'age'"));
}

#[test]
fn test_bad_data_file() {
    let env = CliEnv::new();
    env.write("bad.json", &json!({ "not": "rows" }));

    let output = env.run(&["--json", "filter", "bad.json"]);
    assert_eq!(output.status.code(), Some(1));
    let error: Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(error["error"]["code"], "INPUT_ERROR");

    let output = env.run(&["filter", "missing.json"]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_cache_clear_removes_result_store() {
    let env = CliEnv::new();
    fs::write(env.path("results.json"), r#"{"entries": {}}"#).unwrap();

    let output = env.run_json(&["cache", "clear"]);
    assert_eq!(output["removed"], true);
    assert!(!env.path("results.json").exists());

    let output = env.run_json(&["cache", "clear"]);
    assert_eq!(output["removed"], false);
}

#[test]
fn test_config_path_and_show() {
    let env = CliEnv::new();

    let output = env.run(&["config", "path"]);
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.trim(), as_str(&env.path("config.toml")));

    let shown = env.run_json(&["config", "show"]);
    assert_eq!(shown["exists"], true);
    assert_eq!(shown["config"]["persistent"]["enabled"], true);
    assert_eq!(shown["config"]["cache"]["max_entries"], 100);
}

#[test]
fn test_config_init_into_new_location() {
    let env = CliEnv::new();
    let target = env.path("fresh/config.toml");

    let output = env.run(&["--config", as_str(&target), "config", "init"]);
    assert!(output.status.success());
    assert!(target.exists());

    let output = env.run(&["--config", as_str(&target), "config", "init"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_completions() {
    let env = CliEnv::new();
    let output = env.run(&["completions", "bash"]);

    assert!(output.status.success());
    assert!(String::from_utf8(output.stdout).unwrap().contains("gf"));
}
