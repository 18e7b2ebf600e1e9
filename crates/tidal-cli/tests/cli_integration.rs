//! End-to-end tests that invoke the compiled `tidal` binary.

use std::path::Path;
use std::process::{Command, Output};

fn tidal_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tidal"))
}

fn run(args: &[&str]) -> Output {
    tidal_bin().args(args).output().expect("run binary")
}

fn stdout_of(output: &Output) -> String {
    assert!(
        output.status.success(),
        "tidal should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn json_of(output: &Output) -> serde_json::Value {
    serde_json::from_str(&stdout_of(output)).expect("stdout is JSON")
}

fn write_table(dir: &Path) -> String {
    let path = dir.join("cars.json");
    std::fs::write(
        &path,
        r#"{"name": ["a", "b", "c", "d"], "cyl": [4, 6, 8, 4], "mpg": [30.5, 20, 15, null]}"#,
    )
    .expect("write table");
    path.to_str().unwrap().to_string()
}

#[test]
fn cli_eval_prints_value() {
    let output = run(&["eval", "sum(c(1, 2, 3)) * 2"]);
    assert_eq!(stdout_of(&output).trim(), "12");
}

#[test]
fn cli_eval_with_let_bindings() {
    let output = run(&["eval", "--let", "n=4", "--let", "m = n + 1", "paste(n, m, sep = '-')"]);
    assert_eq!(stdout_of(&output).trim(), r#""4-5""#);
}

#[test]
fn cli_eval_reports_unbound_symbol() {
    let output = run(&["eval", "missing_thing + 1"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("object 'missing_thing' not found"),
        "stderr: {}",
        stderr
    );
}

#[test]
fn cli_run_script() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let file = dir.path().join("script.td");
    std::fs::write(
        &file,
        r#"
        # closures capture their arguments lazily
        show <- function(x) substitute(x)
        twice <- function(v) v * 2
        out <- twice(21)
        out
        "#,
    )
    .expect("write source");

    let output = run(&["run", file.to_str().unwrap()]);
    assert_eq!(stdout_of(&output).trim(), "42");
}

#[test]
fn cli_run_top_level_substitute_quotes() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let file = dir.path().join("top.td");
    std::fs::write(&file, "a <- 1\nsubstitute(a + 1)\n").expect("write source");

    let output = run(&["run", file.to_str().unwrap()]);
    assert_eq!(stdout_of(&output).trim(), "a + 1");

    let output = run(&["eval", "--let", "a=1", "substitute(a + 1)"]);
    assert_eq!(stdout_of(&output).trim(), "a + 1");
}

#[test]
fn cli_parse_pretty_and_json() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let file = dir.path().join("p.td");
    std::fs::write(&file, "x <- a + b * 2\n").expect("write source");

    let pretty = run(&["parse", file.to_str().unwrap()]);
    assert_eq!(stdout_of(&pretty).trim(), "x <- a + b * 2");

    let json = run(&["parse", "--format", "json", file.to_str().unwrap()]);
    let value = json_of(&json);
    assert!(value.is_array(), "json: {}", value);
    assert_eq!(value.as_array().map(Vec::len), Some(1));
}

#[test]
fn cli_filter_table() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let table = write_table(dir.path());
    let output = run(&["filter", &table, "cyl == 4"]);
    let json = json_of(&output);
    assert_eq!(json["name"], serde_json::json!(["a", "d"]));
    assert_eq!(json["mpg"], serde_json::json!([30.5, null]));
}

#[test]
fn cli_filter_uses_let_bindings_for_free_variables() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let table = write_table(dir.path());
    let output = run(&["filter", &table, "cyl > limit", "--let", "limit=5"]);
    assert_eq!(json_of(&output)["name"], serde_json::json!(["b", "c"]));
}

#[test]
fn cli_arrange_desc() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let table = write_table(dir.path());
    let output = run(&["arrange", &table, "desc(mpg)"]);
    assert_eq!(json_of(&output)["name"], serde_json::json!(["a", "b", "c", "d"]));
    let output = run(&["arrange", &table, "cyl", "desc(name)"]);
    assert_eq!(json_of(&output)["name"], serde_json::json!(["d", "a", "b", "c"]));
}

#[test]
fn cli_mutate_is_sequential() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let table = write_table(dir.path());
    let output = run(&["mutate", &table, "c2 = cyl * cyl", "c3 = c2 * cyl"]);
    let json = json_of(&output);
    assert_eq!(json["c2"], serde_json::json!([16, 36, 64, 16]));
    assert_eq!(json["c3"], serde_json::json!([64, 216, 512, 64]));
}

#[test]
fn cli_transform_is_simultaneous() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let table = write_table(dir.path());
    let output = run(&["transform", &table, "c2 = cyl * cyl", "c3 = c2 * cyl"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("object 'c2' not found"), "stderr: {}", stderr);
}

#[test]
fn cli_summarise_grouped() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let table = write_table(dir.path());
    let output = run(&[
        "summarise",
        &table,
        "n = length(name)",
        "best = max(mpg, na.rm = TRUE)",
        "--by",
        "cyl",
    ]);
    let json = json_of(&output);
    assert_eq!(json["cyl"], serde_json::json!([4, 6, 8]));
    assert_eq!(json["n"], serde_json::json!([2, 1, 1]));
    assert_eq!(json["best"], serde_json::json!([30.5, 20.0, 15.0]));
}

#[test]
fn cli_rejects_oversized_source() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let file = dir.path().join("big.td");
    std::fs::write(&file, "1\n".repeat(600_000)).expect("write source");
    let output = run(&["run", file.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("exceeds"), "stderr: {}", stderr);
}
