// Integration tests for the `tgrid` binary.
// Run with: cargo test -p tabgrid-cli --test cli_tests -- --nocapture

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

const SAMPLE: &str = r#"{
  "columns": [
    {"columnId": "name"},
    {"columnId": "qty", "bodyContent": "0"}
  ],
  "rows": [
    {"rowId": "head", "content": {"name": "Name", "qty": "Qty"}},
    {"rowId": "pears", "content": {"name": "Pears", "qty": "3"}},
    {"rowId": "apples", "content": {"name": "Apples", "qty": "12"}},
    {"rowId": "figs", "content": {"name": "Figs"}},
    {"rowId": "total", "content": {"name": "Total", "qty": "15"}}
  ],
  "titleRowCount": 1,
  "footerRowCount": 1
}"#;

fn tgrid(config: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tgrid"));
    cmd.arg("--config").arg(config);
    cmd
}

/// A temp dir holding `table.json` and an empty `settings.toml`.
fn workspace() -> (tempfile::TempDir, PathBuf, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let table = dir.path().join("table.json");
    let config = dir.path().join("settings.toml");
    std::fs::write(&table, SAMPLE).expect("write table");
    std::fs::write(&config, "").expect("write settings");
    (dir, table, config)
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "exit code was {:?}, stderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON")
}

fn row_ids(desc: &serde_json::Value) -> Vec<String> {
    desc["rows"]
        .as_array()
        .expect("rows array")
        .iter()
        .map(|r| r["rowId"].as_str().expect("rowId").to_string())
        .collect()
}

#[test]
fn inspect_json_reports_sections() {
    let (_dir, table, config) = workspace();
    let output = tgrid(&config)
        .args(["inspect", table.to_str().unwrap(), "--json"])
        .output()
        .expect("tgrid inspect");

    let report = stdout_json(&output);
    assert_eq!(report["columns"], serde_json::json!(["name", "qty"]));
    assert_eq!(report["title_rows"], serde_json::json!(["head"]));
    assert_eq!(report["body_rows"].as_array().unwrap().len(), 3);
    assert_eq!(report["cells"], 10);
}

#[test]
fn roundtrip_fills_defaults_and_tags_content() {
    let (_dir, table, config) = workspace();
    let output = tgrid(&config)
        .args(["roundtrip", table.to_str().unwrap()])
        .output()
        .expect("tgrid roundtrip");

    let desc = stdout_json(&output);
    let figs = &desc["rows"][3];
    assert_eq!(figs["rowId"], "figs");
    assert_eq!(figs["content"]["qty"], serde_json::json!({"type": "string", "content": "0"}));
    assert_eq!(desc["titleRowCount"], 1);
}

#[test]
fn roundtrip_reads_stdin_and_writes_file() {
    let (dir, _table, config) = workspace();
    let out = dir.path().join("out.json");
    let mut child = tgrid(&config)
        .args(["roundtrip", "--no-content", "-o", out.to_str().unwrap()])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn tgrid");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(SAMPLE.as_bytes())
        .expect("write stdin");
    let status = child.wait().expect("wait");
    assert!(status.success());

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).expect("output file")).expect("valid JSON");
    assert!(written["rows"][0].get("content").is_none());
    assert_eq!(row_ids(&written).len(), 5);
}

#[test]
fn sort_desc_keeps_title_and_footer_in_place() {
    let (_dir, table, config) = workspace();
    let output = tgrid(&config)
        .args(["sort", table.to_str().unwrap(), "--by", "qty", "--desc"])
        .output()
        .expect("tgrid sort");

    let desc = stdout_json(&output);
    assert_eq!(row_ids(&desc), vec!["head", "apples", "pears", "figs", "total"]);
}

#[test]
fn move_row_relative_to_anchor() {
    let (_dir, table, config) = workspace();
    let output = tgrid(&config)
        .args(["move", table.to_str().unwrap(), "--row", "figs", "--to", "up", "--anchor", "pears"])
        .output()
        .expect("tgrid move");

    let desc = stdout_json(&output);
    assert_eq!(row_ids(&desc), vec!["head", "figs", "pears", "apples", "total"]);
}

#[test]
fn move_into_other_section_fails_with_hint() {
    let (_dir, table, config) = workspace();
    let output = tgrid(&config)
        .args(["move", table.to_str().unwrap(), "--row", "figs", "--to", "down", "--anchor", "total"])
        .output()
        .expect("tgrid move");

    assert_eq!(output.status.code(), Some(5));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: invalid position"), "stderr: {}", stderr);
    assert!(stderr.contains("hint:"));
}

#[test]
fn reorder_columns_and_rows() {
    let (_dir, table, config) = workspace();
    let output = tgrid(&config)
        .args(["reorder", table.to_str().unwrap(), "--columns", "qty", "--rows", "figs,apples"])
        .output()
        .expect("tgrid reorder");

    let desc = stdout_json(&output);
    assert_eq!(desc["columns"][0]["columnId"], "qty");
    assert_eq!(row_ids(&desc), vec!["head", "figs", "apples", "pears", "total"]);
}

#[test]
fn add_row_uses_generate_setting_from_config() {
    let (_dir, table, config) = workspace();
    std::fs::write(&config, "[generate]\nmissing_columns = true\n").unwrap();
    let output = tgrid(&config)
        .args(["add-row", table.to_str().unwrap(), "--id", "plums", "--cell", "color=purple"])
        .output()
        .expect("tgrid add-row");

    let desc = stdout_json(&output);
    assert_eq!(desc["columns"].as_array().unwrap().len(), 3);
    assert_eq!(row_ids(&desc)[4], "plums");
}

#[test]
fn add_column_with_kind_defaults() {
    let (_dir, table, config) = workspace();
    let output = tgrid(&config)
        .args([
            "add-column",
            table.to_str().unwrap(),
            "--id",
            "price",
            "--default",
            "title=Price",
            "--default",
            "body=?",
            "--at",
            "first",
        ])
        .output()
        .expect("tgrid add-column");

    let desc = stdout_json(&output);
    assert_eq!(desc["columns"][0]["columnId"], "price");
    assert_eq!(desc["rows"][0]["content"]["price"]["content"], "Price");
    assert_eq!(desc["rows"][1]["content"]["price"]["content"], "?");
}

#[test]
fn duplicate_id_exits_with_grid_code() {
    let (_dir, table, config) = workspace();
    let output = tgrid(&config)
        .args(["add-row", table.to_str().unwrap(), "--id", "figs"])
        .output()
        .expect("tgrid add-row");
    assert_eq!(output.status.code(), Some(5));
}

#[test]
fn render_prints_aligned_table() {
    let (_dir, table, config) = workspace();
    let output = tgrid(&config)
        .args(["render", table.to_str().unwrap()])
        .output()
        .expect("tgrid render");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("| Apples | 12  |"), "stdout: {}", stdout);
    assert!(stdout.contains("| Figs   | 0   |"));
}

#[test]
fn missing_file_and_bad_config_exit_codes() {
    let (dir, _table, config) = workspace();
    let output = tgrid(&config)
        .args(["inspect", dir.path().join("nope.json").to_str().unwrap()])
        .output()
        .expect("tgrid inspect");
    assert_eq!(output.status.code(), Some(3));

    std::fs::write(&config, "[ids]\nrow_prefix = \"x\"\ncolumn_prefix = \"x\"\n").unwrap();
    let output = tgrid(&config).args(["config"]).output().expect("tgrid config");
    assert_eq!(output.status.code(), Some(4));
}
