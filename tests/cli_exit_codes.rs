use std::process::Command;
use tempfile::TempDir;

const PAGE: &str = "<!doctype html><html><head><title>Example Domain</title></head>\
<body><h1>Example Domain</h1><p><a href=\"#\">More information...</a></p></body></html>";

fn write_page(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("page.html");
    std::fs::write(&path, PAGE).expect("write page");
    path
}

fn a11ysnap() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_a11ysnap"));
    cmd.env_remove("A11YSNAP_LOG");
    cmd
}

#[test]
fn capture_of_local_html_succeeds_with_snapshot_json() {
    let dir = TempDir::new().expect("tempdir");
    let page = write_page(&dir);

    let output = a11ysnap()
        .args(["capture", "--input", page.to_str().unwrap()])
        .output()
        .expect("run a11ysnap");
    assert_eq!(output.status.code(), Some(0));

    let body: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is snapshot JSON");
    assert_eq!(body["title"], "Example Domain");
    assert_eq!(body["element_count"], 1);
    assert_eq!(body["interactive_elements"][0]["type"], "link");
    assert_eq!(body["interactive_elements"][0]["selector"], "a:nth-of-type(1)");
    assert!(body["url"].as_str().unwrap().starts_with("file://"));
}

#[test]
fn capture_writes_output_file_and_inspect_reads_it() {
    let dir = TempDir::new().expect("tempdir");
    let page = write_page(&dir);
    let snapshot_path = dir.path().join("out").join("snap.json");

    let status = a11ysnap()
        .args([
            "capture",
            "--input",
            page.to_str().unwrap(),
            "--output",
            snapshot_path.to_str().unwrap(),
        ])
        .status()
        .expect("run a11ysnap");
    assert_eq!(status.code(), Some(0));
    assert!(snapshot_path.exists());

    let output = a11ysnap()
        .args(["inspect", "--snapshot", snapshot_path.to_str().unwrap()])
        .output()
        .expect("run a11ysnap");
    assert_eq!(output.status.code(), Some(0));
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).expect("inspect JSON");
    assert_eq!(body["mode"], "inspect");
    assert_eq!(body["summary"]["elementCount"], 1);
    assert_eq!(body["summary"]["byType"]["link"], 1);
}

#[test]
fn capture_accepts_config_flag() {
    let dir = TempDir::new().expect("tempdir");
    let page = write_page(&dir);
    let cfg_path = dir.path().join("a11ysnap.toml");
    std::fs::write(&cfg_path, "[scan]\nmax_text_length = 4\n").expect("write config");

    let output = a11ysnap()
        .args([
            "--config",
            cfg_path.to_str().unwrap(),
            "capture",
            "--input",
            page.to_str().unwrap(),
        ])
        .output()
        .expect("run a11ysnap");
    assert_eq!(output.status.code(), Some(0));
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["interactive_elements"][0]["text"], "More");
}

#[test]
fn invalid_config_exits_two_with_error_payload() {
    let dir = TempDir::new().expect("tempdir");
    let page = write_page(&dir);
    let cfg_path = dir.path().join("bad.toml");
    std::fs::write(&cfg_path, "threshold = 0.9\n").expect("write config");

    let output = a11ysnap()
        .args([
            "--config",
            cfg_path.to_str().unwrap(),
            "capture",
            "--input",
            page.to_str().unwrap(),
        ])
        .output()
        .expect("run a11ysnap");
    assert_eq!(output.status.code(), Some(2));
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["mode"], "error");
    assert_eq!(body["error"]["category"], "config");
}

#[test]
fn missing_input_file_exits_two() {
    let output = a11ysnap()
        .args(["capture", "--input", "/nonexistent/a11ysnap/page.html"])
        .output()
        .expect("run a11ysnap");
    assert_eq!(output.status.code(), Some(2));
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["error"]["category"], "input");
    assert_eq!(body["source"], "/nonexistent/a11ysnap/page.html");
}

#[test]
fn inspect_rejects_inconsistent_snapshot() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("broken.json");
    std::fs::write(
        &path,
        r#"{"title":"t","url":"u","timestamp":"2024-05-01T12:00:00Z","accessibility_tree":null,"interactive_elements":[],"element_count":3}"#,
    )
    .expect("write snapshot");

    let status = a11ysnap()
        .args(["inspect", "--snapshot", path.to_str().unwrap()])
        .status()
        .expect("run a11ysnap");
    assert_eq!(status.code(), Some(2));
}
