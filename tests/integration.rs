use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn handbook_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("handbook");
    path
}

fn setup_test_env(extra: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[server]
bind = "127.0.0.1:0"

[retrieval]
context_limit = 5
min_score = 0.1

[ai]
provider = "disabled"
{}
"#,
        extra
    );

    let config_path = config_dir.join("handbook.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_handbook(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = handbook_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run handbook binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_sections_lists_builtin_handbook() {
    let (_tmp, config_path) = setup_test_env("");

    let (stdout, stderr, success) = run_handbook(&config_path, &["sections"]);
    assert!(success, "sections failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("第一部分 – 一般資訊"));
    assert!(stdout.contains("學士學位課程規條"));
    assert!(stdout.contains("附錄"));
}

#[test]
fn test_section_partial_match() {
    let (_tmp, config_path) = setup_test_env("");

    let (stdout, _, success) = run_handbook(&config_path, &["section", "評估"]);
    assert!(success);
    assert!(stdout.contains("--- 評估或考核 (7 items) ---"));
    assert!(stdout.contains("補考機會提供給因特殊情況缺考的學生。"));
}

#[test]
fn test_section_not_found_fails() {
    let (_tmp, config_path) = setup_test_env("");

    let (_, stderr, success) = run_handbook(&config_path, &["section", "nonexistent"]);
    assert!(!success);
    assert!(stderr.contains("section not found"));
    assert!(stderr.contains("附錄"));
}

#[test]
fn test_search_ranks_results() {
    let (_tmp, config_path) = setup_test_env("");

    let (stdout, stderr, success) = run_handbook(&config_path, &["search", "考試"]);
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);
    let first = stdout.find("考試期間允許使用指定的輔助器材。").unwrap();
    let second = stdout.find("考試中的不當行為將面臨嚴重後果。").unwrap();
    assert!(first < second, "results should keep score/corpus order");
    assert!(stdout.contains("1. [0.125] 評估或考核"));
}

#[test]
fn test_search_no_results() {
    let (_tmp, config_path) = setup_test_env("");

    let (stdout, _, success) = run_handbook(&config_path, &["search", "quantum chromodynamics"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_search_limit() {
    let (_tmp, config_path) = setup_test_env("");

    let (stdout, _, success) = run_handbook(&config_path, &["search", "考試", "--limit", "1"]);
    assert!(success);
    assert!(stdout.contains("1. "));
    assert!(!stdout.contains("2. "));
}

#[test]
fn test_ask_uses_fallback_when_ai_disabled() {
    let (_tmp, config_path) = setup_test_env("");

    let (stdout, stderr, success) = run_handbook(&config_path, &["ask", "請問補考規定？"]);
    assert!(success, "ask failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("## 📚 補考規定"));
    assert!(stdout.contains("因特殊情況缺考可申請補考"));
    assert!(stdout.contains("-- local_fallback / handbook_knowledge (fallback)"));
}

#[test]
fn test_ask_default_fallback() {
    let (_tmp, config_path) = setup_test_env("");

    let (stdout, _, success) = run_handbook(&config_path, &["ask", "hello"]);
    assert!(success);
    assert!(stdout.contains("## 🤖 學生助理 Rose"));
}

#[test]
fn test_ask_empty_message_fails() {
    let (_tmp, config_path) = setup_test_env("");

    let (_, stderr, success) = run_handbook(&config_path, &["ask", "   "]);
    assert!(!success);
    assert!(stderr.contains("must not be empty"));
}

#[test]
fn test_custom_handbook_file() {
    let (tmp, config_path) = setup_test_env("\n[handbook]\npath = \"corpus.toml\"\n");
    fs::write(
        tmp.path().join("config").join("corpus.toml"),
        r#"
[[sections]]
name = "Housing"
passages = ["Dorm rooms are assigned in order of application.", "Pets are not allowed."]

[[topics]]
name = "dorm"
description = "Apply for a dorm room during orientation week."
"#,
    )
    .unwrap();

    let (stdout, stderr, success) = run_handbook(&config_path, &["search", "DORM rooms"]);
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Housing"));
    assert!(stdout.contains("Dorm rooms are assigned"));

    let (stdout, _, success) = run_handbook(&config_path, &["ask", "How do I get a dorm?"]);
    assert!(success);
    assert!(stdout.contains("## 📚 dorm"));
}

#[test]
fn test_invalid_config_fails() {
    let (_tmp, config_path) = setup_test_env("");
    fs::write(&config_path, "[ai]\nprovider = \"mystery\"\n").unwrap();

    let (_, stderr, success) = run_handbook(&config_path, &["sections"]);
    assert!(!success);
    assert!(stderr.contains("Unknown ai provider"));
}

#[test]
fn test_missing_config_uses_defaults_offline() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("absent.toml");

    let (stdout, _, success) = run_handbook(&config_path, &["ask", "圖書館開放時間"]);
    assert!(success);
    assert!(stdout.contains("## 📚 圖書館"));
}

#[test]
fn test_serve_requires_config() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("absent.toml");

    let (_, stderr, success) = run_handbook(&config_path, &["serve"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
