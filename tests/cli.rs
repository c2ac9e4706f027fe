use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn flashread_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_flashread"))
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(files_dir.join("hello.txt"), "Hello\r\nWorld\r\n\r\n\r\n").unwrap();
    fs::write(
        files_dir.join("notes.md"),
        "# Notes\n\n\n\n\nOwnership   and borrowing.\n",
    )
    .unwrap();
    fs::write(files_dir.join("report.docx"), minimal_docx("Quarterly revenue grew.")).unwrap();
    fs::write(files_dir.join("image.png"), [0x89, 0x50, 0x4e, 0x47]).unwrap();

    // Port 9 (discard) so nothing answers client calls.
    let config_content = format!(
        r#"[client]
api_url = "http://127.0.0.1:9"

[storage]
dir = "{}/data"
"#,
        root.display()
    );
    let config_path = config_dir.join("flashread.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn minimal_docx(text: &str) -> Vec<u8> {
    let mut buf = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buf);
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("word/document.xml", options).unwrap();
        write!(
            zip,
            r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:body></w:document>"#,
            text
        )
        .unwrap();
        zip.finish().unwrap();
    }
    buf.into_inner()
}

fn run_flashread(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(flashread_binary())
        .arg("--config")
        .arg(config_path)
        .args(args)
        .env_remove("FLASHREAD_GROQ_KEY")
        .env_remove("FLASHREAD_RAPIDAPI_KEY")
        .output()
        .expect("Failed to run flashread binary");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn files_dir(config_path: &Path) -> PathBuf {
    config_path.parent().unwrap().parent().unwrap().join("files")
}

#[test]
fn test_extract_txt_normalizes_line_endings() {
    let (_tmp, config) = setup_test_env();
    let path = files_dir(&config).join("hello.txt");
    let (stdout, stderr, success) =
        run_flashread(&config, &["extract", path.to_str().unwrap()]);
    assert!(success, "extract failed: {}", stderr);
    assert_eq!(stdout, "Hello\nWorld\n");
}

#[test]
fn test_extract_stats() {
    let (_tmp, config) = setup_test_env();
    let path = files_dir(&config).join("hello.txt");
    let (stdout, _, success) =
        run_flashread(&config, &["extract", "--stats", path.to_str().unwrap()]);
    assert!(success);
    assert_eq!(stdout.trim(), "hello.txt: 2 words, 11 chars");
}

#[test]
fn test_extract_markdown_collapses_blank_lines() {
    let (_tmp, config) = setup_test_env();
    let path = files_dir(&config).join("notes.md");
    let (stdout, _, success) = run_flashread(&config, &["extract", path.to_str().unwrap()]);
    assert!(success);
    assert_eq!(stdout, "# Notes\n\nOwnership and borrowing.\n");
}

#[test]
fn test_extract_docx() {
    let (_tmp, config) = setup_test_env();
    let path = files_dir(&config).join("report.docx");
    let (stdout, stderr, success) = run_flashread(&config, &["extract", path.to_str().unwrap()]);
    assert!(success, "extract failed: {}", stderr);
    assert!(stdout.contains("Quarterly revenue grew."));
}

#[test]
fn test_extract_unsupported_type_fails() {
    let (_tmp, config) = setup_test_env();
    let path = files_dir(&config).join("image.png");
    let (_, _, success) = run_flashread(&config, &["extract", path.to_str().unwrap()]);
    assert!(!success);

    let (_, stderr, success) = run_flashread(
        &config,
        &["extract", "--type", "image/png", path.to_str().unwrap()],
    );
    assert!(!success);
    assert!(stderr.contains("Unsupported file type"));
}

#[test]
fn test_credentials_roundtrip() {
    let (_tmp, config) = setup_test_env();

    let (stdout, _, success) = run_flashread(&config, &["credentials", "show"]);
    assert!(success);
    assert!(stdout.contains("rapidapi: (not set)"));
    assert!(stdout.contains("groq:     (not set)"));

    let (_, stderr, success) = run_flashread(
        &config,
        &["credentials", "set", "--groq", "gsk_1234567890abcdef"],
    );
    assert!(success, "credentials set failed: {}", stderr);

    let (stdout, _, _) = run_flashread(&config, &["credentials", "show"]);
    assert!(stdout.contains("groq:     gsk_…"));
    assert!(!stdout.contains("1234567890"));
    assert!(stdout.contains("rapidapi: (not set)"));

    let data = config.parent().unwrap().parent().unwrap().join("data");
    assert!(data.join("flashread_credentials.json").exists());

    let (_, _, success) = run_flashread(&config, &["credentials", "clear"]);
    assert!(success);
    assert!(!data.join("flashread_credentials.json").exists());
}

#[test]
fn test_empty_state_listings() {
    let (_tmp, config) = setup_test_env();
    let (stdout, _, success) = run_flashread(&config, &["docs", "list"]);
    assert!(success);
    assert_eq!(stdout.trim(), "No documents.");

    let (stdout, _, success) = run_flashread(&config, &["history", "list"]);
    assert!(success);
    assert_eq!(stdout.trim(), "No history.");
}

#[test]
fn test_remove_unknown_document_fails() {
    let (_tmp, config) = setup_test_env();
    let (_, stderr, success) = run_flashread(&config, &["docs", "remove", "nope"]);
    assert!(!success);
    assert!(stderr.contains("no document with id nope"));
}

#[test]
fn test_summarize_requires_input() {
    let (_tmp, config) = setup_test_env();
    let (_, stderr, success) = run_flashread(&config, &["summarize"]);
    assert!(!success);
    assert!(stderr.contains("one of --url, --text, or --file is required"));
}

#[test]
fn test_invalid_config_is_reported() {
    let (_tmp, config) = setup_test_env();
    fs::write(&config, "[groq]\nbase_url = \"ftp://nope\"\n").unwrap();
    let (_, stderr, success) = run_flashread(&config, &["docs", "list"]);
    assert!(!success);
    assert!(stderr.contains("groq.base_url"));
}
