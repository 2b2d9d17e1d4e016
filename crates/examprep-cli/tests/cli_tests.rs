//! CLI integration tests using assert_cmd.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn examprep() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("examprep").unwrap()
}

fn banks_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../banks")
}

/// A temp workspace with a config that grades offline and never pauses
/// between questions.
fn workspace() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("examprep.toml");
    let content = format!(
        r#"default_provider = "mock"
history_path = "{}"
bank_dir = "{}"
transition_exit_ms = 0
transition_enter_ms = 0

[providers.mock]
type = "mock"
score = 80.0
"#,
        dir.path().join("history.json").display(),
        banks_dir().display()
    );
    std::fs::write(&config, content).unwrap();
    (dir, config)
}

fn with_config(config: &Path) -> Command {
    let mut cmd = examprep();
    cmd.arg("--config")
        .arg(config)
        .env_remove("GEMINI_API_KEY")
        .env_remove("EXAMPREP_GEMINI_KEY");
    cmd
}

/// Take a two-question java exam and return its id.
fn take_exam(config: &Path) -> String {
    let output = with_config(config)
        .args(["exam", "--subject", "java", "--count", "2", "--seed", "7"])
        .write_stdin("first answer\nsecond answer\n")
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    stdout
        .lines()
        .find_map(|line| line.strip_prefix("Exam id: "))
        .map(str::to_string)
        .expect("exam id in output")
}

#[test]
fn validate_bank_file() {
    examprep()
        .arg("validate")
        .arg("--bank")
        .arg("../../banks/java.json")
        .assert()
        .success()
        .stdout(predicate::str::contains("Subject: Java (java, 8 questions)"))
        .stdout(predicate::str::contains("All banks valid"));
}

#[test]
fn validate_directory() {
    examprep()
        .arg("validate")
        .arg("--bank")
        .arg("../../banks")
        .assert()
        .success()
        .stdout(predicate::str::contains("Java"))
        .stdout(predicate::str::contains("React (react, 6 questions)"));
}

#[test]
fn validate_nonexistent_file() {
    examprep()
        .arg("validate")
        .arg("--bank")
        .arg("nonexistent.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    examprep()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created examprep.toml"))
        .stdout(predicate::str::contains("Created banks/example.json"));

    assert!(dir.path().join("examprep.toml").exists());

    // The generated bank is valid.
    examprep()
        .current_dir(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Example (example, 3 questions)"));
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("examprep.toml"), "# mine").unwrap();

    examprep()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists, skipping"));

    let content = std::fs::read_to_string(dir.path().join("examprep.toml")).unwrap();
    assert_eq!(content, "# mine");
}

#[test]
fn subjects_lists_banks() {
    let (_dir, config) = workspace();

    with_config(&config)
        .arg("subjects")
        .assert()
        .success()
        .stdout(predicate::str::contains("java"))
        .stdout(predicate::str::contains("React"));
}

#[test]
fn missing_config_file_is_an_error() {
    examprep()
        .args(["--config", "does-not-exist.toml", "subjects"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn exam_records_pending_history() {
    let (_dir, config) = workspace();
    let id = take_exam(&config);

    with_config(&config)
        .args(["history", "--subject", "java"])
        .assert()
        .success()
        .stdout(predicate::str::contains(id.as_str()))
        .stdout(predicate::str::contains("pending"));
}

#[test]
fn exam_hint_and_navigation() {
    let (_dir, config) = workspace();

    with_config(&config)
        .args(["exam", "--subject", "react", "--count", "2", "--seed", "1"])
        .write_stdin(":prev\n\n:hint\nfirst\n:prev\n\nsecond\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Already at the first question."))
        .stdout(predicate::str::contains("An answer is required"))
        .stdout(predicate::str::contains("Hint: "))
        .stdout(predicate::str::contains("(saved answer: first"))
        .stdout(predicate::str::contains("Exam complete. 2 answers saved."));
}

#[test]
fn exam_quit_saves_nothing() {
    let (dir, config) = workspace();

    with_config(&config)
        .args(["exam", "--subject", "java", "--count", "3"])
        .write_stdin("an answer\n:quit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing was saved"));

    assert!(!dir.path().join("history.json").exists());
}

#[test]
fn exam_input_ending_early_fails() {
    let (_dir, config) = workspace();

    with_config(&config)
        .args(["exam", "--subject", "java", "--count", "3"])
        .write_stdin("only one answer\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("input ended"));
}

#[test]
fn exam_stays_open_when_history_cannot_be_written() {
    let (dir, config) = workspace();
    // A directory where the history file should be makes every write fail.
    std::fs::create_dir(dir.path().join("history.json")).unwrap();

    with_config(&config)
        .args(["exam", "--subject", "java", "--count", "1"])
        .write_stdin("my answer\n\n:quit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Could not save the exam").count(2))
        .stdout(predicate::str::contains("Exam abandoned"))
        .stdout(predicate::str::contains("Exam id").not());
}

#[test]
fn exam_unknown_subject() {
    let (_dir, config) = workspace();

    with_config(&config)
        .args(["exam", "--subject", "cobol"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cobol"));
}

#[test]
fn exam_unknown_strategy() {
    let (_dir, config) = workspace();

    with_config(&config)
        .args(["exam", "--subject", "java", "--strategy", "hardest"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("hardest"));
}

#[test]
fn grade_with_mock_provider() {
    let (_dir, config) = workspace();
    let id = take_exam(&config);

    with_config(&config)
        .args(["grade", "--exam", id.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Overall: 80.0 (B)"));

    // A second run reports the stored grade without calling the grader.
    with_config(&config)
        .args(["grade", "--exam", id.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("already graded"));

    with_config(&config)
        .args(["report", "--subject", "java"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cumulative average: 80.0%"));
}

#[test]
fn grade_unknown_exam() {
    let (_dir, config) = workspace();

    with_config(&config)
        .args(["grade", "--exam", "no-such-exam"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no-such-exam"));
}

#[test]
fn grade_without_credentials_leaves_exam_pending() {
    let (_dir, config) = workspace();
    let id = take_exam(&config);

    with_config(&config)
        .args(["grade", "--exam", id.as_str(), "--provider", "gemini"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));

    with_config(&config)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("pending"));
}

#[test]
fn report_covers_every_subject() {
    let (_dir, config) = workspace();
    take_exam(&config);

    with_config(&config)
        .arg("report")
        .assert()
        .success()
        .stdout(predicate::str::contains("Java (java)"))
        .stdout(predicate::str::contains("React (react)"))
        .stdout(predicate::str::contains("25%"));
}

#[test]
fn export_then_reimport() {
    let (dir, config) = workspace();
    take_exam(&config);
    let file = dir.path().join("java-export.json");

    with_config(&config)
        .args(["export", "--subject", "java", "--output"])
        .arg(&file)
        .assert()
        .success();

    let exported: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
    assert_eq!(exported.as_array().unwrap().len(), 1);

    with_config(&config)
        .args(["import", "--subject", "java", "--file"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("No new data"));

    with_config(&config)
        .args(["import", "--subject", "java", "--mode", "override", "--file"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 1 records"))
        .stdout(predicate::str::contains("Replaced 1 existing records"));
}

#[test]
fn export_empty_subject_fails() {
    let (_dir, config) = workspace();

    with_config(&config)
        .args(["export", "--subject", "react"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn import_rejects_invalid_json() {
    let (dir, config) = workspace();
    let file = dir.path().join("broken.json");
    std::fs::write(&file, "{ not json").unwrap();

    with_config(&config)
        .args(["import", "--subject", "java", "--file"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not valid JSON"));
}

#[test]
fn import_unknown_mode() {
    let (dir, config) = workspace();
    let file = dir.path().join("records.json");
    std::fs::write(&file, "[]").unwrap();

    with_config(&config)
        .args(["import", "--subject", "java", "--mode", "merge", "--file"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("merge"));
}
