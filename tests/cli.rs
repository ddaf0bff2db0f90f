use std::io::Write;
use std::process::{Command, Output, Stdio};

fn spi(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_spi"))
        .args(args)
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .output()
        .expect("failed to spawn spi")
}

fn spi_with_stdin(args: &[&str], input: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_spi"))
        .args(args)
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn spi");

    child
        .stdin
        .as_mut()
        .expect("stdin not available")
        .write_all(input.as_bytes())
        .expect("failed to write to stdin");

    child.wait_with_output().expect("failed to wait on spi")
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).expect("stdout is not valid utf-8")
}

#[test]
fn run_prints_globals() {
    let output = spi(&["run", "tests/fixtures/part12.pas"]);
    assert!(output.status.success(), "stderr:\n{}", String::from_utf8_lossy(&output.stderr));

    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(&lines[..3], ["a = 2", "b = 25", "number = 2"]);
    assert!(lines[3].starts_with("y = 5.99"));
}

#[test]
fn run_emits_json() {
    let output = spi(&["run", "--json", "--stack", "tests/fixtures/alpha.pas"]);
    assert!(output.status.success(), "stderr:\n{}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("invalid JSON");
    assert_eq!(json["program"], "Main");
    assert_eq!(json["stack_events"][2]["action"], "Leave");
    assert_eq!(json["stack_events"][2]["record"]["name"], "Alpha");
    assert_eq!(json["stack_events"][2]["record"]["members"]["x"], 30);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ENTER: PROCEDURE Alpha"), "stderr:\n{}", stderr);
}

#[test]
fn semantic_errors_exit_non_zero() {
    let output = spi(&["run", "tests/fixtures/duplicate.pas"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Semantic error [DUPLICATE_ID]: Duplicate identifier 'a' found (line 4, column 5)"),
        "stderr:\n{}",
        stderr
    );
}

#[test]
fn fmt_prints_canonical_source() {
    let output = spi(&["fmt", "tests/fixtures/alpha.pas"]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "\
PROGRAM Main;
PROCEDURE Alpha(a : INTEGER; b : INTEGER);
   VAR
      x : INTEGER;
   BEGIN
      x := ((a + b) * 2)
   END;
BEGIN
   Alpha((3 + 5), 7)
END.
"
    );
}

#[test]
fn repl_evaluates_each_line() {
    let output = spi_with_stdin(&["repl"], "2 + 7 * 4\n10 / 4\n1 +\nquit\n");
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.contains("30\n"), "stdout:\n{}", text);
    assert!(text.contains("2.5\n"), "stdout:\n{}", text);
    assert!(text.contains("Parser error [UNEXPECTED_EOF]"), "stdout:\n{}", text);
}

#[test]
fn missing_file_is_reported() {
    let output = spi(&["run", "tests/fixtures/does_not_exist.pas"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read"));
}

#[test]
fn highest_max_depth_stops_with_recursion_limit() {
    let output = spi(&["run", "tests/fixtures/endless.pas", "--max-depth", "2048"]);
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Runtime error [RECURSION_LIMIT]"), "stderr:\n{}", stderr);
}

#[test]
fn max_depth_above_the_limit_is_refused() {
    let output = spi(&["run", "tests/fixtures/endless.pas", "--max-depth", "1000000"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("max_call_depth must be between 1 and 2048"));
}

#[test]
fn repl_survives_deep_nesting() {
    let deep = format!("{}1{}", "(".repeat(5_000), ")".repeat(5_000));
    let output = spi_with_stdin(&["repl"], &format!("{}\n3 * 3\nquit\n", deep));
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.contains("Parser error [NESTING_TOO_DEEP]"), "stdout:\n{}", text);
    assert!(text.contains("9\n"), "stdout:\n{}", text);
}
