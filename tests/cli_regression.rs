// Regression tests for the errdata binary.
// Requires: assert_cmd, predicates crates in [dev-dependencies]

use std::fs;
use std::path::PathBuf;
use std::process;

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};

fn errdata() -> Command {
    Command::cargo_bin("errdata").unwrap()
}

/// A parameter file in the temp directory, removed when dropped.
struct Fixture {
    path: PathBuf,
}

impl Fixture {
    fn new(name: &str, contents: &str) -> Self {
        let path = std::env::temp_dir().join(format!("errdata-{}-{}", process::id(), name));
        fs::write(&path, contents).unwrap();
        Self { path }
    }

    fn path(&self) -> &str {
        self.path.to_str().unwrap()
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[test]
fn render_interpolates_set_parameters() {
    errdata()
        .args(["render", "0b%b{ValHundreds}", "--set", "ValHundreds=128"])
        .assert()
        .success()
        .stdout(contains("0b10000000"));
}

#[test]
fn render_wraps_a_plain_cause() {
    errdata()
        .args(["render", "reading %d{N} bytes: %w", "--set", "N=4", "--cause", "disk gone"])
        .assert()
        .success()
        .stdout(contains("reading 4 bytes: disk gone"));
}

#[test]
fn render_without_format_or_cause_is_rejected() {
    errdata()
        .args(["render", ""])
        .assert()
        .code(2)
        .stderr(contains("errdata::cli::empty_format"));
}

#[test]
fn check_reports_miette_diagnostics_on_error() {
    errdata()
        .args(["check", "oops } here"])
        .assert()
        .failure()
        .stderr(contains("errdata::template::unmatched_close_brace").or(contains("help:")));
}

#[test]
fn check_resolves_fields_from_a_json_file() {
    let params = Fixture::new("check_params.json", r#"{"Name": "disk", "Size": 4}"#);
    let path = params.path();

    errdata()
        .args(["check", "%s{Name} has %d{Size} bytes", "--params", path])
        .assert()
        .success()
        .stdout(contains("ok"));

    errdata()
        .args(["check", "%{Missing}", "--params", path])
        .assert()
        .failure()
        .stderr(contains("missing_own_field"));
}

#[test]
fn check_passed_level_reads_yaml_file() {
    let passed = Fixture::new("check_passed.yaml", "Outer: 7\n");
    let path = passed.path();

    errdata()
        .args(["check", "${Outer}", "--level", "passed", "--passed", path])
        .assert()
        .success();

    errdata()
        .args(["check", "${Other}", "--level", "passed", "--passed", path])
        .assert()
        .failure()
        .stderr(contains("missing_passed_field"));
}

#[test]
fn ast_prints_the_syntax_tree() {
    errdata()
        .args(["ast", "%!m=0{Foo}"])
        .assert()
        .success()
        .stdout(contains(r#"(root (if %!m=0 "Foo"))"#));
}

#[test]
fn tokens_lists_control_sequences() {
    errdata()
        .args(["tokens", "a%w"])
        .assert()
        .success()
        .stdout(contains("text \"a\"").and(contains("%w")));
}
