//! End-to-end CLI integration tests
//!
//! These tests invoke the compiled binary as a subprocess to verify
//! that the CLI behaves correctly from a user's perspective. Network
//! stages run against a local mockito server wired in through the
//! `DOI_LINT_*_URL` environment variables.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use mockito::{Matcher, Server};
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;

/// Returns a Command configured to run our binary.
///
/// Note: `cargo_bin` is marked deprecated for edge cases involving custom
/// cargo build directories, but works correctly for standard project layouts.
#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap()
}

/// A `check` command pointed at `server`, run from `dir`.
fn check_cmd(server: &Server, dir: &Path) -> Command {
    let mut cmd = cmd();
    cmd.current_dir(dir)
        .env("DOI_LINT_RESOLVER_URL", server.url())
        .env("DOI_LINT_REGISTRY_URL", server.url())
        .env("DOI_LINT_REQUEST_DELAY_MS", "0")
        .env("DOI_LINT_TIMEOUT_SECS", "5")
        .env("DOI_LINT_LOG_DIR", dir.join("logs"))
        .env_remove("DOI_LINT_VERIFY_METADATA")
        .env_remove("RUST_LOG")
        .arg("check");
    cmd
}

fn write_bib(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const VALID_AND_MISSING: &str = "\
@article{valid2015,
  author = {LeCun, Yann and Bengio, Yoshua},
  title = {Deep Learning},
  year = {2015},
  doi = {10.1038/nature14539}
}

@article{nodoi2020,
  author = {Nobody, Some},
  title = {A Paper Without Identifier},
  year = {2020}
}
";

const TWO_RESOLVABLE: &str = "\
@article{first,
  title = {First},
  doi = {10.1000/first}
}
@book{second,
  title = {Second},
  doi = {https://doi.org/10.1000/second}
}
";

fn deep_learning_metadata() -> String {
    json!({
        "status": "ok",
        "message": {
            "title": ["Deep learning"],
            "author": [{"given": "Yann", "family": "LeCun"}],
            "published-print": {"date-parts": [[2015, 5, 28]]}
        }
    })
    .to_string()
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_shows_usage() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn long_help_lists_environment() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("DOI_LINT_RESOLVER_URL"));
}

#[test]
fn version_flag_shows_version() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn version_only_prints_bare_version() {
    cmd()
        .arg("--version-only")
        .assert()
        .success()
        .stdout(predicate::str::diff(format!(
            "{}\n",
            env!("CARGO_PKG_VERSION")
        )));
}

// =============================================================================
// Info Command
// =============================================================================

#[test]
fn info_shows_package_name_and_version() {
    cmd()
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_NAME")))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn info_json_outputs_valid_json() {
    let output = cmd().args(["info", "--json"]).output().unwrap();
    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).expect("invalid JSON");
    assert_eq!(json["name"], env!("CARGO_PKG_NAME"));
    assert!(json["config"]["resolver_url"].is_string());
}

// =============================================================================
// Check Command
// =============================================================================

#[test]
fn valid_entry_and_missing_doi_fail_the_run() {
    let mut server = Server::new();
    let resolver = server
        .mock("GET", "/10.1038/nature14539")
        .with_status(200)
        .expect(1)
        .create();
    let registry = server
        .mock("GET", "/works/10.1038/nature14539")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(deep_learning_metadata())
        .expect(1)
        .create();
    let tmp = TempDir::new().unwrap();
    write_bib(&tmp, "refs.bib", VALID_AND_MISSING);

    check_cmd(&server, tmp.path())
        .arg("refs.bib")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Checking refs.bib..."))
        .stdout(predicate::str::contains("Checking article 'valid2015'..."))
        .stdout(predicate::str::contains("DOI URL is valid (status 200)"))
        .stdout(predicate::str::contains("Metadata appears consistent"))
        .stdout(predicate::str::contains(
            "Entry 'nodoi2020' (article) is missing DOI field",
        ))
        .stdout(predicate::str::contains("Total entries checked: 2"))
        .stdout(predicate::str::contains("Errors found: 1"))
        .stdout(predicate::str::contains("ERRORS:"));

    resolver.assert();
    registry.assert();
}

#[test]
fn json_report_has_totals() {
    let mut server = Server::new();
    let _resolver = server
        .mock("GET", "/10.1038/nature14539")
        .with_status(200)
        .create();
    let _registry = server
        .mock("GET", "/works/10.1038/nature14539")
        .with_status(200)
        .with_body(deep_learning_metadata())
        .create();
    let tmp = TempDir::new().unwrap();
    write_bib(&tmp, "refs.bib", VALID_AND_MISSING);

    let output = check_cmd(&server, tmp.path())
        .args(["refs.bib", "--json"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let report: Value = serde_json::from_slice(&output.stdout).expect("invalid JSON");
    assert_eq!(report["checked"], 2);
    assert_eq!(
        report["errors"],
        json!(["Entry 'nodoi2020' (article) is missing DOI field"])
    );
    let entries = &report["files"][0]["entries"];
    assert_eq!(entries[0]["outcome"], "passed");
    assert_eq!(entries[0]["metadata"], "compared");
    assert_eq!(entries[1]["outcome"], "missing_doi");
}

#[test]
fn no_metadata_check_skips_registry() {
    let mut server = Server::new();
    let _first = server.mock("GET", "/10.1000/first").with_status(200).create();
    let _second = server.mock("GET", "/10.1000/second").with_status(200).create();
    let registry = server
        .mock("GET", Matcher::Regex("^/works/".to_string()))
        .with_status(200)
        .expect(0)
        .create();
    let tmp = TempDir::new().unwrap();
    write_bib(&tmp, "refs.bib", TWO_RESOLVABLE);

    check_cmd(&server, tmp.path())
        .args(["refs.bib", "--no-metadata-check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total entries checked: 2"))
        .stdout(predicate::str::contains("Errors found: 0"))
        .stdout(predicate::str::contains("All checks passed!"))
        .stdout(predicate::str::contains("Fetching DOI metadata").not());

    registry.assert();
}

#[test]
fn unresolvable_doi_reports_status_code() {
    let mut server = Server::new();
    let _resolver = server.mock("GET", "/10.1000/gone").with_status(404).create();
    let tmp = TempDir::new().unwrap();
    write_bib(&tmp, "refs.bib", "@book{gone,\n  doi = {10.1000/gone}\n}\n");

    check_cmd(&server, tmp.path())
        .arg("refs.bib")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Entry 'gone': HTTP error 404"))
        .stderr(predicate::str::contains("failed DOI checks"));
}

#[test]
fn registry_outage_only_warns() {
    let mut server = Server::new();
    let _resolver = server.mock("GET", "/10.1000/first").with_status(200).create();
    let _registry = server
        .mock("GET", "/works/10.1000/first")
        .with_status(503)
        .create();
    let tmp = TempDir::new().unwrap();
    write_bib(&tmp, "refs.bib", "@article{first,\n  doi = {10.1000/first}\n}\n");

    check_cmd(&server, tmp.path())
        .arg("refs.bib")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Could not fetch metadata from CrossRef API",
        ))
        .stdout(predicate::str::contains("All checks passed!"));
}

#[test]
fn metadata_mismatch_only_warns() {
    let mut server = Server::new();
    let _resolver = server
        .mock("GET", "/10.1038/nature14539")
        .with_status(200)
        .create();
    let _registry = server
        .mock("GET", "/works/10.1038/nature14539")
        .with_status(200)
        .with_body(deep_learning_metadata())
        .create();
    let tmp = TempDir::new().unwrap();
    write_bib(
        &tmp,
        "refs.bib",
        "@article{off,\n  author = {LeCun, Yann},\n  title = {Deep Learning},\n  year = {2016},\n  doi = {10.1038/nature14539}\n}\n",
    );

    check_cmd(&server, tmp.path())
        .arg("refs.bib")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Year mismatch: BibTeX='2016' vs DOI='2015'",
        ));
}

#[test]
fn other_entry_types_are_not_counted() {
    let mut server = Server::new();
    let any = server
        .mock("GET", Matcher::Any)
        .with_status(200)
        .expect(0)
        .create();
    let tmp = TempDir::new().unwrap();
    write_bib(
        &tmp,
        "refs.bib",
        "@misc{site,\n  title = {A Website}\n}\n@inproceedings{talk,\n  title = {A Talk}\n}\n",
    );

    check_cmd(&server, tmp.path())
        .arg("refs.bib")
        .assert()
        .success()
        .stdout(predicate::str::contains("Total entries checked: 0"));

    any.assert();
}

#[test]
fn malformed_fragment_is_reported() {
    let server = Server::new();
    let tmp = TempDir::new().unwrap();
    write_bib(&tmp, "refs.bib", "\n@article{broken,\n  title = {Never closed\n");

    check_cmd(&server, tmp.path())
        .arg("refs.bib")
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped malformed entry at line 2"));
}

#[test]
fn totals_span_multiple_files() {
    let mut server = Server::new();
    let _first = server.mock("GET", "/10.1000/first").with_status(200).create();
    let _second = server.mock("GET", "/10.1000/second").with_status(200).create();
    let tmp = TempDir::new().unwrap();
    write_bib(&tmp, "a.bib", TWO_RESOLVABLE);
    write_bib(&tmp, "b.bib", "@book{lonely,\n  title = {No DOI}\n}\n");

    check_cmd(&server, tmp.path())
        .args(["a.bib", "b.bib", "--no-metadata-check"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Checking a.bib..."))
        .stdout(predicate::str::contains("Checking b.bib..."))
        .stdout(predicate::str::contains("Total entries checked: 3"))
        .stdout(predicate::str::contains("Errors found: 1"));
}

#[test]
fn missing_file_fails_immediately() {
    let server = Server::new();
    let tmp = TempDir::new().unwrap();

    check_cmd(&server, tmp.path())
        .arg("absent.bib")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("absent.bib does not exist"));
}

#[test]
fn check_requires_files() {
    cmd()
        .arg("check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("FILES"));
}

// =============================================================================
// Error Cases
// =============================================================================

#[test]
fn no_subcommand_shows_help() {
    // arg_required_else_help makes clap print help to stderr and exit 2
    cmd()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn invalid_subcommand_shows_error() {
    cmd()
        .arg("not-a-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn chdir_nonexistent_fails() {
    cmd()
        .args(["-C", "/nonexistent/path/that/does/not/exist", "info"])
        .assert()
        .failure();
}
