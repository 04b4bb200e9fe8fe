use std::path::PathBuf;

use iiab_verify::check::{self, markdown, output, report, tally};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn failed_report() -> report::VerificationReport {
    check::read_report(&fixture("report_failed.json")).expect("fixture parses")
}

#[test]
fn markdown_matches_golden_file() {
    let expected = std::fs::read_to_string(fixture("report_failed.md")).expect("golden file");
    assert_eq!(markdown::render(&failed_report()), expected);
}

#[test]
fn rendering_is_deterministic() {
    let r = failed_report();
    assert_eq!(markdown::render(&r), markdown::render(&r));
}

#[test]
fn hyphenated_service_keys_are_normalised() {
    let r = failed_report();
    assert!(r.services.contains_key("lokole_restarter"));
    assert!(!r.services.contains_key("lokole-restarter"));
}

#[test]
fn recomputed_checks_agree_with_stored_counts() {
    let mut r = failed_report();
    let stored = r.checks;
    let results = tally::apply(&mut r, 2);
    assert_eq!(r.checks, stored);
    assert_eq!(results.len(), stored.total as usize);
    assert_eq!(r.summary, report::Summary::Failed);
}

#[test]
fn render_to_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("comment.md");
    check::run_render(&fixture("report_failed.json"), Some(&out)).expect("render");

    let written = std::fs::read_to_string(&out).expect("output");
    assert!(written.starts_with("## 🧪 IIAB Lokole Verification Report"));
    assert!(written.contains("#### HTTP 502"));
}

#[test]
fn render_rejects_malformed_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, "{ not json").expect("write");
    let err = check::run_render(&bad, None).expect_err("malformed input");
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn json_survives_a_rewrite() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("again.json");
    let r = failed_report();
    check::write_json(&r, &path).expect("write");
    assert_eq!(check::read_report(&path).expect("read"), r);
}

#[test]
fn text_output_lists_every_check() {
    let mut r = failed_report();
    let results = tally::apply(&mut r, 2);
    let mut buf = Vec::new();
    output::write_report(&mut buf, &r, &results, output::Format::Text).expect("text");
    let text = String::from_utf8(buf).expect("utf8");

    assert!(text.contains("iiab-lokole-jammy"));
    assert!(text.contains("FAILED"));
    for c in &results {
        assert!(text.contains(&c.name), "missing check {}", c.name);
    }
}
