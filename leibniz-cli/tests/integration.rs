//! End-to-end tests driving the built `leibniz` binary.
//!
//! The process backends re-invoke the current executable, so they can only
//! be exercised through the real binary; `CARGO_BIN_EXE_leibniz` points at
//! it. Each run is checked against the three-line report contract.

use std::process::{Command, Output};

const PI: f64 = std::f64::consts::PI;

fn leibniz(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_leibniz"))
        .args(args)
        .output()
        .expect("failed to run leibniz binary")
}

/// Parse the `π ≈ <value>` line of a successful run.
fn approximation(output: &Output) -> f64 {
    assert!(
        output.status.success(),
        "run failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let first = stdout.lines().next().unwrap_or_default();
    first
        .strip_prefix("π ≈ ")
        .and_then(|rest| rest.parse().ok())
        .unwrap_or_else(|| panic!("unexpected first line: {first:?}"))
}

#[test]
fn sequential_run_reports_three_lines() {
    let output = leibniz(&["--iterations", "100000"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("π ≈ "));
    assert!(lines[1].starts_with("Error = "));
    assert!(lines[2].starts_with("Time elapsed: "));
    assert!(lines[2].ends_with('s'));

    assert!((approximation(&output) - PI).abs() < 1e-3);
}

#[test]
fn fan_out_matches_reference() {
    let output = leibniz(&["--fan-out", "-t", "4", "-i", "1000000"]);
    assert!((approximation(&output) - PI).abs() < 1e-3);
}

#[test]
fn thread_queue_matches_reference() {
    let output = leibniz(&["--thread-queue", "-t", "4", "-i", "1000000"]);
    assert!((approximation(&output) - PI).abs() < 1e-3);
}

#[test]
fn process_queue_matches_reference() {
    let output = leibniz(&["--process-queue", "-p", "2", "-i", "200000"]);
    assert!((approximation(&output) - PI).abs() < 1e-3);
}

#[test]
fn pool_matches_reference() {
    let output = leibniz(&["--pool", "2", "-i", "200000"]);
    assert!((approximation(&output) - PI).abs() < 1e-3);
}

#[test]
fn local_backends_agree_with_each_other() {
    let iterations = "100000";
    let sequential = approximation(&leibniz(&["-i", iterations]));
    for args in [
        vec!["--fan-out", "-t", "3", "-i", iterations],
        vec!["--thread-queue", "-t", "3", "-i", iterations],
        vec!["--process-queue", "-p", "2", "-i", iterations],
        vec!["--pool", "2", "-i", iterations],
    ] {
        let parallel = approximation(&leibniz(&args));
        // Backends differ only by summation-order rounding.
        assert!(
            (parallel - sequential).abs() < 1e-10,
            "{args:?} diverged: {parallel} vs {sequential}"
        );
    }
}

#[test]
fn segment_worker_prints_one_prescaled_line() {
    let output = leibniz(&["--start", "0", "--end", "1"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 1);
    assert_eq!(stdout.trim_end(), "π ≈ 4");
}

#[test]
fn segment_worker_output_feeds_back_into_the_whole() {
    // Two single-segment workers over [0, 500) and [500, 1000) should sum
    // to the sequential run over [0, 1000); this is exactly what the
    // remote backend does with its pre-scaled partials.
    let first = approximation(&leibniz(&["--start", "0", "--end", "500"]));
    let second = approximation(&leibniz(&["--start", "500", "--end", "1000"]));
    let whole = approximation(&leibniz(&["-i", "1000"]));
    assert!((first + second - whole).abs() < 1e-12);
}

#[test]
fn no_mode_fails_before_any_work() {
    let output = leibniz(&[]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("no computation mode selected"),
        "stderr: {stderr}"
    );
}

#[test]
fn hosts_without_iterations_fails() {
    let output = leibniz(&["--hosts", "alpha,beta"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--hosts requires --iterations"), "stderr: {stderr}");
}

#[test]
fn conflicting_modes_fail() {
    let output = leibniz(&["--fan-out", "--thread-queue", "-i", "1000"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("conflicting computation modes"), "stderr: {stderr}");
}

#[test]
fn manual_segments_match_sequential() {
    let manual = approximation(&leibniz(&["--segments", "4", "--seg-size", "250"]));
    let whole = approximation(&leibniz(&["-i", "1000"]));
    assert!((manual - whole).abs() < 1e-12);
}
