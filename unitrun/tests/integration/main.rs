// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs the demo harness binary and checks its output and exit codes.

use fixtures::*;
use indoc::indoc;
use pretty_assertions::assert_eq;
use unitrun_metadata::UnitrunExitCode;

mod fixtures;

#[test]
fn ab_example() {
    let output = DemoCli::new().args(["Demo."]).output();

    assert_eq!(
        output.exit_code(),
        Some(UnitrunExitCode::OK),
        "failing units don't change the exit code\n{output}"
    );
    assert_eq!(
        normalize_durations(&output.stdout_as_str()),
        indoc! {"
            search pattern: Demo.
            [pass] Demo.A (X ms)
            [fail] Demo.B (X ms)
                   test case timed out after 1 ms
            2 tests, 0 skipped, 1 passed, 1 failed
        "},
        "{output}"
    );
}

#[test]
fn unit_test_test_scenarios() {
    let output = DemoCli::new().args(["UnitTestTest"]).output();
    assert_eq!(output.exit_code(), Some(UnitrunExitCode::OK), "{output}");

    let stdout = output.stdout_as_str();
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.first(), Some(&"search pattern: UnitTestTest"));
    assert_eq!(
        lines.last(),
        Some(&"15 tests, 2 skipped, 2 passed, 11 failed"),
        "{output}"
    );

    // Skipped units come first, then passes, then failures.
    let tags: Vec<_> = lines
        .iter()
        .filter_map(|line| line.strip_prefix('[')?.split_once(']'))
        .map(|(tag, _)| tag)
        .collect();
    let mut sorted = tags.clone();
    sorted.sort_by_key(|tag| match *tag {
        "skip" => 0,
        "pass" => 1,
        _ => 2,
    });
    assert_eq!(tags, sorted, "status lines are grouped: {output}");

    assert!(
        stdout.contains(
            "[skip] UnitTestTest.skippedMethod (? ms)\n\
             [skip] UnitTestTest.Inner.skippedInner (? ms)\n"
        ),
        "skipped units are reported in registration order: {output}"
    );
    assert!(
        stdout.contains(
            "       assertion failed: arithmetic still works\n         left: 4\n        right: 5\n"
        ),
        "assertion message is reported: {output}"
    );
    assert!(
        stdout.contains("       invalid digit found in string\n       at "),
        "runtime error and location are reported: {output}"
    );
    assert!(
        stdout.contains("       test case timed out after 10 ms"),
        "infinite loops are timed out: {output}"
    );
}

#[test]
fn list_units() {
    let output = DemoCli::new().args(["--list", "skipped"]).output();
    assert_eq!(output.exit_code(), Some(UnitrunExitCode::OK), "{output}");
    assert_eq!(
        output.stdout_as_str(),
        indoc! {"
            UnitTestTest.skippedMethod (skipped)
            UnitTestTest.Inner.skippedInner (skipped)
        "}
    );
}

#[test]
fn load_failure() {
    let output = DemoCli::new()
        .env("UNITRUN_DEMO_FAIL_LOAD", "1")
        .output();
    assert_eq!(
        output.exit_code(),
        Some(UnitrunExitCode::LOAD_FAILED),
        "{output}"
    );
    assert!(
        output
            .stderr_as_str()
            .contains("cannot run unit tests: unit manifest not found"),
        "{output}"
    );
    assert_eq!(output.stdout_as_str(), "", "nothing was run");
}

#[test]
fn engine_abort() {
    let output = DemoCli::new()
        .args(["Abort."])
        .env("UNITRUN_DEMO_ABORT", "1")
        .output();
    assert_eq!(
        output.exit_code(),
        Some(UnitrunExitCode::ENGINE_ABORTED),
        "{output}"
    );
    assert!(
        output.stderr_as_str().contains(
            "error: test run aborted: unit `Abort.database` aborted the run: database is unreachable"
        ),
        "{output}"
    );
}

#[test]
fn setup_errors() {
    for args in [
        &["--profile", "missing"][..],
        &["--test-threads", "lots"],
        &["--config-file", "does/not/exist.toml"],
    ] {
        let output = DemoCli::new().args(args.iter().copied()).output();
        assert_eq!(
            output.exit_code(),
            Some(UnitrunExitCode::SETUP_ERROR),
            "{args:?}\n{output}"
        );
    }
}

#[test]
fn config_from_environment() {
    let output = DemoCli::new()
        .args(["Demo.", "--verbose"])
        .env("UNITRUN_TEST_THREADS", "1")
        .env("UNITRUN_NO_TIMEOUTS", "1")
        .env("UNITRUN_DEFAULT_TIMEOUT", "3s")
        .output();
    assert_eq!(output.exit_code(), Some(UnitrunExitCode::OK), "{output}");
    assert_eq!(
        normalize_durations(&output.stdout_as_str()),
        indoc! {"
            search pattern: Demo.
            running 2 tests across 1 thread
            [pass] Demo.A (X ms)
            [pass] Demo.B (X ms)
            2 tests, 0 skipped, 2 passed, 0 failed
        "},
        "with timeouts suppressed, Demo.B sleeps to completion\n{output}"
    );
}
