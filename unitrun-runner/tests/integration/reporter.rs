// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{Result, eyre};
use indoc::indoc;
use pretty_assertions::assert_eq;
use std::time::Duration;
use unitrun_runner::{
    config::{TestThreads, UnitrunConfig},
    registry::Registry,
    reporter::{ReporterBuilder, ReporterOutput},
    runner::TestRunnerBuilder,
    unit::{TestUnit, UnitSettings},
};

/// Replaces the measured duration on each status line with `X`.
fn normalize_durations(output: &str) -> String {
    output
        .lines()
        .map(|line| match (line.starts_with('['), line.rfind(" (")) {
            (true, Some(start)) if line.ends_with(" ms)") => format!("{} (X ms)", &line[..start]),
            _ => line.to_owned(),
        })
        .map(|line| line + "\n")
        .collect()
}

fn report_run(
    registry: &Registry,
    builder: &ReporterBuilder,
    default_timeout: Duration,
) -> Result<String> {
    let (_workspace_dir, config) = load_config()?;
    let profile = config.profile(UnitrunConfig::DEFAULT_PROFILE)?;
    let test_list = registry.select("");

    let mut runner_builder = TestRunnerBuilder::default();
    runner_builder
        .set_test_threads(TestThreads::Count(2))
        .set_default_timeout(default_timeout);
    let runner = runner_builder.build(&test_list, &profile)?;

    let mut out = Vec::new();
    let mut reporter = builder.build(ReporterOutput::Buffer(&mut out));
    runner
        .try_execute(|event| reporter.report_event(event))
        .map_err(|errors| eyre!("run failed: {errors}"))?;
    drop(reporter);

    Ok(String::from_utf8(out)?)
}

#[test]
fn pass_then_timeout() -> Result<()> {
    test_init();

    let mut one_ms = UnitSettings::new();
    one_ms.set_timeout(Duration::from_millis(1));
    let mut registry = Registry::new();
    registry
        .register(TestUnit::with_settings("B", one_ms, || {
            cooperative_sleep(Duration::from_secs(30))
        }))
        .register(TestUnit::new("A", || {}));

    let output = report_run(&registry, &ReporterBuilder::default(), Duration::from_secs(10))?;

    assert_eq!(
        normalize_durations(&output),
        indoc! {"
            [pass] A (X ms)
            [fail] B (X ms)
                   test case timed out after 1 ms
            2 tests, 0 skipped, 1 passed, 1 failed
        "}
    );
    Ok(())
}

#[test]
fn verbose_run_with_pattern_and_skips() -> Result<()> {
    test_init();

    let mut skipped = UnitSettings::new();
    skipped.set_skip(true).set_description("not on this platform");
    let mut registry = Registry::new();
    registry
        .register(TestUnit::new("Suite.first", || {}))
        .register(TestUnit::with_settings("Suite.second", skipped, || {}));

    let mut builder = ReporterBuilder::default();
    builder.set_verbose(true).set_search_pattern("Suite");
    let output = report_run(&registry, &builder, Duration::from_secs(10))?;

    assert_eq!(
        normalize_durations(&output),
        indoc! {"
            search pattern: Suite
            running 1 test across 2 threads (1 test skipped)
            [skip] Suite.second: not on this platform (X ms)
            [pass] Suite.first (X ms)
            2 tests, 1 skipped, 1 passed, 0 failed
        "}
    );
    assert!(
        output.contains("[skip] Suite.second: not on this platform (? ms)"),
        "skipped units have no duration: {output}"
    );
    Ok(())
}
